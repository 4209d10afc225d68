//! Heuristic triage extraction.
//!
//! Each user turn is read three ways:
//!
//! 1. An explicit rating (`N/10`, `N out of 10`) anywhere in the text always replaces severity.
//! 2. Clause-level cues ("for 3 days", "no meds", "allergic to ...") fill the fields they name.
//! 3. The preceding assistant question picks a *target field*, and the raw answer is recorded
//!    there unless a cue already filled it this turn.
//!
//! This is best effort. When a question names more than one field the answer goes to the first
//! one mentioned and the result is marked [`Confidence::Ambiguous`] with every candidate listed,
//! so callers can see the guess for what it is.

use std::ops::Range;
use std::sync::LazyLock;

use grokdoc_types::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::triage::{TriageField, TriageState, NONE_VALUE};

/// What the user was replying to.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionContext<'a> {
    /// Text of the assistant turn immediately before the user's.
    pub preceding_assistant: Option<&'a str>,
    /// Field the previous extraction attributed its answer to.
    pub previous_target: Option<TriageField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum Confidence {
    /// No target field could be identified.
    Unmatched,
    /// The question named exactly one field.
    Direct,
    /// A follow-up question ("anything else?") reused the previous target.
    CarriedOver,
    /// The question named several fields; the first was used.
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub state: TriageState,
    pub target: Option<TriageField>,
    /// Every field the question pointed at, in the order mentioned.
    pub candidates: Vec<TriageField>,
    pub confidence: Confidence,
    /// Fields whose value changed this turn.
    pub updated: Vec<TriageField>,
}

impl Extraction {
    pub fn changed(&self) -> bool {
        !self.updated.is_empty()
    }
}

macro_rules! regex {
    ($pattern:expr) => {
        Regex::new($pattern).unwrap()
    };
}

static FAMILY_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    regex!(
        r"(?i)\bfamily(?:\s+(?:medical\s+)?history)?\b|\b(?:parents?|mother|father|siblings?|relatives?|runs?\s+in)\b"
    )
});

static QUESTION_PATTERNS: LazyLock<Vec<(TriageField, Regex)>> = LazyLock::new(|| {
    vec![
        (
            TriageField::Onset,
            regex!(r"(?i)\b(?:when\s+did|when\s+was|how\s+long|since\s+when|start(?:ed)?|began|onset|first\s+notice\w*)\b"),
        ),
        (
            TriageField::Severity,
            regex!(r"(?i)\b(?:scale|how\s+severe|severe|severity|rate\s+(?:it|the|your)|how\s+bad|intensity)\b"),
        ),
        (
            TriageField::AssociatedSymptoms,
            regex!(r"(?i)\b(?:(?:other|additional|more)\s+symptoms?|also|associated|accompan\w*|along\s+with)\b"),
        ),
        (
            TriageField::MedicalHistory,
            regex!(r"(?i)\b(?:history|health\s+conditions?|conditions?|diagnosed|chronic|past\s+(?:illness|surger)\w*|health\s+problems)\b"),
        ),
        (TriageField::FamilyHistory, FAMILY_QUESTION.clone()),
        (
            TriageField::Meds,
            regex!(r"(?i)\b(?:medications?|meds|medicines?|prescriptions?|supplements?|taking|taken)\b"),
        ),
        (TriageField::Allergies, regex!(r"(?i)\ballerg\w*")),
        (
            TriageField::Lifestyle,
            regex!(r"(?i)\b(?:lifestyle|diet|exercise|physical\s+activity|stress)\b"),
        ),
        (
            TriageField::SubstanceUse,
            regex!(r"(?i)\b(?:smoke|smoking|tobacco|alcohol|drink|drinking|vape|vaping|recreational|substances?)\b"),
        ),
        (
            TriageField::ImpactDaily,
            regex!(r"(?i)\b(?:daily|day[\s-]to[\s-]day|work|sleep\w*|affect\w*|impact\w*|interfer\w*|keeping\s+you\s+from)\b"),
        ),
    ]
});

static FOLLOW_UP: LazyLock<Regex> =
    LazyLock::new(|| regex!(r"(?i)\b(?:anything\s+else|any\s+others?|what\s+else|other|more)\b"));

static NEGATIVE_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    regex!(
        r"(?i)^(?:no+|nope|none|nothing|nah|never|not\s+really|n/?a)(?:[\s,.!]+(?:none|nothing|not\s+really|really|at\s+all|thanks|thank\s+you|that\s+i\s+know\s+of|i\s+don'?t\s+think\s+so))*[\s.!]*$"
    )
});

static EXPLICIT_SEVERITY: LazyLock<Regex> =
    LazyLock::new(|| regex!(r"(?i)\b(10|[1-9])\s*(?:/|out\s+of)\s*10\b"));

static BARE_RATING: LazyLock<Regex> = LazyLock::new(|| {
    regex!(r"(?i)\b(10|[1-9]|one|two|three|four|five|six|seven|eight|nine|ten)\b")
});

static CLAUSE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| regex!(r"(?i)[,;.!?\n]+|\s+(?:and|but)\s+"));

#[derive(Clone, Copy)]
enum CueValue {
    /// The field is recorded as `"none"`.
    Denied,
    /// The whole clause is recorded.
    Clause,
}

struct Cue {
    field: TriageField,
    value: CueValue,
    pattern: Regex,
}

const COUNT: &str = r"(?:\d+|a|an|one|two|three|four|five|six|seven|few|couple(?:\s+of)?)";
const UNIT: &str = r"(?:minutes?|hours?|days?|weeks?|months?|years?)";

// Order matters: a denial wins over a positive cue for the same field, and family history is
// checked before medical history.
static CLAUSE_CUES: LazyLock<Vec<Cue>> = LazyLock::new(|| {
    let cue = |field: TriageField, value: CueValue, pattern: &str| Cue {
        field,
        value,
        pattern: regex!(pattern),
    };
    let onset = format!(
        r"(?i)\b(?:for|since|about|over|past|last)\s+(?:the\s+)?(?:past\s+|last\s+)?{COUNT}\s+{UNIT}\b|\b{COUNT}\s+{UNIT}\s+ago\b|\b(?:since|started|began|starting)\s+(?:on\s+|last\s+|this\s+)?(?:yesterday|today|tonight|morning|night|week|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b|\b(?:yesterday|last\s+night|this\s+morning)\b"
    );
    vec![
        cue(TriageField::Onset, CueValue::Clause, onset.as_str()),
        cue(
            TriageField::Meds,
            CueValue::Denied,
            r"(?i)\b(?:no|not\s+(?:taking|on)\s+any|don'?t\s+take\s+any|do\s+not\s+take\s+any)\s+(?:meds|medications?|medicines?|prescriptions?)\b",
        ),
        cue(
            TriageField::Meds,
            CueValue::Clause,
            r"(?i)\b(?:i\s+take|i'?m\s+taking|i\s+am\s+taking|i'?ve\s+been\s+taking|took|prescribed)\b|\b(?:ibuprofen|tylenol|aspirin|advil|paracetamol|acetaminophen|antibiotics|insulin|metformin|inhaler)\b",
        ),
        cue(
            TriageField::FamilyHistory,
            CueValue::Denied,
            r"(?i)\bno\s+family\s+history\b|\bnothing\s+runs\s+in\s+(?:the|my)\s+family\b",
        ),
        cue(
            TriageField::FamilyHistory,
            CueValue::Clause,
            r"(?i)\bfamily\s+history\b|\b(?:mom|mother|dad|father|brother|sister|grand(?:ma|pa|mother|father)|parents?)\s+(?:has|had|have|was|were)\b|\bruns\s+in\s+(?:the|my)\s+family\b",
        ),
        cue(
            TriageField::MedicalHistory,
            CueValue::Denied,
            r"(?i)\bno\s+(?:known\s+)?(?:medical\s+|past\s+|prior\s+)?(?:history|conditions|health\s+(?:problems|issues)|chronic\s+(?:conditions|illnesses))\b|\b(?:otherwise\s+healthy|healthy\s+otherwise)\b",
        ),
        cue(
            TriageField::MedicalHistory,
            CueValue::Clause,
            r"(?i)\b(?:history\s+of|diagnosed\s+with|i\s+have\s+(?:asthma|diabetes|hypertension|high\s+blood\s+pressure|copd|heart\s+disease))\b",
        ),
        cue(
            TriageField::Allergies,
            CueValue::Denied,
            r"(?i)\bno\s+(?:known\s+)?(?:drug\s+|food\s+)?allerg\w*",
        ),
        cue(
            TriageField::Allergies,
            CueValue::Clause,
            r"(?i)\ballergic\s+to\b|\ballerg(?:y|ies)\s+to\b",
        ),
        cue(
            TriageField::SubstanceUse,
            CueValue::Clause,
            r"(?i)\b(?:smoke|smoker|smoking|cigarettes?|vape|vaping|alcohol|drinker|drinking|beers?|wine|weed|cannabis|marijuana)\b",
        ),
        cue(
            TriageField::Lifestyle,
            CueValue::Clause,
            r"(?i)\b(?:exercise|work\s+out|workout|gym|diet|vegan|vegetarian|sedentary|desk\s+job|stress(?:ed|ful)?)\b",
        ),
        cue(
            TriageField::ImpactDaily,
            CueValue::Clause,
            r"(?i)\b(?:can'?t|cannot|unable\s+to|hard\s+to|difficult\s+to|struggl\w+\s+to)\s+(?:work|sleep|walk|eat|focus|concentrate|study|exercise|get\s+out\s+of\s+bed)\b|\bmiss(?:ed|ing)?\s+(?:work|school|class)\b|\bkeeps?\s+me\s+(?:up|awake)\b",
        ),
        cue(
            TriageField::AssociatedSymptoms,
            CueValue::Clause,
            r"(?i)\b(?:also|along\s+with|as\s+well\s+as|accompanied\s+by)\b",
        ),
    ]
});

/// Fields a question asks about, in the order they are mentioned.
pub fn question_targets(question: &str) -> Vec<TriageField> {
    let family_spans: Vec<Range<usize>> = FAMILY_QUESTION
        .find_iter(question)
        .map(|m| m.range())
        .collect();

    let mut hits: Vec<(usize, TriageField)> = QUESTION_PATTERNS
        .iter()
        .filter_map(|(field, pattern)| {
            pattern
                .find_iter(question)
                .find(|m| {
                    // "family history" is not a question about the user's own history.
                    *field != TriageField::MedicalHistory
                        || !family_spans.iter().any(|span| span.contains(&m.start()))
                })
                .map(|m| (m.start(), *field))
        })
        .collect();

    hits.sort_by_key(|(position, _)| *position);
    hits.into_iter().map(|(_, field)| field).collect()
}

/// "no", "none", "nope, nothing" and similar whole-message denials.
pub fn is_negative_reply(text: &str) -> bool {
    NEGATIVE_REPLY.is_match(text.trim())
}

/// An `N/10` or `N out of 10` rating anywhere in the text.
pub fn explicit_severity(text: &str) -> Option<Severity> {
    let captures = EXPLICIT_SEVERITY.captures(text)?;
    let value: i64 = captures.get(1)?.as_str().parse().ok()?;
    Severity::new(value).ok()
}

fn bare_rating(text: &str) -> Option<Severity> {
    let token = BARE_RATING.captures(text)?.get(1)?.as_str().to_ascii_lowercase();
    let value = match token.as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => digits.parse().ok()?,
    };
    Severity::new(value).ok()
}

fn mark(updated: &mut Vec<TriageField>, field: TriageField) {
    if !updated.contains(&field) {
        updated.push(field);
    }
}

fn clause_cues(text: &str) -> Vec<(TriageField, String)> {
    let mut found = Vec::new();

    for clause in CLAUSE_SPLIT.split(text).map(str::trim).filter(|c| !c.is_empty()) {
        let mut fields_hit: Vec<TriageField> = Vec::new();
        for cue in CLAUSE_CUES.iter() {
            if fields_hit.contains(&cue.field) {
                continue;
            }
            if cue.field == TriageField::MedicalHistory
                && fields_hit.contains(&TriageField::FamilyHistory)
            {
                continue;
            }
            if !cue.pattern.is_match(clause) {
                continue;
            }

            let value = match cue.value {
                CueValue::Denied => NONE_VALUE.to_string(),
                CueValue::Clause => clause.to_string(),
            };
            fields_hit.push(cue.field);
            found.push((cue.field, value));
        }
    }

    found
}

/// Apply one user turn to `state`.
pub fn update(state: &TriageState, user_text: &str, context: QuestionContext<'_>) -> Extraction {
    let mut next = state.clone();
    let mut updated: Vec<TriageField> = Vec::new();

    let text = user_text.trim();

    let candidates = context
        .preceding_assistant
        .map(question_targets)
        .unwrap_or_default();
    let (target, confidence) = match candidates.as_slice() {
        [] => match (context.preceding_assistant, context.previous_target) {
            (Some(question), Some(previous)) if FOLLOW_UP.is_match(question) => {
                (Some(previous), Confidence::CarriedOver)
            }
            _ => (None, Confidence::Unmatched),
        },
        [only] => (Some(*only), Confidence::Direct),
        [first, ..] => (Some(*first), Confidence::Ambiguous),
    };

    if text.is_empty() {
        return Extraction {
            state: next,
            target,
            candidates,
            confidence,
            updated,
        };
    }

    if let Some(severity) = explicit_severity(text) {
        if next.set_severity(severity) {
            mark(&mut updated, TriageField::Severity);
        }
    }

    for (field, value) in clause_cues(text) {
        if next.record(field, &value) {
            mark(&mut updated, field);
        }
    }

    if let Some(field) = target {
        if !updated.contains(&field) {
            let changed = match field {
                TriageField::Severity => match bare_rating(text) {
                    Some(severity) if explicit_severity(text).is_none() => {
                        next.set_severity(severity)
                    }
                    _ => false,
                },
                other if is_negative_reply(text) => next.record(other, NONE_VALUE),
                other => next.record(other, text),
            };
            if changed {
                mark(&mut updated, field);
            }
        }
    }

    tracing::debug!(
        ?target,
        ?confidence,
        ?updated,
        critical = next.critical_count(),
        "triage extraction"
    );

    Extraction {
        state: next,
        target,
        candidates,
        confidence,
        updated,
    }
}
