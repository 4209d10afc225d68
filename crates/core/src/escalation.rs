//! Urgent-care escalation checks.
//!
//! A session is urgent when the latest user message mentions a red-flag symptom or the recorded
//! severity is at or above [`URGENT_SEVERITY_THRESHOLD`]. The check is re-run on every user turn.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::URGENT_SEVERITY_THRESHOLD;
use crate::triage::TriageState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum EscalationReason {
    ChestPain,
    BreathingDifficulty,
    SevereHeadache,
    SevereBleeding,
    SeverePain,
    HeadInjury,
    LossOfConsciousness,
    Unbearable,
    Emergency,
    HighSeverity,
}

impl EscalationReason {
    pub fn describe(self) -> &'static str {
        match self {
            EscalationReason::ChestPain => "chest pain",
            EscalationReason::BreathingDifficulty => "difficulty breathing",
            EscalationReason::SevereHeadache => "a severe headache",
            EscalationReason::SevereBleeding => "severe bleeding",
            EscalationReason::SeverePain => "severe pain",
            EscalationReason::HeadInjury => "a head injury",
            EscalationReason::LossOfConsciousness => "loss of consciousness",
            EscalationReason::Unbearable => "unbearable symptoms",
            EscalationReason::Emergency => "a possible emergency",
            EscalationReason::HighSeverity => "a high severity rating",
        }
    }
}

static RED_FLAGS: LazyLock<Vec<(EscalationReason, Regex)>> = LazyLock::new(|| {
    [
        (
            EscalationReason::ChestPain,
            r"(?i)\bchest\s+(?:pain|tightness|pressure)\b",
        ),
        (
            EscalationReason::BreathingDifficulty,
            r"(?i)\b(?:difficulty|trouble|hard|struggling)\s+(?:breathing|to\s+breathe)\b|\bcan'?t\s+breathe\b|\bcannot\s+breathe\b|\bshort(?:ness)?\s+of\s+breath\b",
        ),
        (
            EscalationReason::SevereHeadache,
            r"(?i)\b(?:severe|worst)\s+headache\b",
        ),
        (
            EscalationReason::SevereBleeding,
            r"(?i)\b(?:severe|heavy)\s+bleeding\b|\bbleeding\s+(?:heavily|a\s+lot|won'?t\s+stop)\b",
        ),
        (EscalationReason::SeverePain, r"(?i)\bsevere\s+pain\b"),
        (
            EscalationReason::HeadInjury,
            r"(?i)\bhead\s+(?:injury|trauma)\b|\bhit\s+my\s+head\b|\bconcussion\b",
        ),
        (
            EscalationReason::LossOfConsciousness,
            r"(?i)\b(?:loss\s+of|lost)\s+consciousness\b|\bpassed\s+out\b|\bfainted\b|\bblacked\s+out\b|\bunconscious\b",
        ),
        (EscalationReason::Unbearable, r"(?i)\bunbearable\b"),
        (EscalationReason::Emergency, r"(?i)\bemergency\b"),
    ]
    .into_iter()
    .map(|(reason, pattern)| (reason, Regex::new(pattern).unwrap()))
    .collect()
});

static AFFIRMATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:y|yes|yeah|yep|yup|sure|ok|okay|please|absolutely|definitely|of\s+course|let'?s\s+go|show\s+me)\b").unwrap()
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:n|no|nope|nah|not\s+now|not\s+yet|no\s+thanks|i'?m\s+(?:fine|ok|okay)|maybe\s+later)\b").unwrap()
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct EscalationCheck {
    pub urgent: bool,
    pub reasons: Vec<EscalationReason>,
}

/// Evaluate the latest user text against the current triage state.
pub fn check(latest_user_text: &str, state: &TriageState) -> EscalationCheck {
    let mut reasons: Vec<EscalationReason> = RED_FLAGS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(latest_user_text))
        .map(|(reason, _)| *reason)
        .collect();

    if state
        .severity
        .is_some_and(|severity| severity.value() >= URGENT_SEVERITY_THRESHOLD)
    {
        reasons.push(EscalationReason::HighSeverity);
    }

    EscalationCheck {
        urgent: !reasons.is_empty(),
        reasons,
    }
}

/// How the user answered a yes/no offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyIntent {
    Affirmative,
    Negative,
    Unclear,
}

pub fn classify_reply(text: &str) -> ReplyIntent {
    if NEGATIVE.is_match(text) {
        ReplyIntent::Negative
    } else if AFFIRMATIVE.is_match(text) {
        ReplyIntent::Affirmative
    } else {
        ReplyIntent::Unclear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grokdoc_types::Severity;

    #[test]
    fn red_flag_phrases_are_urgent() {
        let state = TriageState::new();
        for (text, reason) in [
            ("I have chest pain", EscalationReason::ChestPain),
            ("having trouble breathing", EscalationReason::BreathingDifficulty),
            ("worst headache of my life", EscalationReason::SevereHeadache),
            ("I passed out this morning", EscalationReason::LossOfConsciousness),
            ("the pain is unbearable", EscalationReason::Unbearable),
            ("Is this an EMERGENCY?", EscalationReason::Emergency),
        ] {
            let result = check(text, &state);
            assert!(result.urgent, "{text:?} should be urgent");
            assert!(result.reasons.contains(&reason), "{text:?} missing {reason:?}");
        }
    }

    #[test]
    fn ordinary_symptoms_are_not_urgent() {
        let result = check("mild cough and a runny nose", &TriageState::new());
        assert_eq!(result, EscalationCheck::default());
    }

    #[test]
    fn severity_threshold_is_inclusive() {
        let mut state = TriageState::new();
        state.set_severity(Severity::new(6).unwrap());
        assert!(!check("", &state).urgent);

        state.set_severity(Severity::new(7).unwrap());
        let result = check("", &state);
        assert!(result.urgent);
        assert_eq!(result.reasons, vec![EscalationReason::HighSeverity]);
    }

    #[test]
    fn replies_are_classified() {
        assert_eq!(classify_reply("Yes please"), ReplyIntent::Affirmative);
        assert_eq!(classify_reply("ok"), ReplyIntent::Affirmative);
        assert_eq!(classify_reply("no, keep chatting"), ReplyIntent::Negative);
        assert_eq!(classify_reply("not now"), ReplyIntent::Negative);
        assert_eq!(classify_reply("what do you mean?"), ReplyIntent::Unclear);
    }
}
