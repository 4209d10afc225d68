//! The triage session state machine.
//!
//! A [`Session`] owns one conversation and consumes [`Action`]s one at a time. Each action
//! updates the session and returns the [`Effect`]s the caller must carry out: calling the chat
//! endpoint, showing the severity scale, offering urgent care, generating the plan and so on.
//! The session never performs I/O itself.
//!
//! Phases run `Greeting -> Gathering -> Sufficient -> PlanRequested -> PlanReady`, with
//! `FacilityFlow` reachable from any chatting phase once escalation is accepted. Declining
//! escalation returns to the chatting phase the triage state warrants.

use std::sync::LazyLock;

use grokdoc_types::{NonEmptyText, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{CHAT_RETURN_PATH, FALLBACK_MESSAGE, GREETING, PLAN_FALLBACK_MESSAGE};
use crate::context::SessionContext;
use crate::conversation::{Attachment, AttachmentPurpose, Conversation, ConversationTurn};
use crate::escalation::{self, EscalationCheck, EscalationReason, ReplyIntent};
use crate::extract::{self, Confidence, Extraction, QuestionContext};
use crate::plan::{self, Plan, PlanGate, PlanRequest, PlanTask};
use crate::triage::{TriageField, TriageState};

static SEVERITY_SCALE_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bscale\s+(?:of|from)\s+1\s*(?:to|-|–)\s*10\b|\b1\s*(?:-|to)\s*10\s+scale\b")
        .unwrap()
});

static LABS_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:lab|blood|test)\s+(?:results?|work|reports?)\b").unwrap()
});

static RECORDS_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:medical|health)\s+records?\b|\bdischarge\s+summar\w+|\bEMR\b").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Greeting,
    Gathering,
    Sufficient,
    PlanRequested,
    PlanReady,
    FacilityFlow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The user submitted a message, optionally with uploads.
    Send {
        text: String,
        attachments: Vec<Attachment>,
    },
    AssistantReplied {
        text: String,
    },
    AssistantFailed,
    /// The user picked a value on the severity scale.
    SelectSeverity(Severity),
    RequestPlan,
    PlanReceived(Vec<PlanTask>),
    /// The plan service refused because critical fields are still missing.
    PlanNeedsMoreInfo {
        missing: Vec<TriageField>,
        prompt: String,
    },
    PlanFailed,
    ToggleTask(u32),
    AcceptEscalation,
    DeclineEscalation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the transcript to the chat endpoint and report back with
    /// `AssistantReplied` or `AssistantFailed`.
    CallChat { conversation: Vec<ConversationTurn> },
    ShowSeverityScale,
    /// Invite the user to upload a document of this kind.
    SuggestUpload(AttachmentPurpose),
    OfferEscalation { reasons: Vec<EscalationReason> },
    OfferPlan,
    /// Generate the plan and report back with `PlanReceived` or `PlanFailed`.
    GeneratePlan(PlanRequest),
    /// Tell the user what is still missing.
    Clarify {
        missing: Vec<TriageField>,
        prompt: String,
    },
    /// Persist the context and open the facility finder.
    HandoffToFacilities(SessionContext),
    /// Show a one-off message that is not part of the transcript.
    Notice(String),
}

/// An urgent-care offer the user turned down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DeclinedEscalation {
    reasons: Vec<EscalationReason>,
    severity: Option<Severity>,
}

#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    conversation: Conversation,
    triage: TriageState,
    last_extraction: Option<Extraction>,
    escalation_offered: bool,
    offered_reasons: Vec<EscalationReason>,
    declined: Option<DeclinedEscalation>,
    plan_offered: bool,
    awaiting_reply: bool,
    /// Transcript index of the assistant turn that last triggered the severity scale.
    severity_prompted_at: Option<usize>,
    upload_prompted_at: Option<usize>,
    plan: Option<Plan>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session that opens with the greeting.
    pub fn new() -> Self {
        let mut conversation = Conversation::new();
        conversation.push(ConversationTurn::assistant(GREETING));
        Self {
            phase: Phase::Greeting,
            conversation,
            triage: TriageState::new(),
            last_extraction: None,
            escalation_offered: false,
            offered_reasons: Vec::new(),
            declined: None,
            plan_offered: false,
            awaiting_reply: false,
            severity_prompted_at: None,
            upload_prompted_at: None,
            plan: None,
        }
    }

    /// Resume from a handoff blob.
    pub fn from_context(context: SessionContext) -> Self {
        let mut session = Self::new();
        if !context.conversation.is_empty() {
            session.conversation = Conversation::from_turns(context.conversation);
        }
        session.triage = context.triage_state;
        session.plan_offered = session.triage.is_sufficient();
        session.phase = session.chatting_phase();
        session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn triage(&self) -> &TriageState {
        &self.triage
    }

    pub fn last_extraction(&self) -> Option<&Extraction> {
        self.last_extraction.as_ref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn escalation_offered(&self) -> bool {
        self.escalation_offered
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Snapshot for the handoff blob.
    pub fn context(&self, return_path: impl Into<String>) -> SessionContext {
        SessionContext {
            triage_state: self.triage.clone(),
            conversation: self.conversation.turns().to_vec(),
            return_path: return_path.into(),
        }
    }

    /// What the user is being treated for, in their own words.
    pub fn symptom_summary(&self) -> String {
        let opening = self
            .conversation
            .first_user()
            .map(ConversationTurn::text)
            .unwrap_or_default();
        match self.triage.associated_symptoms.as_deref() {
            Some(associated) if !opening.is_empty() => format!("{opening}; {associated}"),
            Some(associated) => associated.to_string(),
            None => opening,
        }
    }

    pub fn plan_request(&self) -> PlanRequest {
        PlanRequest {
            triage_state: self.triage.clone(),
            conversation_history: self.conversation.turns().to_vec(),
            symptoms: self.symptom_summary(),
        }
    }

    fn chatting_phase(&self) -> Phase {
        if self.triage.is_sufficient() {
            Phase::Sufficient
        } else if self.conversation.turns().iter().any(ConversationTurn::is_user) {
            Phase::Gathering
        } else {
            Phase::Greeting
        }
    }

    pub fn reduce(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Send { text, attachments } => self.on_send(text, attachments),
            Action::AssistantReplied { text } => self.on_assistant_reply(text),
            Action::AssistantFailed => self.on_assistant_reply(FALLBACK_MESSAGE.to_string()),
            Action::SelectSeverity(severity) => self.on_select_severity(severity),
            Action::RequestPlan => self.on_request_plan(),
            Action::PlanReceived(tasks) => {
                if self.phase != Phase::PlanRequested {
                    tracing::warn!("plan received outside a plan request, ignoring");
                    return Vec::new();
                }
                self.plan = Some(Plan::new(tasks));
                self.phase = Phase::PlanReady;
                Vec::new()
            }
            Action::PlanNeedsMoreInfo { missing, prompt } => {
                if self.phase == Phase::PlanRequested {
                    self.phase = self.chatting_phase();
                }
                self.clarify(missing, prompt)
            }
            Action::PlanFailed => {
                if self.phase == Phase::PlanRequested {
                    self.phase = self.chatting_phase();
                }
                vec![Effect::Notice(PLAN_FALLBACK_MESSAGE.to_string())]
            }
            Action::ToggleTask(task_id) => {
                if let Some(plan) = self.plan.as_mut() {
                    if plan.toggle(task_id).is_none() {
                        tracing::warn!("toggle for unknown task {}", task_id);
                    }
                }
                Vec::new()
            }
            Action::AcceptEscalation => self.accept_escalation(),
            Action::DeclineEscalation => {
                self.decline_escalation();
                Vec::new()
            }
        }
    }

    fn on_send(&mut self, text: String, attachments: Vec<Attachment>) -> Vec<Effect> {
        let text = match NonEmptyText::new(&text) {
            Ok(text) => text.into_inner(),
            Err(_) if attachments.is_empty() => return Vec::new(),
            Err(_) => String::new(),
        };

        if self.escalation_offered {
            if attachments.is_empty()
                && escalation::classify_reply(&text) == ReplyIntent::Affirmative
            {
                return self.accept_escalation();
            }
            // anything but a yes dismisses the pending offer
            self.decline_escalation();
        }

        if self.phase == Phase::FacilityFlow {
            self.phase = self.chatting_phase();
        }

        let preceding = self.conversation.last_assistant().map(ConversationTurn::text);
        let extraction = extract::update(
            &self.triage,
            &text,
            QuestionContext {
                preceding_assistant: preceding.as_deref(),
                previous_target: self.last_extraction.as_ref().and_then(|e| e.target),
            },
        );
        self.triage = extraction.state.clone();
        self.last_extraction = Some(extraction);

        self.conversation
            .push(ConversationTurn::user_with_attachments(text.clone(), attachments));

        let mut effects = self.after_user_turn(&text);
        self.awaiting_reply = true;
        effects.push(Effect::CallChat {
            conversation: self.conversation.turns().to_vec(),
        });
        effects
    }

    /// Escalation and plan offers that follow any change to the user's side of the session.
    fn after_user_turn(&mut self, latest_user_text: &str) -> Vec<Effect> {
        let mut effects = Vec::new();

        let check = escalation::check(latest_user_text, &self.triage);
        if check.urgent && !self.escalation_offered && self.is_new_escalation(&check) {
            tracing::info!(reasons = ?check.reasons, "offering urgent care");
            self.escalation_offered = true;
            self.offered_reasons = check.reasons.clone();
            effects.push(Effect::OfferEscalation {
                reasons: check.reasons,
            });
        }

        if self.phase == Phase::Greeting {
            self.phase = Phase::Gathering;
        }
        if self.triage.is_sufficient() && self.phase == Phase::Gathering {
            self.phase = Phase::Sufficient;
        }
        if self.triage.is_sufficient() && !self.plan_offered {
            self.plan_offered = true;
            effects.push(Effect::OfferPlan);
        }

        effects
    }

    /// After a decline, only a red flag not yet turned down or a higher severity offers again.
    fn is_new_escalation(&self, check: &EscalationCheck) -> bool {
        let Some(declined) = &self.declined else {
            return true;
        };

        let new_red_flag = check.reasons.iter().any(|reason| {
            *reason != EscalationReason::HighSeverity && !declined.reasons.contains(reason)
        });
        let severity_rose = check.reasons.contains(&EscalationReason::HighSeverity)
            && self.triage.severity > declined.severity;

        new_red_flag || severity_rose
    }

    fn on_assistant_reply(&mut self, text: String) -> Vec<Effect> {
        self.awaiting_reply = false;
        self.push_assistant(text)
    }

    /// Append an assistant turn and surface the controls it asks for.
    fn push_assistant(&mut self, text: String) -> Vec<Effect> {
        self.conversation.push(ConversationTurn::assistant(text.clone()));
        let index = self.conversation.len() - 1;

        let mut effects = Vec::new();
        if self.triage.severity.is_none()
            && SEVERITY_SCALE_PROMPT.is_match(&text)
            && self.severity_prompted_at != Some(index)
        {
            self.severity_prompted_at = Some(index);
            effects.push(Effect::ShowSeverityScale);
        }

        let upload = if LABS_PROMPT.is_match(&text) {
            Some(AttachmentPurpose::Labs)
        } else if RECORDS_PROMPT.is_match(&text) {
            Some(AttachmentPurpose::Emr)
        } else {
            None
        };
        if let Some(purpose) = upload {
            if self.upload_prompted_at != Some(index) {
                self.upload_prompted_at = Some(index);
                effects.push(Effect::SuggestUpload(purpose));
            }
        }

        effects
    }

    fn on_select_severity(&mut self, severity: Severity) -> Vec<Effect> {
        let changed = self.triage.set_severity(severity);
        self.last_extraction = Some(Extraction {
            state: self.triage.clone(),
            target: Some(TriageField::Severity),
            candidates: vec![TriageField::Severity],
            confidence: Confidence::Direct,
            updated: if changed {
                vec![TriageField::Severity]
            } else {
                Vec::new()
            },
        });
        let text = format!("My severity is {severity}");
        self.conversation.push(ConversationTurn::user(text.clone()));

        let mut effects = self.after_user_turn(&text);
        self.awaiting_reply = true;
        effects.push(Effect::CallChat {
            conversation: self.conversation.turns().to_vec(),
        });
        effects
    }

    fn on_request_plan(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::PlanRequested => return Vec::new(),
            Phase::FacilityFlow => self.phase = self.chatting_phase(),
            _ => {}
        }

        match plan::check_gate(&self.triage) {
            PlanGate::NeedsMoreInfo { missing, prompt } => self.clarify(missing, prompt),
            PlanGate::Ready => {
                self.phase = Phase::PlanRequested;
                vec![Effect::GeneratePlan(self.plan_request())]
            }
        }
    }

    fn clarify(&mut self, missing: Vec<TriageField>, prompt: String) -> Vec<Effect> {
        let mut effects = vec![Effect::Clarify {
            missing,
            prompt: prompt.clone(),
        }];
        effects.extend(self.push_assistant(prompt));
        effects
    }

    fn accept_escalation(&mut self) -> Vec<Effect> {
        self.escalation_offered = false;
        self.offered_reasons.clear();
        self.declined = None;
        self.phase = Phase::FacilityFlow;
        vec![Effect::HandoffToFacilities(self.context(CHAT_RETURN_PATH))]
    }

    fn decline_escalation(&mut self) {
        if self.escalation_offered {
            let declined = self.declined.get_or_insert_with(DeclinedEscalation::default);
            for reason in self.offered_reasons.drain(..) {
                if !declined.reasons.contains(&reason) {
                    declined.reasons.push(reason);
                }
            }
            declined.severity = declined.severity.max(self.triage.severity);
            tracing::info!(reasons = ?declined.reasons, "urgent care declined");
        }
        self.escalation_offered = false;
        if self.phase == Phase::FacilityFlow {
            self.phase = self.chatting_phase();
        }
    }
}
