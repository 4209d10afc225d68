//! # GrokDoc Core
//!
//! The triage conversation manager behind GrokDoc.
//!
//! This crate decides, from free-text chat, which clinical fields are known, what to show the
//! user next (severity scale, upload prompts, urgent-care escalation, the care plan) and which
//! upstream model answers:
//! - [`extract`] and [`triage`]: heuristic field extraction into a fixed-shape [`TriageState`]
//! - [`escalation`] and [`router`]: urgent-care flagging and fast/advanced model selection
//! - [`plan`]: the gated 7-day plan and its lenient parser
//! - [`session`]: one reducer tying the above together as `Session::reduce(Action) -> Vec<Effect>`
//! - [`services`]: async wrappers over the chat and places providers
//!
//! **No transport concerns**: HTTP handlers and the terminal client live in `api-rest` and
//! `grokdoc-cli`.

pub mod config;
pub mod constants;
pub mod context;
pub mod conversation;
mod error;
pub mod escalation;
pub mod extract;
pub mod plan;
pub mod prompts;
pub mod router;
pub mod services;
pub mod session;
pub mod triage;

pub use config::AppConfig;
pub use context::{ContextStore, SessionContext};
pub use conversation::{
    Attachment, AttachmentPurpose, ContentChunk, Conversation, ConversationTurn, Role, TurnContent,
};
pub use error::{CoreError, CoreResult};
pub use escalation::{EscalationCheck, EscalationReason};
pub use extract::{Confidence, Extraction, QuestionContext};
pub use plan::{DaySummary, Plan, PlanProgress, PlanRequest, PlanTask};
pub use router::ModelTier;
pub use services::{
    ChatReply, ChatService, Facility, FacilityService, InsightsService, PlanOutcome, PlanService,
};
pub use session::{Action, Effect, Phase, Session};
pub use triage::{TriageField, TriageState};

pub use grokdoc_maps::FacilityRecord;
pub use grokdoc_types::{LatLng, NonEmptyText, Severity};
