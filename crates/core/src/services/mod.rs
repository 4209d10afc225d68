//! Async services that call the upstream providers.
//!
//! Each service holds its clients behind trait objects, injected at construction. The
//! `from_config` constructors build live clients and fail early when a required key is missing.

mod chat;
mod facilities;
mod insights;
mod plan;

pub use chat::{ChatReply, ChatService};
pub use facilities::{Facility, FacilityService};
pub use insights::InsightsService;
pub use plan::{PlanOutcome, PlanService};

use std::sync::Arc;

use grokdoc_llm::{ChatModel, OpenAiCompatibleModel, OpenAiCompatibleModelOptions};

use crate::config::{AppConfig, ModelSpec};
use crate::CoreResult;

/// A live chat-completion client for one configured tier.
pub fn model_from_spec(config: &AppConfig, spec: &ModelSpec) -> CoreResult<Arc<dyn ChatModel>> {
    let api_key = config.api_key_for(spec.provider)?.to_string();
    let model = OpenAiCompatibleModel::new(
        spec.provider,
        spec.model_id.clone(),
        OpenAiCompatibleModelOptions {
            api_key,
            ..Default::default()
        },
    );
    tracing::info!(
        provider = %spec.provider,
        model = %spec.model_id,
        "chat model configured"
    );
    Ok(Arc::new(model))
}
