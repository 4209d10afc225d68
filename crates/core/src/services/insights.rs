use std::sync::Arc;

use grokdoc_llm::{ChatMessage, ChatModel, ChatRequest};
use grokdoc_types::NonEmptyText;

use super::model_from_spec;
use crate::config::AppConfig;
use crate::prompts::INSIGHTS_PROMPT;
use crate::{CoreError, CoreResult};

/// Summaries of user-supplied health metrics.
#[derive(Clone)]
pub struct InsightsService {
    model: Arc<dyn ChatModel>,
    max_tokens: u32,
}

impl InsightsService {
    pub fn new(model: Arc<dyn ChatModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    pub fn from_config(config: &AppConfig) -> CoreResult<Self> {
        Ok(Self::new(
            model_from_spec(config, config.advanced())?,
            config.max_tokens(),
        ))
    }

    pub async fn insights(&self, health_data: &str) -> CoreResult<String> {
        let health_data = NonEmptyText::new(health_data)
            .map_err(|_| CoreError::InvalidInput("healthData cannot be empty".into()))?;

        let request = ChatRequest::new(vec![
            ChatMessage::system(INSIGHTS_PROMPT),
            ChatMessage::user(health_data.into_inner()),
        ])
        .with_max_tokens(self.max_tokens);

        Ok(self.model.complete(request).await?)
    }
}
