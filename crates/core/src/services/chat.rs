use std::sync::Arc;

use grokdoc_llm::{ChatMessage, ChatModel, ChatRequest};
use serde::{Deserialize, Serialize};

use super::model_from_spec;
use crate::config::AppConfig;
use crate::constants::FALLBACK_MESSAGE;
use crate::conversation::ConversationTurn;
use crate::prompts::SYSTEM_PROMPT;
use crate::router::{self, ModelTier};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub tier: ModelTier,
    pub model: String,
    /// `true` when `text` is the fixed apology rather than a model reply.
    pub fallback: bool,
}

/// Routes each conversation to the fast or advanced model and returns its reply.
#[derive(Clone)]
pub struct ChatService {
    fast: Arc<dyn ChatModel>,
    advanced: Arc<dyn ChatModel>,
    max_tokens: u32,
}

impl ChatService {
    pub fn new(fast: Arc<dyn ChatModel>, advanced: Arc<dyn ChatModel>, max_tokens: u32) -> Self {
        Self {
            fast,
            advanced,
            max_tokens,
        }
    }

    pub fn from_config(config: &AppConfig) -> CoreResult<Self> {
        Ok(Self::new(
            model_from_spec(config, config.fast())?,
            model_from_spec(config, config.advanced())?,
            config.max_tokens(),
        ))
    }

    fn model(&self, tier: ModelTier) -> &Arc<dyn ChatModel> {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Advanced => &self.advanced,
        }
    }

    /// Reply to the latest turn.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` for an empty or blank conversation. Upstream failures are
    /// not errors: they are logged and answered with the fallback message.
    pub async fn reply(&self, turns: &[ConversationTurn]) -> CoreResult<ChatReply> {
        if turns.iter().all(ConversationTurn::is_blank) {
            return Err(CoreError::InvalidInput(
                "conversation must contain at least one non-empty turn".into(),
            ));
        }

        let decision = router::select(turns);
        let model = self.model(decision.tier);
        tracing::info!(
            tier = %decision.tier,
            reason = ?decision.reason,
            model = model.model_id(),
            "routing chat request"
        );

        let messages = std::iter::once(ChatMessage::system(SYSTEM_PROMPT))
            .chain(
                turns
                    .iter()
                    .filter(|turn| !turn.is_blank())
                    .map(ConversationTurn::to_chat_message),
            )
            .collect();
        let request = ChatRequest::new(messages).with_max_tokens(self.max_tokens);

        let (text, fallback) = match model.complete(request).await {
            Ok(text) if !text.is_empty() => (text, false),
            Ok(_) => {
                tracing::warn!("{} returned an empty reply", model.model_id());
                (FALLBACK_MESSAGE.to_string(), true)
            }
            Err(e) => {
                tracing::error!("chat completion error: {:?}", e);
                (FALLBACK_MESSAGE.to_string(), true)
            }
        };

        Ok(ChatReply {
            text,
            tier: decision.tier,
            model: model.model_id().to_string(),
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grokdoc_llm::{ChatRole, LlmError, ScriptedChatModel};

    fn service() -> (Arc<ScriptedChatModel>, Arc<ScriptedChatModel>, ChatService) {
        let fast = Arc::new(ScriptedChatModel::new("fast-model"));
        let advanced = Arc::new(ScriptedChatModel::new("advanced-model"));
        let service = ChatService::new(fast.clone(), advanced.clone(), 2000);
        (fast, advanced, service)
    }

    #[tokio::test]
    async fn prepends_the_system_prompt() {
        let (fast, _, service) = service();
        fast.enqueue_reply("How long have you had it?");

        let reply = service
            .reply(&[ConversationTurn::user("I have a cough")])
            .await
            .unwrap();

        assert_eq!(reply.text, "How long have you had it?");
        assert_eq!(reply.tier, ModelTier::Fast);
        assert_eq!(reply.model, "fast-model");
        assert!(!reply.fallback);

        let request = &fast.requests()[0];
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[0].text_content(), SYSTEM_PROMPT);
        assert_eq!(request.messages[1].text_content(), "I have a cough");
        assert_eq!(request.max_tokens, Some(2000));
    }

    #[tokio::test]
    async fn diagnosis_requests_go_to_the_advanced_model() {
        let (fast, advanced, service) = service();
        advanced.enqueue_reply("It sounds like a viral infection.");

        let reply = service
            .reply(&[ConversationTurn::user("what's the diagnosis?")])
            .await
            .unwrap();

        assert_eq!(reply.tier, ModelTier::Advanced);
        assert_eq!(advanced.request_count(), 1);
        assert_eq!(fast.request_count(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_becomes_the_fallback() {
        let (fast, _, service) = service();
        fast.enqueue_error(LlmError::InvalidInput("boom".into()));

        let reply = service
            .reply(&[ConversationTurn::user("hello")])
            .await
            .unwrap();

        assert!(reply.fallback);
        assert_eq!(reply.text, FALLBACK_MESSAGE);
        assert!(!reply.text.contains("boom"));
    }

    #[tokio::test]
    async fn empty_conversation_is_rejected_before_any_call() {
        let (fast, advanced, service) = service();

        for turns in [vec![], vec![ConversationTurn::user("  ")]] {
            let err = service.reply(&turns).await.expect_err("should reject");
            assert!(matches!(err, CoreError::InvalidInput(_)));
        }
        assert_eq!(fast.request_count() + advanced.request_count(), 0);
    }
}
