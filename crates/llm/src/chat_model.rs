use crate::{ChatRequest, LlmResult};

/// A chat-completion capable model.
///
/// Implementations are constructed once with explicit configuration and shared behind an `Arc`;
/// nothing in the workspace reaches for a global client.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Short vendor name used in logs, e.g. `"openai"`.
    fn provider(&self) -> &'static str;

    fn model_id(&self) -> &str;

    /// Sends the conversation and returns the assistant's reply text, trimmed.
    async fn complete(&self, request: ChatRequest) -> LlmResult<String>;
}
