use std::{collections::VecDeque, sync::Mutex};

use crate::{ChatModel, ChatRequest, LlmError, LlmResult};

#[derive(Default)]
struct ScriptedState {
    replies: VecDeque<LlmResult<String>>,
    requests: Vec<ChatRequest>,
}

/// A chat model that replays queued replies and records every request it receives.
///
/// When the queue runs dry, `complete` fails with an invariant error, which doubles as a handy
/// way to exercise upstream-failure paths.
pub struct ScriptedChatModel {
    model_id: String,
    state: Mutex<ScriptedState>,
}

impl Default for ScriptedChatModel {
    fn default() -> Self {
        Self::new("scripted-model")
    }
}

impl ScriptedChatModel {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            state: Mutex::new(ScriptedState::default()),
        }
    }

    /// Queue a successful reply.
    pub fn enqueue_reply(&self, reply: impl Into<String>) -> &Self {
        self.enqueue(Ok(reply.into()))
    }

    /// Queue a failure.
    pub fn enqueue_error(&self, error: LlmError) -> &Self {
        self.enqueue(Err(error))
    }

    fn enqueue(&self, result: LlmResult<String>) -> &Self {
        self.state
            .lock()
            .expect("scripted state poisoned")
            .replies
            .push_back(result);
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.state
            .lock()
            .expect("scripted state poisoned")
            .requests
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.state
            .lock()
            .expect("scripted state poisoned")
            .requests
            .len()
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedChatModel {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: ChatRequest) -> LlmResult<String> {
        let mut state = self.state.lock().expect("scripted state poisoned");
        state.requests.push(request);
        state.replies.pop_front().unwrap_or_else(|| {
            Err(LlmError::Invariant(
                "scripted",
                "no scripted reply left".into(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatMessage;

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let model = ScriptedChatModel::default();
        model.enqueue_reply("first").enqueue_reply("second");

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(model.complete(request.clone()).await.unwrap(), "first");
        assert_eq!(model.complete(request.clone()).await.unwrap(), "second");
        assert!(model.complete(request).await.is_err());
        assert_eq!(model.request_count(), 3);
    }
}
