use super::api::{
    CreateChatCompletionRequest, CreateChatCompletionResponse, ImageUrl, RequestContent,
    RequestContentPart, RequestMessage,
};
use crate::{
    client_utils, ChatMessage, ChatModel, ChatRequest, ChatRole, LlmError, LlmResult, MessagePart,
};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client,
};
use std::str::FromStr;

/// Chat-completion vendors GrokDoc can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    XAi,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::XAi => "xai",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::XAi => "https://api.x.ai/v1",
        }
    }

    /// The vendor's conversational model used when no model id is configured.
    pub fn default_fast_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "chatgpt-4o-latest",
            Provider::XAi => "grok-2-latest",
        }
    }

    /// Environment variable holding the vendor's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::XAi => "XAI_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "xai" | "x.ai" | "grok" => Ok(Provider::XAi),
            other => Err(LlmError::InvalidInput(format!(
                "unknown provider '{other}' (expected 'openai' or 'xai')"
            ))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How system instructions reach the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptMode {
    /// Sent with the `system` role.
    Native,
    /// Folded into a leading `user` turn. o1-family models reject the system role.
    AsUserTurn,
}

impl SystemPromptMode {
    pub fn for_model(model_id: &str) -> Self {
        if model_id.starts_with("o1") {
            SystemPromptMode::AsUserTurn
        } else {
            SystemPromptMode::Native
        }
    }
}

#[derive(Clone, Default)]
pub struct OpenAiCompatibleModelOptions {
    pub base_url: Option<String>,
    pub api_key: String,
    pub client: Option<Client>,
    /// Defaults to [`SystemPromptMode::for_model`].
    pub system_prompt_mode: Option<SystemPromptMode>,
}

pub struct OpenAiCompatibleModel {
    provider: Provider,
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    system_prompt_mode: SystemPromptMode,
}

impl OpenAiCompatibleModel {
    #[must_use]
    pub fn new(
        provider: Provider,
        model_id: impl Into<String>,
        options: OpenAiCompatibleModelOptions,
    ) -> Self {
        let OpenAiCompatibleModelOptions {
            base_url,
            api_key,
            client,
            system_prompt_mode,
        } = options;
        let model_id = model_id.into();

        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();
        let system_prompt_mode =
            system_prompt_mode.unwrap_or_else(|| SystemPromptMode::for_model(&model_id));

        Self {
            provider,
            model_id,
            api_key,
            base_url,
            client: client.unwrap_or_else(Client::new),
            system_prompt_mode,
        }
    }

    fn request_headers(&self) -> LlmResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_header =
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|error| {
                LlmError::InvalidInput(format!(
                    "Invalid {} API key header value: {error}",
                    self.provider
                ))
            })?;
        headers.insert(header::AUTHORIZATION, auth_header);
        Ok(headers)
    }

    pub(crate) fn build_request(&self, request: ChatRequest) -> CreateChatCompletionRequest {
        let ChatRequest {
            messages,
            max_tokens,
        } = request;

        let messages = match self.system_prompt_mode {
            SystemPromptMode::Native => messages,
            SystemPromptMode::AsUserTurn => fold_system_messages(messages),
        };

        let (max_completion_tokens, max_tokens) = match self.provider {
            Provider::OpenAi => (max_tokens, None),
            Provider::XAi => (None, max_tokens),
        };

        CreateChatCompletionRequest {
            model: self.model_id.clone(),
            messages: messages.into_iter().map(convert_message).collect(),
            max_completion_tokens,
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiCompatibleModel {
    fn provider(&self) -> &'static str {
        self.provider.name()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: ChatRequest) -> LlmResult<String> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidInput(
                "chat request must contain at least one message".into(),
            ));
        }

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.model_id,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.base_url);
        let response: CreateChatCompletionResponse =
            client_utils::send_json(&self.client, &url, &body, self.request_headers()?).await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                LlmError::Invariant(self.provider.name(), "no choices in response".into())
            })?;

        if let Some(refusal) = message.refusal {
            return Err(LlmError::Refusal(refusal));
        }

        match message.content {
            Some(content) => Ok(content.trim().to_string()),
            None => Err(LlmError::Invariant(
                self.provider.name(),
                "response message has no content".into(),
            )),
        }
    }
}

fn fold_system_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let (system, rest): (Vec<_>, Vec<_>) = messages
        .into_iter()
        .partition(|message| message.role == ChatRole::System);

    if system.is_empty() {
        return rest;
    }

    let instructions = system
        .iter()
        .map(ChatMessage::text_content)
        .collect::<Vec<_>>()
        .join("\n\n");

    std::iter::once(ChatMessage::user(instructions))
        .chain(rest)
        .collect()
}

fn convert_message(message: ChatMessage) -> RequestMessage {
    let role = message.role.as_str();

    let content = if message.has_images() {
        RequestContent::Parts(
            message
                .parts
                .into_iter()
                .map(|part| match part {
                    MessagePart::Text { text } => RequestContentPart::Text { text },
                    MessagePart::Image { url } => RequestContentPart::ImageUrl {
                        image_url: ImageUrl { url },
                    },
                })
                .collect(),
        )
    } else {
        RequestContent::Text(message.text_content())
    };

    RequestMessage { role, content }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(provider: Provider, model_id: &str) -> OpenAiCompatibleModel {
        OpenAiCompatibleModel::new(
            provider,
            model_id,
            OpenAiCompatibleModelOptions {
                api_key: "test-key".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("xai".parse::<Provider>().unwrap(), Provider::XAi);
        assert_eq!("grok".parse::<Provider>().unwrap(), Provider::XAi);
        assert!("anthropic".parse::<Provider>().is_err());
    }

    #[test]
    fn o1_models_fold_system_prompt_into_user_turn() {
        let model = model(Provider::OpenAi, "o1-preview");
        let request = ChatRequest::new(vec![
            ChatMessage::system("You are GrokDoc."),
            ChatMessage::user("I have a cough"),
        ]);

        let body = serde_json::to_value(model.build_request(request)).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "You are GrokDoc.");
        assert_eq!(messages[1]["content"], "I have a cough");
    }

    #[test]
    fn conversational_models_keep_system_role() {
        let model = model(Provider::XAi, "grok-2-latest");
        let request =
            ChatRequest::new(vec![ChatMessage::system("sys"), ChatMessage::user("hi")])
                .with_max_tokens(500);

        let body = serde_json::to_value(model.build_request(request)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 500);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn openai_uses_max_completion_tokens() {
        let model = model(Provider::OpenAi, "chatgpt-4o-latest");
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_max_tokens(2000);

        let body = serde_json::to_value(model.build_request(request)).unwrap();

        assert_eq!(body["max_completion_tokens"], 2000);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn images_are_sent_as_content_parts() {
        let model = model(Provider::OpenAi, "chatgpt-4o-latest");
        let message = ChatMessage {
            role: ChatRole::User,
            parts: vec![
                MessagePart::Text {
                    text: "my lab results".into(),
                },
                MessagePart::Image {
                    url: "data:image/png;base64,AAAA".into(),
                },
            ],
        };

        let body = serde_json::to_value(model.build_request(ChatRequest::new(vec![message])))
            .unwrap();
        let parts = body["messages"][0]["content"].as_array().unwrap();

        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn empty_request_is_rejected_before_sending() {
        let model = model(Provider::OpenAi, "chatgpt-4o-latest");
        let err = model
            .complete(ChatRequest::default())
            .await
            .expect_err("empty request should fail");
        assert!(matches!(err, LlmError::InvalidInput(_)));
    }
}
