//! # GrokDoc LLM
//!
//! Thin chat-completion layer used by the GrokDoc core.
//!
//! Every upstream model sits behind [`ChatModel`]: "complete a chat given turns, return text".
//! Both supported vendors (OpenAI and X.AI) speak the OpenAI chat-completions wire format, so a
//! single [`OpenAiCompatibleModel`] covers them, configured per [`Provider`].
//!
//! [`ScriptedChatModel`] replays queued replies and records requests; the other crates use it in
//! their tests in place of a live provider.

mod chat_model;
mod client_utils;
mod errors;
pub mod openai;
mod scripted;
mod types;

pub use chat_model::ChatModel;
pub use errors::{LlmError, LlmResult};
pub use openai::{OpenAiCompatibleModel, OpenAiCompatibleModelOptions, Provider, SystemPromptMode};
pub use scripted::ScriptedChatModel;
pub use types::{ChatMessage, ChatRequest, ChatRole, MessagePart};
