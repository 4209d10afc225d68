mod api;
mod model;

pub use model::{OpenAiCompatibleModel, OpenAiCompatibleModelOptions, Provider, SystemPromptMode};
