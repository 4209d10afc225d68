use grokdoc_llm::LlmError;
use grokdoc_maps::MapsError;
use grokdoc_types::TypesError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid value: {0}")]
    Types(#[from] TypesError),
    #[error("model call failed: {0}")]
    Upstream(#[from] LlmError),
    #[error("places lookup failed: {0}")]
    Maps(#[from] MapsError),

    #[error("failed to create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("failed to write context file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read context file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove context file: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize context: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize context: {0}")]
    Deserialization(serde_json::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
