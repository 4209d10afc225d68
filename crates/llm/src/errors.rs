use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the provider failed or the response body could not be decoded.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered with a non-success status code.
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The response was well-formed JSON but not what the provider documents
    /// (e.g. no choices returned).
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The model refused to answer.
    #[error("Refusal: {0}")]
    Refusal(String),
}

pub type LlmResult<T> = Result<T, LlmError>;
