use grokdoc_types::TypesError;

#[derive(Debug, thiserror::Error)]
pub enum MapsError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(#[from] TypesError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("status error: {1} (status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The places provider answered 200 but reported a failure status in the body.
    #[error("places provider returned {status}: {message}")]
    Provider { status: String, message: String },
    #[error("could not determine location")]
    LocationUnavailable,
}

pub type MapsResult<T> = std::result::Result<T, MapsError>;
