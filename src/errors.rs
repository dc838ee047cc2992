use thiserror::Error;

// Clone is required so one terminal load outcome can be handed to every
// caller awaiting the shared in-flight attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Script load failed: {0}")]
    LoadFailed(String),

    #[error("Script load timed out after {0}ms")]
    LoadTimeout(u64),

    #[error("Resource validation failed: {0}")]
    ValidationFailed(String),

    #[error("Page evaluation failed: {0}")]
    EvalFailed(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, LoaderError>;

// Convert anyhow::Error to LoaderError
impl From<anyhow::Error> for LoaderError {
    fn from(err: anyhow::Error) -> Self {
        LoaderError::AnyhowError(err.to_string())
    }
}

impl LoaderError {
    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        LoaderError::EvalFailed(err.to_string())
    }
}
