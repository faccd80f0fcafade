//! Huginn error types

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Cache store errors
    #[error("cache store error: {0}")]
    Cache(String),

    // Upstream/network errors
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Failure after the upstream call was established.
    #[error("stream error: {0}")]
    Stream(String),

    #[error("socket write failed: {0}")]
    SocketWrite(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    // Persistence errors
    #[error("storage error: {0}")]
    Storage(String),

    // Credential errors
    #[error("credential error: {0}")]
    Credential(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Whether this error was caused by the client's input rather than by
    /// the server or one of its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HuginnError::InvalidInput(_) | HuginnError::Json(_) | HuginnError::NotFound(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for HuginnError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        HuginnError::Credential(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for HuginnError {
    fn from(err: redis::RedisError) -> Self {
        HuginnError::Cache(err.to_string())
    }
}

#[cfg(feature = "grpc")]
impl From<tonic::Status> for HuginnError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::InvalidArgument => HuginnError::InvalidInput(status.message().to_string()),
            tonic::Code::NotFound => HuginnError::NotFound(status.message().to_string()),
            tonic::Code::Unauthenticated => {
                HuginnError::Credential(status.message().to_string())
            }
            _ => HuginnError::Upstream(format!("{}: {}", status.code(), status.message())),
        }
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
