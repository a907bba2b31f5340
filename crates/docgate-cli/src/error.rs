use thiserror::Error;

/// Chat backend failure
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("failed to parse response: {0}")]
    ParseError(String),

    #[error("response carried no message content")]
    EmptyResponse,
}
