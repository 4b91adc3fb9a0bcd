use api::{resource::ResourceError, v1::ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The URL could not be built; raised before any request is sent.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request cancelled")]
    Cancelled,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response body is not JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    Validation(#[from] ValidationError),
}

impl ClientError {
    /// Transport-level failures, cancellation included.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Cancelled)
    }
}
