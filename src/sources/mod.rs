pub mod base;
pub mod events;
pub mod flights;
pub mod hotels;
pub mod weather;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authorization failed: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Network(String),
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// True for failures that came back from the remote service rather than
    /// from the transport.
    pub fn is_upstream(&self) -> bool {
        matches!(self, FetchError::Upstream { .. } | FetchError::Malformed(_))
    }
}
