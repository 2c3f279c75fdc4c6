//! Error type returned by the task API client

use thiserror::Error;

/// Errors raised while talking to the task API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status
    #[error("API Error {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connection refused, timeout, ...)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API url '{0}'")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status code, if the server responded at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
