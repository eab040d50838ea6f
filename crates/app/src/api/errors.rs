//! Storefront API errors.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status. `message` is the
    /// server's own message when it sent one.
    #[error("{message}")]
    Server { status: StatusCode, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response body")]
    Decode(#[source] serde_json::Error),

    /// The configured base URL cannot be joined with an endpoint path.
    #[error("invalid API URL {0:?}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether repeating the request may succeed.
    ///
    /// Connection failures, timeouts, 5xx responses and 429 are transient;
    /// everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(error) => !(error.is_builder() || error.is_decode() || error.is_redirect()),
            Self::Server { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }

    /// HTTP status, for server errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Transport(error) => error.status(),
            Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn server(status: u16, message: &str) -> Self {
        Self::Server {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: message.to_string(),
        }
    }
}
