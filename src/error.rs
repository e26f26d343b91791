//! Error types for the proxy and control-plane clients.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// A collaborator answered with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("api error ({status}): {body}")]
pub struct ApiError {
    pub status: StatusCode,
    pub body: String,
}

impl ApiError {
    /// Returns the `error` field of a JSON body, or the raw body.
    pub fn message(&self) -> String {
        #[derive(serde::Deserialize)]
        struct Body {
            error: String,
        }

        serde_json::from_str::<Body>(&self.body)
            .map(|b| b.error)
            .unwrap_or_else(|_| self.body.trim().to_string())
    }
}

/// Errors returned by the HTTP collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The collaborator could not be reached or the connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid TLS material {path}: {reason}")]
    Tls { path: PathBuf, reason: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ClientError {
    /// Whether the collaborator responded with a non-success status.
    pub fn is_api_error(&self) -> bool {
        matches!(self, ClientError::Api(_))
    }

    /// Returns the API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }
}
