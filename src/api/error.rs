//! Error types for backend API calls.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur while talking to the backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// The session token was rejected (401/403)
    #[error("Not authorized: {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// A success response could not be decoded
    #[error("Failed to parse server response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),
}

impl ApiError {
    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Unauthorized { status, .. } => Some(*status),
            ApiError::Decode(_) | ApiError::Network(_) => None,
        }
    }

    /// Whether the rejection is about the access token, so a refresh may help.
    pub fn is_token_rejection(&self) -> bool {
        match self {
            ApiError::Unauthorized { message, .. } => message.to_lowercase().contains("token"),
            _ => false,
        }
    }
}

/// Error body shape used by the backend (`msg` from the auth layer, `error` elsewhere).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error: {}", status))
}

/// Turn a raw status + body into a typed response.
pub fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if (200..300).contains(&status) {
        return Ok(serde_json::from_str(body)?);
    }

    let message = error_message(status, body);
    log::warn!("Backend returned {}: {}", status, message);

    if status == 401 || status == 403 {
        Err(ApiError::Unauthorized { status, message })
    } else {
        Err(ApiError::Http { status, message })
    }
}
