//! Error types for azdo-auth.

pub mod classify;

pub use classify::{HttpCondition, NETWORK_UNREACHABLE};

use thiserror::Error;

use crate::http::TransportError;

/// Failure of a credential operation.
///
/// Every variant renders as a message that can be shown to the user as-is.
/// Authorization-pending, declined and expired device codes are not errors;
/// they surface as [`crate::auth::PollOutcome`] values.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No HTTP response arrived (DNS, connect, timeout).
    #[error("{msg} ({0})", msg = HttpCondition::NetworkUnreachable.message())]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("{0}")]
    Http(HttpCondition),

    /// The identity provider rejected a refresh token or grant.
    #[error("The saved sign-in is no longer valid ({error}). Sign in again or enter a Personal Access Token.")]
    InvalidGrant { error: String },

    /// The response body could not be understood.
    #[error("Unexpected response from the server: {0}. Verify the server URL and try again.")]
    Protocol(String),

    /// Caller-supplied input was unusable; no request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AuthError {
    /// Classified HTTP condition behind this error, if it came from the wire.
    pub fn condition(&self) -> Option<HttpCondition> {
        match self {
            Self::Transport(_) => Some(HttpCondition::NetworkUnreachable),
            Self::Http(condition) => Some(condition.clone()),
            _ => None,
        }
    }

    /// Build the error for a non-success response.
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::Http(HttpCondition::classify(i32::from(status), body))
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(error.to_string())
    }
}

impl From<url::ParseError> for AuthError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidArgument(format!("malformed URL: {error}"))
    }
}
