//! Classification of HTTP outcomes into user-facing conditions.

use std::fmt;

use crate::http::{HttpResponse, TransportError};

/// Status recorded when no response was received at all.
pub const NETWORK_UNREACHABLE: i32 = -1;

const BODY_EXCERPT_CHARS: usize = 200;

/// The closed set of outcomes every HTTP failure is reduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpCondition {
    /// 401.
    Unauthorized,
    /// 403.
    Forbidden,
    /// 404.
    NotFound,
    /// Transport failure, status [`NETWORK_UNREACHABLE`].
    NetworkUnreachable,
    /// Anything else.
    Other { status: i32, body: String },
}

impl HttpCondition {
    /// Map a status code (or [`NETWORK_UNREACHABLE`]) and body to a condition.
    pub fn classify(status: i32, body: &str) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            NETWORK_UNREACHABLE => Self::NetworkUnreachable,
            _ => Self::Other {
                status,
                body: body.to_string(),
            },
        }
    }

    /// Classify the result of a single transport call.
    pub fn from_outcome(outcome: &Result<HttpResponse, TransportError>) -> Self {
        match outcome {
            Ok(response) => Self::classify(i32::from(response.status), &response.body),
            Err(_) => Self::NetworkUnreachable,
        }
    }

    pub fn status(&self) -> i32 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::NetworkUnreachable => NETWORK_UNREACHABLE,
            Self::Other { status, .. } => *status,
        }
    }

    /// Remediation text shown to the user for this condition.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Authentication failed (401). The credential is invalid or has expired; sign in again or create a new Personal Access Token.".to_string(),
            Self::Forbidden => "Access denied (403). The credential lacks the required permissions; check the token scopes or your access to the organization.".to_string(),
            Self::NotFound => "Not found (404). Verify the organization URL is correct.".to_string(),
            Self::NetworkUnreachable => "Unable to reach the server. Check your network connection and the server URL.".to_string(),
            Self::Other { status, .. } => format!("Unexpected response from the server (HTTP {status}). Verify the server URL and try again."),
        }
    }

    /// Truncated response body for logs. Never part of [`HttpCondition::message`].
    pub fn body_excerpt(&self) -> Option<String> {
        match self {
            Self::Other { body, .. } if !body.trim().is_empty() => Some(excerpt(body)),
            _ => None,
        }
    }
}

impl fmt::Display for HttpCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}
