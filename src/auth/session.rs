use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AuthError;

/// An OAuth session obtained from the device flow or a refresh.
///
/// Sessions are immutable: refreshing yields a new value and never touches
/// the one it was derived from. The access token is never empty.
///
/// # Example
/// ```
/// use azdo_auth::auth::OAuthSession;
///
/// let session = OAuthSession::new("access", Some("refresh".into()), Some(3600), "https://dev.azure.com/org")?;
/// assert_eq!(session.bearer_header(), "Bearer access");
/// assert!(!session.is_expired());
/// # Ok::<(), azdo_auth::error::AuthError>(())
/// ```
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OAuthSession {
    access_token: String,
    refresh_token: Option<String>,
    expires_in_secs: Option<u64>,
    server_url: String,
    obtained_at: DateTime<Utc>,
}

impl OAuthSession {
    /// Build a session, rejecting an empty access token.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<u64>,
        server_url: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(AuthError::Protocol(
                "token response did not include an access token".to_string(),
            ));
        }
        Ok(Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_in_secs,
            server_url: server_url.into(),
            obtained_at: Utc::now(),
        })
    }

    /// Parse a token-endpoint success body.
    pub(crate) fn from_token_response(body: &str, server_url: &str) -> Result<Self, AuthError> {
        let payload: TokenResponse = serde_json::from_str(body)?;
        Self::new(
            payload.access_token.unwrap_or_default(),
            payload.refresh_token,
            payload.expires_in,
            server_url,
        )
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_in_secs(&self) -> Option<u64> {
        self.expires_in_secs
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    /// Absolute expiry, when the provider reported a lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.expires_in_secs?).ok()?;
        self.obtained_at
            .checked_add_signed(Duration::try_seconds(secs)?)
    }

    /// Whether the access token has expired. Sessions without a lifetime never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|exp| exp <= Utc::now())
    }

    /// Value for an `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for OAuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSession")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_in_secs", &self.expires_in_secs)
            .field("server_url", &self.server_url)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    expires_in: Option<u64>,
}

/// Accepts `3600` or `"3600"`.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(num)) => num.as_u64(),
        Some(serde_json::Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}
