use std::sync::Arc;

use serde::Deserialize;

use super::session::OAuthSession;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::HttpTransport;

const INVALID_GRANT: &str = "invalid_grant";

/// Exchanges a refresh token for a new session.
///
/// A single attempt per call: an expired or revoked token, or a network
/// failure, is returned immediately so the caller can fall back to a fresh
/// device-code flow or manual PAT entry.
#[derive(Clone)]
pub struct TokenRefresher {
    config: AuthConfig,
    transport: Arc<dyn HttpTransport>,
}

#[derive(Debug, Deserialize)]
struct GrantErrorResponse {
    error: String,
}

impl TokenRefresher {
    pub fn new(config: AuthConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        server_url: &str,
    ) -> Result<OAuthSession, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidArgument(
                "refresh token is empty".to_string(),
            ));
        }

        let url = self.config.token_endpoint();
        let response = self
            .transport
            .post_form(
                &url,
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("scope", self.config.scope.as_str()),
                ],
                &[],
            )
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "token refresh request failed"))?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "token refresh rejected");
            if matches!(response.status, 400 | 401) {
                if let Ok(payload) = response.json::<GrantErrorResponse>() {
                    if payload.error == INVALID_GRANT {
                        return Err(AuthError::InvalidGrant {
                            error: payload.error,
                        });
                    }
                }
            }
            return Err(AuthError::from_status(response.status, &response.body));
        }

        let session = OAuthSession::from_token_response(&response.body, server_url)?;
        tracing::info!(expires_in_secs = ?session.expires_in_secs(), "access token refreshed");
        Ok(session)
    }
}
