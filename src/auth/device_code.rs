use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::HttpTransport;

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 900;
/// Poll interval assumed when the provider omits `interval`.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

// Stand-in deadline when `expires_in` is too large to add to an Instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A device/user code pair issued by the identity provider.
///
/// The device code is a secret: it is not exposed publicly and is redacted
/// from `Debug` output. Use [`DeviceCodeChallenge::prompt`] for what the UI
/// shows. A challenge is consumed by exactly one poller.
pub struct DeviceCodeChallenge {
    device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in_secs: u64,
    pub interval_secs: u64,
    pub message: String,
    issued_at: Instant,
}

/// The user-visible part of a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePrompt {
    pub user_code: String,
    pub verification_uri: String,
    pub message: String,
}

impl DeviceCodeChallenge {
    /// Build a challenge issued now.
    pub fn new(
        device_code: impl Into<String>,
        user_code: impl Into<String>,
        verification_uri: impl Into<String>,
        expires_in_secs: u64,
        interval_secs: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            device_code: device_code.into(),
            user_code: user_code.into(),
            verification_uri: verification_uri.into(),
            expires_in_secs,
            interval_secs,
            message: message.into(),
            issued_at: Instant::now(),
        }
    }

    pub(crate) fn device_code(&self) -> &str {
        &self.device_code
    }

    pub fn prompt(&self) -> DevicePrompt {
        DevicePrompt {
            user_code: self.user_code.clone(),
            verification_uri: self.verification_uri.clone(),
            message: self.message.clone(),
        }
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Instant after which no poll request may be sent.
    pub fn deadline(&self) -> Instant {
        self.issued_at
            .checked_add(Duration::from_secs(self.expires_in_secs))
            .unwrap_or(self.issued_at + FAR_FUTURE)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline()
    }

    /// Delay between poll requests (never shorter than one second).
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl fmt::Debug for DeviceCodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeChallenge")
            .field("device_code", &"<redacted>")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("expires_in_secs", &self.expires_in_secs)
            .field("interval_secs", &self.interval_secs)
            .field("message", &self.message)
            .finish()
    }
}

/// Requests device codes from the identity provider.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use azdo_auth::auth::DeviceCodeIssuer;
/// use azdo_auth::config::AuthConfig;
/// use azdo_auth::http::ReqwestTransport;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AuthConfig::default();
/// let transport = Arc::new(ReqwestTransport::new(&config)?);
/// let challenge = DeviceCodeIssuer::new(config, transport).request_device_code().await?;
/// println!("Enter {} at {}", challenge.user_code, challenge.verification_uri);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeviceCodeIssuer {
    config: AuthConfig,
    transport: Arc<dyn HttpTransport>,
}

impl DeviceCodeIssuer {
    pub fn new(config: AuthConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Issue one device-code request. Retrying is left to the caller.
    pub async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        let url = self.config.device_code_endpoint();
        let response = self
            .transport
            .post_form(
                &url,
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("scope", self.config.scope.as_str()),
                ],
                &[],
            )
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "device code request failed"))?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "device code request rejected");
            return Err(AuthError::from_status(response.status, &response.body));
        }

        let payload: DeviceCodeResponse = response.json()?;
        if payload.device_code.is_empty() || payload.user_code.is_empty() {
            return Err(AuthError::Protocol(
                "device code response is missing device_code or user_code".to_string(),
            ));
        }
        tracing::info!(
            expires_in_secs = payload.expires_in,
            interval_secs = payload.interval,
            "device code issued"
        );
        Ok(DeviceCodeChallenge::new(
            payload.device_code,
            payload.user_code,
            payload.verification_uri,
            payload.expires_in,
            payload.interval,
            payload.message,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
    #[serde(default)]
    message: String,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}
