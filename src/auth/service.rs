use std::sync::Arc;

use super::device_code::{DeviceCodeChallenge, DeviceCodeIssuer};
use super::poller::{PollHandle, TokenPoller};
use super::refresh::TokenRefresher;
use super::session::OAuthSession;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::{HttpTransport, ReqwestTransport};
use crate::pat::{PatCapabilityProbe, ValidationResult};

/// Facade bundling configuration and transport for every credential flow.
///
/// Holds no per-attempt state: each challenge, poll loop and session it hands
/// out is independent. All I/O decisions (printing, prompting, persistence)
/// belong to the caller.
///
/// # Example
/// ```no_run
/// use azdo_auth::auth::Authenticator;
/// use azdo_auth::config::AuthConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = Authenticator::new(AuthConfig::load()?)?;
/// let challenge = auth.request_device_code().await?;
/// println!("{}", challenge.message);
/// let outcome = auth.start_polling(challenge, "https://dev.azure.com/contoso").wait().await;
/// println!("{}", outcome.message());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Authenticator {
    config: AuthConfig,
    transport: Arc<dyn HttpTransport>,
}

impl Authenticator {
    /// Build with the reqwest transport configured from `config`.
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self { config, transport })
    }

    pub fn with_transport(config: AuthConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn device_code_issuer(&self) -> DeviceCodeIssuer {
        DeviceCodeIssuer::new(self.config.clone(), self.transport.clone())
    }

    pub fn token_poller(&self) -> TokenPoller {
        TokenPoller::new(self.config.clone(), self.transport.clone())
    }

    pub fn token_refresher(&self) -> TokenRefresher {
        TokenRefresher::new(self.config.clone(), self.transport.clone())
    }

    pub fn pat_probe(&self) -> PatCapabilityProbe {
        PatCapabilityProbe::new(self.transport.clone())
    }

    pub async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        self.device_code_issuer().request_device_code().await
    }

    /// Start polling for `challenge` on a background task.
    pub fn start_polling(
        &self,
        challenge: DeviceCodeChallenge,
        server_url: impl Into<String>,
    ) -> PollHandle {
        self.token_poller().spawn(challenge, server_url)
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        server_url: &str,
    ) -> Result<OAuthSession, AuthError> {
        self.token_refresher()
            .refresh_access_token(refresh_token, server_url)
            .await
    }

    pub async fn validate_pat(&self, server_url: &str, pat: &str) -> ValidationResult {
        self.pat_probe().validate(server_url, pat).await
    }
}
