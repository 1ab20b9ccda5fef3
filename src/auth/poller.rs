//! Device-code token polling.
//!
//! One poll loop runs per challenge. It sleeps the provider-mandated interval
//! before every request, never sends a request once the challenge's lifetime
//! has elapsed, and stops at the next sleep or request boundary when
//! cancelled.

use std::sync::Arc;

use serde::Deserialize;
use strum::Display;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use super::device_code::DeviceCodeChallenge;
use super::session::OAuthSession;
use crate::config::AuthConfig;
use crate::error::HttpCondition;
use crate::http::{HttpResponse, HttpTransport, TransportError};

pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

const AUTHORIZATION_PENDING: &str = "authorization_pending";
const AUTHORIZATION_DECLINED: &str = "authorization_declined";
const EXPIRED_TOKEN: &str = "expired_token";

/// States of the device-grant polling machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PollState {
    Issued,
    Polling,
    Succeeded,
    Declined,
    Expired,
    Failed,
    Cancelled,
}

/// Terminal result of a poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The user approved the request.
    Succeeded(OAuthSession),
    /// The user declined the request.
    Declined,
    /// The device code lifetime ran out.
    Expired,
    /// The provider reported an unrecoverable error.
    Failed(String),
    /// The caller cancelled polling.
    Cancelled,
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            Self::Succeeded(_) => PollState::Succeeded,
            Self::Declined => PollState::Declined,
            Self::Expired => PollState::Expired,
            Self::Failed(_) => PollState::Failed,
            Self::Cancelled => PollState::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn into_session(self) -> Option<OAuthSession> {
        match self {
            Self::Succeeded(session) => Some(session),
            _ => None,
        }
    }

    /// Guidance to show the user for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::Succeeded(_) => "Signed in.".to_string(),
            Self::Declined => {
                "Sign-in was declined. Start the sign-in again and approve the request to continue."
                    .to_string()
            }
            Self::Expired => {
                "The sign-in code expired before it was used. Start the sign-in again.".to_string()
            }
            Self::Failed(reason) => reason.clone(),
            Self::Cancelled => "Sign-in was cancelled.".to_string(),
        }
    }
}

/// Classified result of a non-terminal poll response.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PollCondition {
    Pending,
    Transient(HttpCondition),
}

enum PollStep {
    Continue(PollCondition),
    Finish(PollOutcome),
}

/// Bookkeeping for one poll loop.
#[derive(Debug)]
struct PollAttemptState {
    id: Uuid,
    issued_at: Instant,
    deadline: Instant,
    requests: u32,
    last_condition: Option<PollCondition>,
}

impl PollAttemptState {
    fn new(challenge: &DeviceCodeChallenge) -> Self {
        Self {
            id: Uuid::new_v4(),
            issued_at: challenge.issued_at(),
            deadline: challenge.deadline(),
            requests: 0,
            last_condition: None,
        }
    }

    fn deadline_reached(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Handle to a poll loop running on its own task.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    result_rx: oneshot::Receiver<PollOutcome>,
    drop_guard: DropGuard,
}

impl PollHandle {
    /// Ask the loop to stop at its next sleep or request boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this loop, for use from another task (e.g. a dialog close).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> PollOutcome {
        let Self {
            result_rx,
            drop_guard,
            ..
        } = self;
        let outcome = result_rx.await.unwrap_or_else(|_| {
            PollOutcome::Failed("The sign-in worker stopped unexpectedly.".to_string())
        });
        drop(drop_guard);
        outcome
    }
}

/// Runs the device-grant polling state machine.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use azdo_auth::auth::{DeviceCodeIssuer, PollOutcome, TokenPoller};
/// use azdo_auth::config::AuthConfig;
/// use azdo_auth::http::ReqwestTransport;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AuthConfig::default();
/// let transport = Arc::new(ReqwestTransport::new(&config)?);
/// let challenge = DeviceCodeIssuer::new(config.clone(), transport.clone())
///     .request_device_code()
///     .await?;
/// let handle = TokenPoller::new(config, transport).spawn(challenge, "https://dev.azure.com/org");
/// match handle.wait().await {
///     PollOutcome::Succeeded(session) => println!("expires at {:?}", session.expires_at()),
///     other => eprintln!("{}", other.message()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TokenPoller {
    config: AuthConfig,
    transport: Arc<dyn HttpTransport>,
}

impl TokenPoller {
    pub fn new(config: AuthConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Start polling on a dedicated task.
    pub fn spawn(&self, challenge: DeviceCodeChallenge, server_url: impl Into<String>) -> PollHandle {
        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();
        let poller = self.clone();
        let server_url = server_url.into();
        let token = cancel.clone();

        tokio::spawn(async move {
            let outcome = poller.poll(challenge, &server_url, token).await;
            let _ = result_tx.send(outcome);
        });

        PollHandle {
            drop_guard: cancel.clone().drop_guard(),
            cancel,
            result_rx,
        }
    }

    /// Run the poll loop on the current task until a terminal outcome.
    pub async fn poll(
        &self,
        challenge: DeviceCodeChallenge,
        server_url: &str,
        cancel: CancellationToken,
    ) -> PollOutcome {
        let mut state = PollAttemptState::new(&challenge);
        let interval = challenge.poll_interval();
        let url = self.config.token_endpoint();
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ("device_code", challenge.device_code()),
        ];

        tracing::debug!(
            attempt = %state.id,
            state = %PollState::Polling,
            interval_secs = interval.as_secs(),
            expires_in_secs = challenge.expires_in_secs,
            "device code polling started"
        );

        let outcome = loop {
            if cancel.is_cancelled() {
                break PollOutcome::Cancelled;
            }
            if state.deadline_reached() {
                break PollOutcome::Expired;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break PollOutcome::Cancelled,
                _ = tokio::time::sleep_until(state.deadline) => break PollOutcome::Expired,
                _ = tokio::time::sleep(interval) => {}
            }
            if state.deadline_reached() {
                break PollOutcome::Expired;
            }

            state.requests += 1;
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => break PollOutcome::Cancelled,
                _ = tokio::time::sleep_until(state.deadline) => break PollOutcome::Expired,
                response = self.transport.post_form(&url, &form, &[]) => response,
            };

            match interpret(response, server_url) {
                PollStep::Continue(condition) => {
                    if let PollCondition::Transient(ref http) = condition {
                        tracing::debug!(
                            attempt = %state.id,
                            request = state.requests,
                            status = http.status(),
                            body = ?http.body_excerpt(),
                            "transient poll failure, continuing"
                        );
                    }
                    state.last_condition = Some(condition);
                }
                PollStep::Finish(outcome) => break outcome,
            }
        };

        tracing::info!(
            attempt = %state.id,
            state = %outcome.state(),
            requests = state.requests,
            elapsed_secs = state.issued_at.elapsed().as_secs(),
            last_condition = ?state.last_condition,
            "device code polling finished"
        );
        outcome
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
}

fn interpret(response: Result<HttpResponse, TransportError>, server_url: &str) -> PollStep {
    let response = match response {
        Ok(response) => response,
        Err(_) => return PollStep::Continue(PollCondition::Transient(HttpCondition::NetworkUnreachable)),
    };

    if response.is_success() {
        return PollStep::Finish(
            match OAuthSession::from_token_response(&response.body, server_url) {
                Ok(session) => PollOutcome::Succeeded(session),
                Err(error) => PollOutcome::Failed(error.to_string()),
            },
        );
    }

    if response.status != 400 {
        return PollStep::Continue(PollCondition::Transient(HttpCondition::classify(
            i32::from(response.status),
            &response.body,
        )));
    }

    match response.json::<TokenErrorResponse>() {
        Ok(payload) => match payload.error.as_str() {
            AUTHORIZATION_PENDING => PollStep::Continue(PollCondition::Pending),
            AUTHORIZATION_DECLINED => PollStep::Finish(PollOutcome::Declined),
            EXPIRED_TOKEN => PollStep::Finish(PollOutcome::Expired),
            other => PollStep::Finish(PollOutcome::Failed(format!(
                "Sign-in failed ({other}). Start the sign-in again."
            ))),
        },
        Err(_) => PollStep::Finish(PollOutcome::Failed(
            "Sign-in failed: the identity provider returned an unreadable error. Start the sign-in again."
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(status: u16, body: &str) -> PollStep {
        interpret(Ok(HttpResponse::new(status, body)), "https://dev.azure.com/org")
    }

    #[test]
    fn pending_continues() {
        assert!(matches!(
            step(400, r#"{"error":"authorization_pending"}"#),
            PollStep::Continue(PollCondition::Pending)
        ));
    }

    #[test]
    fn declined_and_expired_are_terminal() {
        assert!(matches!(
            step(400, r#"{"error":"authorization_declined"}"#),
            PollStep::Finish(PollOutcome::Declined)
        ));
        assert!(matches!(
            step(400, r#"{"error":"expired_token"}"#),
            PollStep::Finish(PollOutcome::Expired)
        ));
    }

    #[test]
    fn unknown_error_fails_with_code() {
        match step(400, r#"{"error":"bad_verification_code","error_description":"AADSTS..."}"#) {
            PollStep::Finish(PollOutcome::Failed(reason)) => {
                assert!(reason.contains("bad_verification_code"));
                assert!(!reason.contains("AADSTS"));
            }
            _ => panic!("expected Failed"),
        }
    }

    #[test]
    fn unreadable_400_fails() {
        assert!(matches!(
            step(400, "not json"),
            PollStep::Finish(PollOutcome::Failed(_))
        ));
    }

    #[test]
    fn other_statuses_are_transient() {
        assert!(matches!(
            step(503, "busy"),
            PollStep::Continue(PollCondition::Transient(HttpCondition::Other { status: 503, .. }))
        ));
        assert!(matches!(
            step(401, ""),
            PollStep::Continue(PollCondition::Transient(HttpCondition::Unauthorized))
        ));
    }

    #[test]
    fn transport_errors_are_transient() {
        assert!(matches!(
            interpret(Err(TransportError::Timeout), "u"),
            PollStep::Continue(PollCondition::Transient(HttpCondition::NetworkUnreachable))
        ));
    }

    #[test]
    fn success_without_access_token_fails() {
        assert!(matches!(
            step(200, r#"{"token_type":"Bearer"}"#),
            PollStep::Finish(PollOutcome::Failed(_))
        ));
    }

    #[test]
    fn success_builds_session() {
        match step(200, r#"{"access_token":"at","refresh_token":"rt","expires_in":3600}"#) {
            PollStep::Finish(PollOutcome::Succeeded(session)) => {
                assert_eq!(session.access_token(), "at");
                assert_eq!(session.server_url(), "https://dev.azure.com/org");
            }
            _ => panic!("expected Succeeded"),
        }
    }

    #[test]
    fn outcomes_map_to_states_and_distinct_messages() {
        assert_eq!(PollOutcome::Declined.state(), PollState::Declined);
        assert_eq!(PollOutcome::Expired.state(), PollState::Expired);
        assert_eq!(PollOutcome::Failed("x".into()).state(), PollState::Failed);
        assert_eq!(PollOutcome::Cancelled.state(), PollState::Cancelled);
        assert_ne!(PollOutcome::Declined.message(), PollOutcome::Expired.message());
        assert_eq!(PollState::Succeeded.to_string(), "succeeded");
    }
}
