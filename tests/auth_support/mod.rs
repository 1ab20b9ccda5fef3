#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use azdo_auth::auth::DeviceCodeChallenge;
use azdo_auth::config::AuthConfig;
use azdo_auth::http::{HttpResponse, HttpTransport, TransportError};
use tokio::time::Instant;

pub const TOKEN_URL: &str = "https://login.example.test/oauth2/v2.0/token";
pub const ORG_URL: &str = "https://dev.azure.com/contoso";

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, String),
    Fail(TransportError),
    /// Never answers within any reasonable test horizon.
    Hang,
}

impl Step {
    pub fn pending() -> Self {
        Self::error("authorization_pending")
    }

    pub fn error(code: &str) -> Self {
        Self::Respond(400, format!(r#"{{"error":"{code}"}}"#))
    }

    pub fn token(access_token: &str) -> Self {
        Self::Respond(
            200,
            format!(
                r#"{{"access_token":"{access_token}","refresh_token":"rt-1","expires_in":3600,"token_type":"Bearer"}}"#
            ),
        )
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-process transport that replays a fixed script and records every call.
///
/// Works under paused tokio time, unlike a real socket-backed mock server.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `authorization_pending` forever.
    pub fn always_pending() -> Self {
        Self::new(Vec::new(), Step::pending())
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock poisoned").len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    fn record(
        &self,
        method: &'static str,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Step {
        let owned = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>()
        };
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(RecordedRequest {
                method,
                url: url.to_string(),
                form: owned(form),
                headers: owned(headers),
                at: Instant::now(),
            });
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn play(step: Step) -> Result<HttpResponse, TransportError> {
        match step {
            Step::Respond(status, body) => Ok(HttpResponse::new(status, body)),
            Step::Fail(error) => Err(error),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(TransportError::Timeout)
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let step = self.record("POST", url, form, headers);
        Self::play(step).await
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let step = self.record("GET", url, &[], headers);
        Self::play(step).await
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig::default()
        .with_client_id("test-client")
        .with_token_url(TOKEN_URL)
}

pub fn challenge(expires_in_secs: u64, interval_secs: u64) -> DeviceCodeChallenge {
    DeviceCodeChallenge::new(
        "device-code-1",
        "ABCD-EFGH",
        "https://microsoft.com/devicelogin",
        expires_in_secs,
        interval_secs,
        "To sign in, use a web browser to open https://microsoft.com/devicelogin and enter the code ABCD-EFGH.",
    )
}
