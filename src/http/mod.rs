//! HTTP transport seam and the shared reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::AuthConfig;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

/// Performs one timed request and reports status and body.
///
/// Implementations must apply their own per-request timeouts; callers never
/// retry inside a single call.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;

    async fn get(&self, url: &str, headers: &[(&str, &str)])
        -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a `reqwest::Client` with fixed timeouts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client using the connect/request timeouts and user agent in `config`.
    pub fn new(config: &AuthConfig) -> Result<Self, TransportError> {
        Self::with_timeouts(
            config.connect_timeout,
            config.request_timeout,
            &config.user_agent,
        )
    }

    pub fn with_timeouts(
        connect_timeout: Duration,
        request_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client. Its timeouts are the caller's responsibility.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = request.header(ACCEPT, "application/json");
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Request(format!("invalid header name: {e}")))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Request(format!("invalid header value: {e}")))?;
            if name == reqwest::header::AUTHORIZATION {
                value.set_sensitive(true);
            }
            request = request.header(name, value);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url, "POST");
        self.send(self.client.post(url).form(form), headers).await
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url, "GET");
        self.send(self.client.get(url), headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> ReqwestTransport {
        ReqwestTransport::with_timeouts(
            Duration::from_secs(2),
            Duration::from_secs(5),
            "azdo-auth-tests",
        )
        .unwrap()
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(300, "").is_success());
        assert!(!HttpResponse::new(400, "").is_success());
    }

    #[tokio::test]
    async fn post_form_sends_urlencoded_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("accept", "application/json"))
            .and(header("x-trace", "abc"))
            .and(body_string_contains("client_id=abc"))
            .and(body_string_contains("scope=a+b"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"error\":\"x\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport()
            .post_form(
                &format!("{}/token", server.uri()),
                &[("client_id", "abc"), ("scope", "a b")],
                &[("x-trace", "abc")],
            )
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.body, "{\"error\":\"x\"}");
    }

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let response = transport()
            .get(&format!("{}/ping", server.uri()), &[])
            .await
            .unwrap();
        assert_eq!(response, HttpResponse::new(200, "pong"));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::with_timeouts(
            Duration::from_secs(1),
            Duration::from_millis(200),
            "azdo-auth-tests",
        )
        .unwrap();
        let result = transport.get(&server.uri(), &[]).await;
        assert_eq!(result, Err(TransportError::Timeout));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let result = transport().get("http://127.0.0.1:1/", &[]).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
