//! Personal Access Token capability probing.
//!
//! Basic-auth PATs expose no endpoint that lists their granted scopes, so
//! permissions are inferred by attempting representative read operations and
//! observing which succeed.

pub mod org_url;

pub use org_url::{OrganizationUrl, API_VERSION};

use std::fmt;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, HttpCondition};
use crate::http::{HttpResponse, HttpTransport};

/// Permission label reported when the repository probe fails.
pub const CLONE_PERMISSION_LABEL: &str = "Code (Read) — required for Clone";
/// Permission label reported when the pull-request probe fails.
pub const PULL_REQUEST_PERMISSION_LABEL: &str = "Code (Read) — required for Pull Requests";

/// What a PAT was found to be able to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub can_list_projects: bool,
    pub can_list_repos: bool,
    pub can_list_pull_requests: bool,
    pub message: String,
}

impl ValidationResult {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            can_list_projects: false,
            can_list_repos: false,
            can_list_pull_requests: false,
            message: message.into(),
        }
    }
}

/// A PAT wrapped for Basic authentication (empty username, PAT as password).
#[derive(Clone, PartialEq, Eq)]
pub struct PatCredential(String);

impl PatCredential {
    pub fn new(pat: impl Into<String>) -> Self {
        Self(pat.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `Basic base64(":" + pat)`.
    pub fn basic_header(&self) -> String {
        format!("Basic {}", BASE64_STANDARD.encode(format!(":{}", self.0)))
    }
}

impl fmt::Debug for PatCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PatCredential(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    value: Vec<ProjectRef>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    name: String,
}

/// Infers PAT permissions through a sequence of dependent API probes.
///
/// Probes run strictly in order on the calling task: the project probe must
/// succeed before the repository and pull-request probes can be addressed.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use azdo_auth::config::AuthConfig;
/// use azdo_auth::http::ReqwestTransport;
/// use azdo_auth::pat::PatCapabilityProbe;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(ReqwestTransport::new(&AuthConfig::default())?);
/// let result = PatCapabilityProbe::new(transport)
///     .validate("https://dev.azure.com/contoso", "my-pat")
///     .await;
/// println!("{}", result.message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PatCapabilityProbe {
    transport: Arc<dyn HttpTransport>,
}

impl PatCapabilityProbe {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub async fn validate(&self, server_url: &str, pat: &str) -> ValidationResult {
        let credential = PatCredential::new(pat);
        if credential.is_empty() {
            return ValidationResult::rejected(
                "No Personal Access Token was provided. Create a token with Code (Read) scope and enter it.",
            );
        }
        let org = match OrganizationUrl::parse(server_url) {
            Ok(org) => org,
            Err(error) => return ValidationResult::rejected(format!("{error}. Verify the organization URL.")),
        };
        let auth = credential.basic_header();

        match self.probe_sequence(&org, &auth).await {
            Ok(result) => result,
            Err(error) => ValidationResult::rejected(error.to_string()),
        }
    }

    async fn probe_sequence(
        &self,
        org: &OrganizationUrl,
        auth: &str,
    ) -> Result<ValidationResult, AuthError> {
        let projects = match self.probe("projects", org.projects_url()?.as_str(), auth).await {
            Ok(response) => response,
            Err(condition) => return Ok(ValidationResult::rejected(condition.message())),
        };

        let listing: ProjectList = projects.json().map_err(|_| {
            AuthError::Protocol("the project list could not be read".to_string())
        })?;
        let Some(project) = listing.value.into_iter().next() else {
            tracing::info!(org = org.as_str(), "organization has no projects");
            return Ok(ValidationResult {
                valid: true,
                can_list_projects: true,
                can_list_repos: false,
                can_list_pull_requests: false,
                message: "Token can list projects, but the organization has no projects so repository and pull request access could not be checked.".to_string(),
            });
        };

        let repos = self
            .probe("repositories", org.repositories_url(&project.name)?.as_str(), auth)
            .await;
        let pulls = self
            .probe("pullrequests", org.pull_requests_url(&project.name)?.as_str(), auth)
            .await;

        let can_list_repos = repos.is_ok();
        let can_list_pull_requests = pulls.is_ok();
        let missing: Vec<&str> = [
            (!can_list_repos).then_some(CLONE_PERMISSION_LABEL),
            (!can_list_pull_requests).then_some(PULL_REQUEST_PERMISSION_LABEL),
        ]
        .into_iter()
        .flatten()
        .collect();

        let message = if missing.is_empty() {
            "Token verified: project, repository and pull request access confirmed.".to_string()
        } else {
            format!(
                "The token is missing required permissions: {}. Update the token scopes and try again.",
                missing.join("; ")
            )
        };

        Ok(ValidationResult {
            valid: can_list_repos && can_list_pull_requests,
            can_list_projects: true,
            can_list_repos,
            can_list_pull_requests,
            message,
        })
    }

    async fn probe(&self, name: &str, url: &str, auth: &str) -> Result<HttpResponse, HttpCondition> {
        let outcome = self.transport.get(url, &[("Authorization", auth)]).await;
        match outcome {
            Ok(response) if response.is_success() => {
                tracing::debug!(probe = name, status = response.status, "probe passed");
                Ok(response)
            }
            other => {
                let condition = HttpCondition::from_outcome(&other);
                tracing::debug!(probe = name, status = condition.status(), "probe failed");
                Err(condition)
            }
        }
    }
}
