//! Organization URL handling for probe endpoints.

use url::Url;

use crate::error::AuthError;

/// REST API version used by every probe.
pub const API_VERSION: &str = "7.0";

/// A normalized Azure DevOps organization URL, e.g. `https://dev.azure.com/contoso`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationUrl {
    base: Url,
}

impl OrganizationUrl {
    /// Parse and normalize: trims whitespace and trailing slashes, requires http(s).
    pub fn parse(input: &str) -> Result<Self, AuthError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AuthError::InvalidArgument(
                "organization URL is empty".to_string(),
            ));
        }
        let mut base = Url::parse(trimmed)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AuthError::InvalidArgument(format!(
                "organization URL must use http or https: {trimmed}"
            )));
        }
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(AuthError::InvalidArgument(format!(
                "organization URL has no host: {trimmed}"
            )));
        }
        base.set_query(None);
        base.set_fragment(None);
        let segments: Vec<String> = base
            .path_segments()
            .map(|parts| {
                parts
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        base.set_path(&segments.join("/"));
        Ok(Self { base })
    }

    /// The normalized URL without a trailing slash.
    pub fn as_str(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// `GET {org}/_apis/projects?$top=1&api-version=7.0`
    pub fn projects_url(&self) -> Result<Url, AuthError> {
        self.endpoint(None, &["_apis", "projects"])
    }

    /// `GET {org}/{project}/_apis/git/repositories?$top=1&api-version=7.0`
    pub fn repositories_url(&self, project: &str) -> Result<Url, AuthError> {
        self.endpoint(Some(project), &["_apis", "git", "repositories"])
    }

    /// `GET {org}/{project}/_apis/git/pullrequests?$top=1&api-version=7.0`
    pub fn pull_requests_url(&self, project: &str) -> Result<Url, AuthError> {
        self.endpoint(Some(project), &["_apis", "git", "pullrequests"])
    }

    fn endpoint(&self, project: Option<&str>, tail: &[&str]) -> Result<Url, AuthError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AuthError::InvalidArgument(format!("cannot build a URL from {}", self.base))
            })?;
            segments.pop_if_empty();
            // push() percent-encodes as a path segment: space becomes %20, '/' becomes %2F
            if let Some(project) = project {
                segments.push(project);
            }
            segments.extend(tail);
        }
        url.set_query(Some(&format!("$top=1&api-version={API_VERSION}")));
        Ok(url)
    }
}
