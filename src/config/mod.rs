//! Configuration (layered: defaults < config file < env < code).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Public client id registered for Azure DevOps device sign-in.
pub const DEFAULT_CLIENT_ID: &str = "872cd9fa-d31f-45e0-9eab-6e460a02d1f1";
/// Azure DevOps resource scope plus offline access for refresh tokens.
pub const DEFAULT_SCOPE: &str = "499b84ac-1321-427f-aa17-267ca6975798/.default offline_access";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/organizations";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const ENV_PREFIX: &str = "AZDO_AUTH_";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Identity-provider settings shared by the device flow and token refresh.
///
/// The client id and scope are fixed for a deployment and injected here rather
/// than read from global state.
///
/// # Example
/// ```
/// use azdo_auth::config::AuthConfig;
///
/// let config = AuthConfig::default().with_client_id("my-client");
/// assert_eq!(config.client_id, "my-client");
/// assert!(config.token_endpoint().ends_with("/oauth2/v2.0/token"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub client_id: String,
    pub scope: String,
    /// Authority base, e.g. `https://login.microsoftonline.com/organizations`.
    pub authority: String,
    pub device_code_url: Option<String>,
    pub token_url: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            device_code_url: None,
            token_url: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: format!("azdo-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AuthConfig {
    /// Defaults, then the default config file (if present), then environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        let path = Self::default_config_path();
        if path.exists() {
            config = config.merge_file(&path)?;
        }
        config.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Default config file path (`~/.azdo-auth/config.toml`).
    pub fn default_config_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }

    /// Overlay the settings present in a TOML file.
    pub fn merge_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.merge(file))
    }

    /// Overlay `AZDO_AUTH_*` variables resolved through `lookup`.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(value) = var("CLIENT_ID") {
            self.client_id = value;
        }
        if let Some(value) = var("SCOPE") {
            self.scope = value;
        }
        if let Some(value) = var("AUTHORITY") {
            self.authority = value;
        }
        if let Some(value) = var("DEVICE_CODE_URL") {
            self.device_code_url = Some(value);
        }
        if let Some(value) = var("TOKEN_URL") {
            self.token_url = Some(value);
        }
        if let Some(value) = var("CONNECT_TIMEOUT_SECS") {
            self.connect_timeout = parse_secs("CONNECT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout = parse_secs("REQUEST_TIMEOUT_SECS", &value)?;
        }
        Ok(self)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = Some(url.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Device authorization endpoint.
    pub fn device_code_endpoint(&self) -> String {
        self.device_code_url.clone().unwrap_or_else(|| {
            format!(
                "{}/oauth2/v2.0/devicecode",
                self.authority.trim_end_matches('/')
            )
        })
    }

    /// Token endpoint used for device-code polling and refresh.
    pub fn token_endpoint(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
        })
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(value) = file.client_id {
            self.client_id = value;
        }
        if let Some(value) = file.scope {
            self.scope = value;
        }
        if let Some(value) = file.authority {
            self.authority = value;
        }
        if file.device_code_url.is_some() {
            self.device_code_url = file.device_code_url;
        }
        if file.token_url.is_some() {
            self.token_url = file.token_url;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = file.user_agent {
            self.user_agent = value;
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    client_id: Option<String>,
    scope: Option<String>,
    authority: Option<String>,
    device_code_url: Option<String>,
    token_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{key}"),
            value: value.to_string(),
        }),
    }
}

fn default_config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".azdo-auth"))
        .unwrap_or_else(|| PathBuf::from(".azdo-auth"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_derive_endpoints_from_authority() {
        let config = AuthConfig::default();
        assert_eq!(
            config.device_code_endpoint(),
            "https://login.microsoftonline.com/organizations/oauth2/v2.0/devicecode"
        );
        assert_eq!(
            config.token_endpoint(),
            "https://login.microsoftonline.com/organizations/oauth2/v2.0/token"
        );
    }

    #[test]
    fn explicit_urls_override_authority() {
        let config = AuthConfig::default()
            .with_authority("https://login.example.com/tenant/")
            .with_token_url("http://localhost/token");
        assert_eq!(
            config.device_code_endpoint(),
            "https://login.example.com/tenant/oauth2/v2.0/devicecode"
        );
        assert_eq!(config.token_endpoint(), "http://localhost/token");
    }

    #[test]
    fn file_values_overlay_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "client_id = \"file-client\"\nrequest_timeout_secs = 7\n",
        )
        .unwrap();

        let config = AuthConfig::default().merge_file(&path).unwrap();
        assert_eq!(config.client_id, "file-client");
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "clientid = \"typo\"\n").unwrap();

        let result = AuthConfig::default().merge_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let result = AuthConfig::default().merge_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "client_id = \"file-client\"\nscope = \"file-scope\"\n").unwrap();

        let config = AuthConfig::default()
            .merge_file(&path)
            .unwrap()
            .apply_env_from(env(&[
                ("AZDO_AUTH_CLIENT_ID", "env-client"),
                ("AZDO_AUTH_CONNECT_TIMEOUT_SECS", "3"),
            ]))
            .unwrap();

        assert_eq!(config.client_id, "env-client");
        assert_eq!(config.scope, "file-scope");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config = AuthConfig::default()
            .apply_env_from(env(&[("AZDO_AUTH_SCOPE", "")]))
            .unwrap();
        assert_eq!(config.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let result = AuthConfig::default()
            .apply_env_from(env(&[("AZDO_AUTH_REQUEST_TIMEOUT_SECS", "soon")]));
        match result {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "AZDO_AUTH_REQUEST_TIMEOUT_SECS");
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
