//! azdo-auth — credential acquisition for Azure DevOps
//!
//! Obtains and checks the credentials an editor integration needs to talk to
//! Azure DevOps: an OAuth 2.0 Device Authorization Grant client (device-code
//! issuance, polling, refresh) and a Personal Access Token capability probe.
//! Persisting credentials and using them afterwards is left to the caller.
//!
//! # Quick Start
//!
//! ```no_run
//! use azdo_auth::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Authenticator::new(AuthConfig::load()?)?;
//!
//! let challenge = auth.request_device_code().await?;
//! println!("Visit {} and enter {}", challenge.verification_uri, challenge.user_code);
//!
//! match auth.start_polling(challenge, "https://dev.azure.com/contoso").wait().await {
//!     PollOutcome::Succeeded(session) => println!("token expires at {:?}", session.expires_at()),
//!     other => eprintln!("{}", other.message()),
//! }
//!
//! let check = auth.validate_pat("https://dev.azure.com/contoso", "my-pat").await;
//! println!("{}", check.message);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod pat;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
