//! Convenience re-exports for common use.

pub use crate::auth::{
    Authenticator, DeviceCodeChallenge, DevicePrompt, OAuthSession, PollHandle, PollOutcome,
    PollState,
};
pub use crate::config::AuthConfig;
pub use crate::error::{AuthError, HttpCondition};
pub use crate::http::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use crate::pat::{PatCapabilityProbe, ValidationResult};
