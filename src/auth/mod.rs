//! OAuth device-code flow and token refresh.

pub mod device_code;
pub mod poller;
pub mod refresh;
pub mod service;
pub mod session;

pub use device_code::{DeviceCodeChallenge, DeviceCodeIssuer, DevicePrompt};
pub use poller::{PollHandle, PollOutcome, PollState, TokenPoller, DEVICE_CODE_GRANT_TYPE};
pub use refresh::TokenRefresher;
pub use service::Authenticator;
pub use session::OAuthSession;
