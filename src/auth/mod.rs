//! Authorization capture: credential classification, the two OAuth grant
//! flows, and the transient redirect listener.

pub mod credential;
pub mod dispatch;
pub mod listener;
pub mod session;

pub use credential::Credential;
pub use dispatch::{send_auth_request, AuthConfig, BrowserOpener, Opener};
pub use session::Session;
