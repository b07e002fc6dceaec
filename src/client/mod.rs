//! HTTP client for the ReaDefy API
//!
//! - [`AuthSession`]: sign-up, login, token persistence and logout
//! - [`ChatClient`]: paged message fetch, send and background polling

pub mod auth;
pub mod chat;
pub mod error;

pub use auth::{AuthSession, SignedIn, TOKEN_KEY, USER_NAME_KEY};
pub use chat::{validate_outgoing, ChatClient, ChatPoller, DEFAULT_POLL_INTERVAL};
pub use error::ClientError;
