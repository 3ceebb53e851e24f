//! Voicebot server
//!
//! Hosts the telephony provider's WebSocket alongside a health route and a
//! per-call session registry. One accepted socket becomes one
//! [`voicebot_pipeline::CallSession`].

pub mod http;
pub mod session;
pub mod state;

pub use http::create_router;
pub use session::SessionManager;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session error: {0}")]
    Session(String),
}
