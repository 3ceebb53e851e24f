//! Configuration for the voicebot
//!
//! - [`Settings`]: process configuration layered from files and environment
//! - [`DialogScript`]: the immutable scripted dialog content (pitch, guided
//!   steps, FAQ table, canned lines)

pub mod script;
pub mod settings;

pub use script::{DialogScript, FaqEntry, PhraseSet};
pub use settings::{
    load_settings, AudioSettings, DialogSettings, ObservabilityConfig, ServerConfig, Settings,
    SpeechSettings, UtteranceSettings, VadSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("dialog script error: {0}")]
    Script(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
