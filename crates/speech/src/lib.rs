//! Speech services facade
//!
//! The turn-taking engine depends on two synchronous external operations:
//! transcription (audio to text) and synthesis (text to audio). Both are
//! failure-prone network calls; the engine treats their failures as soft.
//! This crate provides the trait seam, the Sarvam AI HTTP implementation,
//! and a deterministic mock for tests.

pub mod mock;
pub mod sarvam;
mod wav;

pub use mock::MockSpeech;
pub use sarvam::{SarvamClient, SarvamConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Speech service errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("unexpected payload: {0}")]
    Payload(String),

    #[error("wav framing error: {0}")]
    Wav(#[from] hound::Error),

    #[error("synthesis rejected: {0}")]
    Synthesis(String),
}

/// External speech operations the engine depends on but does not implement.
///
/// `transcribe` returns `Ok("")` when the service detected no speech; callers
/// treat `Err` the same way (re-prompt). `synthesize` failures cause the
/// reply to be skipped, never the session to end.
#[async_trait]
pub trait SpeechServices: Send + Sync {
    /// Transcribe a PCM16 utterance
    async fn transcribe(
        &self,
        samples: &[i16],
        sample_rate: u32,
        language: &str,
    ) -> Result<String, SpeechError>;

    /// Synthesize text to PCM16 audio at the requested sample rate
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        sample_rate: u32,
    ) -> Result<Vec<i16>, SpeechError>;
}
