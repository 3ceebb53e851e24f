//! Real-time voice turn-taking pipeline
//!
//! The per-call engine: inbound audio is decoded, cut into analysis frames,
//! classified by the VAD, assembled into utterances, transcribed, classified
//! into intents and answered through the dialog state machine, with replies
//! paced back out over the wire and cancellable mid-stream on barge-in.

pub mod frame;
pub mod orchestrator;
pub mod playback;
pub mod utterance;
pub mod vad;

pub use frame::FrameBuffer;
pub use orchestrator::{CallSession, SessionConfig};
pub use playback::{PlaybackConfig, PlaybackControl, PlaybackOutcome, PlaybackStreamer};
pub use utterance::{AssemblerConfig, UtteranceAssembler};
pub use vad::{EnergyVad, VadConfig, VadEngine, VadEvent, VadFrame};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("outbound channel closed")]
    ChannelClosed,

    #[error("audio error: {0}")]
    Audio(String),
}
