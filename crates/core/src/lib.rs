//! Core types for the voicebot
//!
//! Foundational audio types used across all other crates. Error taxonomies
//! live with their components (`CodecError`, `SpeechError`, `PipelineError`);
//! every failure mode short of a transport disconnect is recoverable.

pub mod audio;

pub use audio::{AudioFrame, Utterance};
