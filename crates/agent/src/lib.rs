//! Dialog agent
//!
//! Maps caller transcripts to a closed set of intents and drives the
//! scripted conversation: sales pitch, guided steps, FAQ answers, and the
//! human-handoff escalation path.

pub mod flow;
pub mod intent;

pub use flow::{DialogFlow, DialogPhase, FlowConfig, Turn};
pub use intent::{Intent, IntentClassifier};
