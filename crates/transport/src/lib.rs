//! Telephony transport layer
//!
//! The telephony provider speaks a small JSON protocol over a WebSocket:
//! text control frames carrying base64 audio payloads. This crate provides
//! the frame types for that protocol and the codec adapter that converts
//! between the wire encoding (8 kHz mu-law or PCM16) and the canonical
//! internal PCM16 sample buffer.

pub mod codec;
pub mod wire;

pub use codec::{linear_to_mulaw, mulaw_to_linear, CodecError, Resampler, WireCodec};
pub use wire::{parse_inbound, InboundEvent, OutboundFrame};

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("malformed wire message: {0}")]
    Malformed(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("transport disconnected")]
    Disconnected,
}
