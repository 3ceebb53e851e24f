//! Wire protocol frames
//!
//! The provider sends JSON text frames: `{"event":"start"}`,
//! `{"event":"media","media":{"payload":"<base64>"}}`, `{"event":"stop"}`,
//! and an informational `{"event":"connected"}` before `start`. Outbound
//! media frames mirror the inbound shape; `{"event":"clear"}` tells the
//! provider to drop any buffered outbound audio (barge-in cutoff).

use serde::{Deserialize, Serialize};

use crate::TransportError;

#[derive(Debug, Deserialize)]
struct WireMessage {
    event: String,
    #[serde(default)]
    media: Option<MediaPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MediaPayload {
    payload: String,
}

/// Parsed inbound control frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Informational; precedes `start` with some providers
    Connected,
    /// Session begin
    Start,
    /// Inbound audio chunk (base64, wire-encoded)
    Media { payload: String },
    /// Session end
    Stop,
}

/// Parse an inbound JSON text frame
pub fn parse_inbound(text: &str) -> Result<InboundEvent, TransportError> {
    let msg: WireMessage =
        serde_json::from_str(text).map_err(|e| TransportError::Malformed(e.to_string()))?;

    match msg.event.as_str() {
        "connected" => Ok(InboundEvent::Connected),
        "start" => Ok(InboundEvent::Start),
        "media" => {
            let media = msg
                .media
                .ok_or_else(|| TransportError::Malformed("media event without payload".to_string()))?;
            Ok(InboundEvent::Media {
                payload: media.payload,
            })
        }
        "stop" => Ok(InboundEvent::Stop),
        other => Err(TransportError::UnknownEvent(other.to_string())),
    }
}

/// Outbound frame toward the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Playback audio chunk (base64, wire-encoded)
    Media { payload: String },
    /// Discard any buffered outbound audio
    Clear,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaPayload>,
}

impl OutboundFrame {
    /// Serialize to the wire JSON text form
    pub fn to_json(&self) -> String {
        let msg = match self {
            OutboundFrame::Media { payload } => OutboundMessage {
                event: "media",
                media: Some(MediaPayload {
                    payload: payload.clone(),
                }),
            },
            OutboundFrame::Clear => OutboundMessage {
                event: "clear",
                media: None,
            },
        };
        // Serialization of these shapes cannot fail
        serde_json::to_string(&msg).unwrap_or_default()
    }
}
