//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use voicebot_config::{DialogScript, Settings};
use voicebot_pipeline::SessionConfig;
use voicebot_speech::SpeechServices;
use voicebot_transport::WireCodec;

use crate::session::SessionManager;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub script: Arc<DialogScript>,
    pub speech: Arc<dyn SpeechServices>,
    pub sessions: Arc<SessionManager>,
    pub session_config: SessionConfig,
}

impl AppState {
    /// Build state from loaded settings
    pub fn new(
        settings: Settings,
        script: Arc<DialogScript>,
        speech: Arc<dyn SpeechServices>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            settings.server.max_sessions,
            Duration::from_secs(settings.server.session_timeout_seconds),
        ));
        let session_config = session_config_from(&settings);

        Self {
            settings: Arc::new(settings),
            script,
            speech,
            sessions,
            session_config,
        }
    }
}

/// Map settings onto a per-call pipeline configuration
pub fn session_config_from(settings: &Settings) -> SessionConfig {
    let wire_codec = match settings.audio.wire_codec.as_str() {
        "pcm16" => WireCodec::Pcm16 {
            sample_rate: settings.audio.wire_sample_rate,
        },
        // validate() admits only "mulaw" beyond this point
        _ => WireCodec::Mulaw8k,
    };

    SessionConfig {
        wire_codec,
        frame_ms: settings.audio.frame_ms,
        vad: voicebot_pipeline::VadConfig {
            energy_threshold: settings.vad.energy_threshold,
            min_speech_frames: settings.vad.min_speech_frames,
            silence_frames: settings.vad.silence_frames,
        },
        assembler: voicebot_pipeline::AssemblerConfig {
            min_utterance_bytes: settings.utterance.min_bytes,
            max_utterance_bytes: settings.utterance.max_bytes,
        },
        playback: voicebot_pipeline::PlaybackConfig {
            chunk_ms: settings.audio.chunk_ms,
        },
        flow: flow_config_from(settings),
        language: settings.speech.language.clone(),
        tts_sample_rate: settings.audio.tts_sample_rate,
    }
}

fn flow_config_from(settings: &Settings) -> voicebot_agent::FlowConfig {
    voicebot_agent::FlowConfig {
        max_failures: settings.dialog.max_failures,
        failure_cooldown: Duration::from_millis(settings.dialog.failure_cooldown_ms),
    }
}
