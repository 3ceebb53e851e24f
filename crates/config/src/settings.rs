//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Wire and playback audio configuration
    #[serde(default)]
    pub audio: AudioSettings,

    /// Voice activity detection tuning
    #[serde(default)]
    pub vad: VadSettings,

    /// Utterance assembly bounds
    #[serde(default)]
    pub utterance: UtteranceSettings,

    /// Dialog flow tuning
    #[serde(default)]
    pub dialog: DialogSettings,

    /// Speech services (STT/TTS) configuration
    #[serde(default)]
    pub speech: SpeechSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Path to the dialog script JSON file
    #[serde(default = "default_script_path")]
    pub script_path: String,
}

fn default_script_path() -> String {
    "config/script.json".to_string()
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.audio.wire_codec.as_str() {
            "mulaw" | "pcm16" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "audio.wire_codec".to_string(),
                    message: format!("unknown codec '{}', use 'mulaw' or 'pcm16'", other),
                });
            }
        }

        if self.audio.wire_codec == "mulaw" && self.audio.wire_sample_rate != 8000 {
            return Err(ConfigError::InvalidValue {
                field: "audio.wire_sample_rate".to_string(),
                message: "mu-law transport is 8000 Hz".to_string(),
            });
        }

        if !(10..=200).contains(&self.audio.frame_ms) {
            return Err(ConfigError::InvalidValue {
                field: "audio.frame_ms".to_string(),
                message: "analysis frame must be between 10 and 200 ms".to_string(),
            });
        }

        if self.vad.min_speech_frames == 0 || self.vad.silence_frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vad".to_string(),
                message: "min_speech_frames and silence_frames must be at least 1".to_string(),
            });
        }

        if self.utterance.min_bytes >= self.utterance.max_bytes {
            return Err(ConfigError::InvalidValue {
                field: "utterance".to_string(),
                message: "min_bytes must be below max_bytes".to_string(),
            });
        }

        if self.dialog.max_failures == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dialog.max_failures".to_string(),
                message: "max_failures must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket path the telephony provider connects to
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Maximum concurrent calls
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle call expiry in seconds
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_ws_path() -> String {
    "/ws".to_string()
}
fn default_max_sessions() -> usize {
    100
}
fn default_session_timeout() -> u64 {
    900
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            max_sessions: default_max_sessions(),
            session_timeout_seconds: default_session_timeout(),
        }
    }
}

/// Wire and playback audio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Wire encoding: "mulaw" (8 kHz G.711) or "pcm16" (little-endian)
    #[serde(default = "default_wire_codec")]
    pub wire_codec: String,

    /// Wire sample rate in Hz
    #[serde(default = "default_wire_sample_rate")]
    pub wire_sample_rate: u32,

    /// TTS synthesis sample rate in Hz; resampled to the wire rate when they differ
    #[serde(default = "default_tts_sample_rate")]
    pub tts_sample_rate: u32,

    /// VAD analysis frame duration in milliseconds
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,

    /// Outbound playback chunk duration in milliseconds
    #[serde(default = "default_chunk_ms")]
    pub chunk_ms: u64,
}

fn default_wire_codec() -> String {
    "mulaw".to_string()
}
fn default_wire_sample_rate() -> u32 {
    8000
}
fn default_tts_sample_rate() -> u32 {
    16000
}
fn default_frame_ms() -> u64 {
    20
}
fn default_chunk_ms() -> u64 {
    100
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            wire_codec: default_wire_codec(),
            wire_sample_rate: default_wire_sample_rate(),
            tts_sample_rate: default_tts_sample_rate(),
            frame_ms: default_frame_ms(),
            chunk_ms: default_chunk_ms(),
        }
    }
}

/// Voice activity detection tuning.
///
/// The original iterations never settled on stable values for these, so they
/// are configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    /// Mean absolute amplitude above which a frame counts as speech
    #[serde(default = "default_energy_threshold")]
    pub energy_threshold: f32,

    /// Consecutive speech frames before an utterance start is declared
    #[serde(default = "default_min_speech_frames")]
    pub min_speech_frames: u32,

    /// Consecutive silence frames before an utterance end is declared
    #[serde(default = "default_silence_frames")]
    pub silence_frames: u32,
}

fn default_energy_threshold() -> f32 {
    500.0
}
fn default_min_speech_frames() -> u32 {
    3
}
fn default_silence_frames() -> u32 {
    15
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            energy_threshold: default_energy_threshold(),
            min_speech_frames: default_min_speech_frames(),
            silence_frames: default_silence_frames(),
        }
    }
}

/// Utterance assembly bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtteranceSettings {
    /// Sealed utterances below this many PCM16 bytes are dropped as noise
    #[serde(default = "default_min_utterance_bytes")]
    pub min_bytes: usize,

    /// Utterances are force-sealed at this many PCM16 bytes to bound STT latency
    #[serde(default = "default_max_utterance_bytes")]
    pub max_bytes: usize,
}

fn default_min_utterance_bytes() -> usize {
    3200
}
fn default_max_utterance_bytes() -> usize {
    160_000
}

impl Default for UtteranceSettings {
    fn default() -> Self {
        Self {
            min_bytes: default_min_utterance_bytes(),
            max_bytes: default_max_utterance_bytes(),
        }
    }
}

/// Dialog flow tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogSettings {
    /// Misunderstood turns before escalating to a human handoff
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Minimum gap between counted failures, in milliseconds
    #[serde(default = "default_failure_cooldown_ms")]
    pub failure_cooldown_ms: u64,
}

fn default_max_failures() -> u32 {
    3
}
fn default_failure_cooldown_ms() -> u64 {
    2000
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            failure_cooldown_ms: default_failure_cooldown_ms(),
        }
    }
}

/// Speech services configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Sarvam API base URL
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,

    /// API subscription key (set via VOICEBOT__SPEECH__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// BCP-47 language tag sent to both STT and TTS
    #[serde(default = "default_language")]
    pub language: String,

    /// TTS voice
    #[serde(default = "default_tts_speaker")]
    pub tts_speaker: String,

    /// TTS model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// STT model
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// Request timeout in seconds for both operations
    #[serde(default = "default_speech_timeout")]
    pub timeout_seconds: u64,
}

fn default_speech_base_url() -> String {
    "https://api.sarvam.ai".to_string()
}
fn default_language() -> String {
    "en-IN".to_string()
}
fn default_tts_speaker() -> String {
    "anushka".to_string()
}
fn default_tts_model() -> String {
    "bulbul:v2".to_string()
}
fn default_stt_model() -> String {
    "saarika:v2.5".to_string()
}
fn default_speech_timeout() -> u64 {
    8
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: default_speech_base_url(),
            api_key: String::new(),
            language: default_language(),
            tts_speaker: default_tts_speaker(),
            tts_model: default_tts_model(),
            stt_model: default_stt_model(),
            timeout_seconds: default_speech_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICEBOT__ prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICEBOT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.audio.wire_codec, "mulaw");
        assert_eq!(settings.audio.wire_sample_rate, 8000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_mulaw_rate_validation() {
        let mut settings = Settings::default();
        settings.audio.wire_sample_rate = 16000;
        assert!(settings.validate().is_err());

        settings.audio.wire_codec = "pcm16".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_codec_rejected() {
        let mut settings = Settings::default();
        settings.audio.wire_codec = "opus".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_utterance_bounds_validation() {
        let mut settings = Settings::default();
        settings.utterance.min_bytes = settings.utterance.max_bytes;
        assert!(settings.validate().is_err());
    }
}
