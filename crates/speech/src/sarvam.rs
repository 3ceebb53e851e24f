//! Sarvam AI speech services client
//!
//! STT: `POST /speech-to-text` with a multipart WAV upload, returns
//! `{"transcript": "..."}`. TTS: `POST /text-to-speech` with a JSON body,
//! returns `{"audios": ["<base64>"]}`. Both carry the subscription key in
//! the `api-subscription-key` header and a bounded request timeout.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

use crate::wav::{decode_audio, pcm_to_wav};
use crate::{SpeechError, SpeechServices};

/// Sarvam client configuration
#[derive(Debug, Clone)]
pub struct SarvamConfig {
    /// API base URL
    pub base_url: String,
    /// Subscription key
    pub api_key: String,
    /// STT model
    pub stt_model: String,
    /// TTS model
    pub tts_model: String,
    /// TTS voice
    pub tts_speaker: String,
    /// Request timeout for both operations
    pub timeout: Duration,
}

impl Default for SarvamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sarvam.ai".to_string(),
            api_key: String::new(),
            stt_model: "saarika:v2.5".to_string(),
            tts_model: "bulbul:v2".to_string(),
            tts_speaker: "anushka".to_string(),
            timeout: Duration::from_secs(8),
        }
    }
}

/// Sarvam AI speech services client
pub struct SarvamClient {
    http: reqwest::Client,
    config: SarvamConfig,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    transcript: String,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(default)]
    audios: Vec<String>,
}

impl SarvamClient {
    /// Create a new client
    pub fn new(config: SarvamConfig) -> Result<Self, SpeechError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl SpeechServices for SarvamClient {
    async fn transcribe(
        &self,
        samples: &[i16],
        sample_rate: u32,
        language: &str,
    ) -> Result<String, SpeechError> {
        let wav = pcm_to_wav(samples, sample_rate)?;
        tracing::debug!(bytes = wav.len(), "Transcribing utterance");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SpeechError::Payload(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.stt_model.clone())
            .text("language_code", language.to_string());

        let response = self
            .http
            .post(format!("{}/speech-to-text", self.config.base_url))
            .header("api-subscription-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status(status.as_u16()));
        }

        let body: TranscribeResponse = response.json().await?;
        tracing::debug!(transcript = %body.transcript, "Transcription complete");
        Ok(body.transcript)
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        sample_rate: u32,
    ) -> Result<Vec<i16>, SpeechError> {
        tracing::debug!(chars = text.len(), "Synthesizing reply");

        let payload = json!({
            "inputs": [text],
            "target_language_code": language,
            "speaker": self.config.tts_speaker,
            "model": self.config.tts_model,
            "speech_sample_rate": sample_rate,
            "pitch": 0,
            "pace": 1.0,
            "loudness": 1.0,
        });

        let response = self
            .http
            .post(format!("{}/text-to-speech", self.config.base_url))
            .header("api-subscription-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status(status.as_u16()));
        }

        let body: SynthesizeResponse = response.json().await?;
        let audio_b64 = body
            .audios
            .first()
            .ok_or_else(|| SpeechError::Payload("no audio in response".to_string()))?;
        let bytes = BASE64
            .decode(audio_b64)
            .map_err(|e| SpeechError::Payload(e.to_string()))?;

        let samples = decode_audio(&bytes)?;
        if samples.is_empty() {
            return Err(SpeechError::Synthesis("empty audio".to_string()));
        }

        tracing::debug!(samples = samples.len(), "Synthesis complete");
        Ok(samples)
    }
}
