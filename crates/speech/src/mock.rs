//! Deterministic speech services mock for tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::{SpeechError, SpeechServices};

/// Samples synthesized per character of reply text
const SAMPLES_PER_CHAR: usize = 64;

/// Scripted speech services: transcripts are popped from a queue, synthesis
/// produces a short tone proportional to the text length and records what
/// was spoken.
#[derive(Default)]
pub struct MockSpeech {
    transcripts: Mutex<VecDeque<String>>,
    spoken: Mutex<Vec<String>>,
    fail_synthesis: AtomicBool,
}

impl MockSpeech {
    /// Create an empty mock; transcriptions return `""` until scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the transcript returned by the next `transcribe` call
    pub fn push_transcript(&self, text: impl Into<String>) {
        self.transcripts.lock().push_back(text.into());
    }

    /// Make subsequent `synthesize` calls fail
    pub fn set_fail_synthesis(&self, fail: bool) {
        self.fail_synthesis.store(fail, Ordering::Relaxed);
    }

    /// Texts synthesized so far, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

#[async_trait::async_trait]
impl SpeechServices for MockSpeech {
    async fn transcribe(
        &self,
        _samples: &[i16],
        _sample_rate: u32,
        _language: &str,
    ) -> Result<String, SpeechError> {
        Ok(self.transcripts.lock().pop_front().unwrap_or_default())
    }

    async fn synthesize(
        &self,
        text: &str,
        _language: &str,
        _sample_rate: u32,
    ) -> Result<Vec<i16>, SpeechError> {
        if self.fail_synthesis.load(Ordering::Relaxed) {
            return Err(SpeechError::Synthesis("scripted failure".to_string()));
        }

        self.spoken.lock().push(text.to_string());

        let len = text.len().max(1) * SAMPLES_PER_CHAR;
        // Alternating tone, loud enough to register as speech if looped back
        Ok((0..len)
            .map(|i| if i % 2 == 0 { 3000 } else { -3000 })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transcripts() {
        let mock = MockSpeech::new();
        mock.push_transcript("yes please");

        assert_eq!(mock.transcribe(&[], 8000, "en-IN").await.unwrap(), "yes please");
        // Queue exhausted: silence
        assert_eq!(mock.transcribe(&[], 8000, "en-IN").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_synthesis_records_and_scales() {
        let mock = MockSpeech::new();
        let audio = mock.synthesize("hello", "en-IN", 8000).await.unwrap();
        assert_eq!(audio.len(), 5 * SAMPLES_PER_CHAR);
        assert_eq!(mock.spoken(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_synthesis_failure() {
        let mock = MockSpeech::new();
        mock.set_fail_synthesis(true);
        assert!(mock.synthesize("hello", "en-IN", 8000).await.is_err());
        assert!(mock.spoken().is_empty());
    }
}
