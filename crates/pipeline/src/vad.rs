//! Voice activity detection
//!
//! Pure threshold-based energy VAD: a frame is speech when its mean absolute
//! amplitude exceeds a configurable threshold, with hysteresis counters
//! deciding utterance boundaries. Deliberately simple — it false-triggers on
//! loud background noise and misses soft speech. A smarter detector (e.g.
//! adaptive noise floor) can be substituted through [`VadEngine`] without
//! touching the turn controller.

use voicebot_core::AudioFrame;

/// Utterance boundary events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    /// Enough consecutive speech frames seen; an utterance has started
    SpeechStart,
    /// Enough consecutive silence frames seen after a start; the utterance ended
    SpeechEnd,
}

/// Per-frame VAD output
#[derive(Debug, Clone, Copy)]
pub struct VadFrame {
    /// This frame classified as speech
    pub is_speech: bool,
    /// Boundary crossed by this frame, if any
    pub event: Option<VadEvent>,
}

/// VAD tuning
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Mean absolute amplitude above which a frame counts as speech
    pub energy_threshold: f32,
    /// Consecutive speech frames before declaring an utterance start
    pub min_speech_frames: u32,
    /// Consecutive silence frames before declaring an utterance end.
    /// Larger than the start threshold so trailing words are not clipped.
    pub silence_frames: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 500.0,
            min_speech_frames: 3,
            silence_frames: 15,
        }
    }
}

/// Pluggable VAD strategy
pub trait VadEngine: Send {
    /// Classify one frame and report any boundary crossed
    fn process_frame(&mut self, frame: &AudioFrame) -> VadFrame;

    /// Reset to the quiet state
    fn reset(&mut self);

    /// Whether an utterance is currently open
    fn in_utterance(&self) -> bool;
}

/// Default energy-threshold VAD with hysteresis
pub struct EnergyVad {
    config: VadConfig,
    speech_run: u32,
    silence_run: u32,
    in_utterance: bool,
}

impl EnergyVad {
    /// Create a detector with the given tuning
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            speech_run: 0,
            silence_run: 0,
            in_utterance: false,
        }
    }
}

impl VadEngine for EnergyVad {
    fn process_frame(&mut self, frame: &AudioFrame) -> VadFrame {
        let is_speech = frame.mean_abs_amplitude() >= self.config.energy_threshold;

        if is_speech {
            self.speech_run += 1;
            self.silence_run = 0;
        } else {
            self.silence_run += 1;
            self.speech_run = 0;
        }

        let event = if !self.in_utterance
            && is_speech
            && self.speech_run >= self.config.min_speech_frames
        {
            self.in_utterance = true;
            Some(VadEvent::SpeechStart)
        } else if self.in_utterance
            && !is_speech
            && self.silence_run >= self.config.silence_frames
        {
            self.in_utterance = false;
            Some(VadEvent::SpeechEnd)
        } else {
            None
        };

        VadFrame { is_speech, event }
    }

    fn reset(&mut self) {
        self.speech_run = 0;
        self.silence_run = 0;
        self.in_utterance = false;
    }

    fn in_utterance(&self) -> bool {
        self.in_utterance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_frame() -> AudioFrame {
        AudioFrame::new(vec![3000i16; 160], 8000)
    }

    fn quiet_frame() -> AudioFrame {
        AudioFrame::new(vec![0i16; 160], 8000)
    }

    fn vad(min_speech: u32, silence: u32) -> EnergyVad {
        EnergyVad::new(VadConfig {
            energy_threshold: 500.0,
            min_speech_frames: min_speech,
            silence_frames: silence,
        })
    }

    #[test]
    fn test_start_requires_min_speech_frames() {
        let mut vad = vad(3, 5);

        assert!(vad.process_frame(&loud_frame()).event.is_none());
        assert!(vad.process_frame(&loud_frame()).event.is_none());
        assert_eq!(
            vad.process_frame(&loud_frame()).event,
            Some(VadEvent::SpeechStart)
        );
        assert!(vad.in_utterance());

        // No second start while the utterance is open
        assert!(vad.process_frame(&loud_frame()).event.is_none());
    }

    #[test]
    fn test_transient_noise_does_not_start() {
        let mut vad = vad(3, 5);

        // Two speech frames, then silence: the run resets
        vad.process_frame(&loud_frame());
        vad.process_frame(&loud_frame());
        vad.process_frame(&quiet_frame());
        vad.process_frame(&loud_frame());
        let result = vad.process_frame(&loud_frame());
        assert!(result.event.is_none());
        assert!(!vad.in_utterance());
    }

    #[test]
    fn test_end_requires_silence_frames() {
        let mut vad = vad(2, 4);
        vad.process_frame(&loud_frame());
        vad.process_frame(&loud_frame());
        assert!(vad.in_utterance());

        for _ in 0..3 {
            assert!(vad.process_frame(&quiet_frame()).event.is_none());
        }
        assert_eq!(
            vad.process_frame(&quiet_frame()).event,
            Some(VadEvent::SpeechEnd)
        );
        assert!(!vad.in_utterance());
    }

    #[test]
    fn test_speech_resets_silence_run() {
        let mut vad = vad(2, 4);
        vad.process_frame(&loud_frame());
        vad.process_frame(&loud_frame());

        // A pause shorter than the hysteresis keeps the utterance open
        vad.process_frame(&quiet_frame());
        vad.process_frame(&quiet_frame());
        vad.process_frame(&loud_frame());
        for _ in 0..3 {
            assert!(vad.process_frame(&quiet_frame()).event.is_none());
        }
        assert_eq!(
            vad.process_frame(&quiet_frame()).event,
            Some(VadEvent::SpeechEnd)
        );
    }

    #[test]
    fn test_silence_without_start_never_ends() {
        let mut vad = vad(2, 3);
        for _ in 0..20 {
            assert!(vad.process_frame(&quiet_frame()).event.is_none());
        }
    }

    #[test]
    fn test_reset() {
        let mut vad = vad(2, 3);
        vad.process_frame(&loud_frame());
        vad.process_frame(&loud_frame());
        assert!(vad.in_utterance());

        vad.reset();
        assert!(!vad.in_utterance());
        assert!(vad.process_frame(&loud_frame()).event.is_none());
    }
}
