//! Utterance assembly
//!
//! Collects speech frames between VAD boundaries into a sealed utterance.
//! Frames seen before the start boundary is declared are kept in a pending
//! buffer so the utterance includes the speech that triggered the decision.
//! Sealed utterances below the minimum byte bound are discarded as noise;
//! an utterance hitting the maximum bound is force-sealed to keep the STT
//! payload and latency bounded, and assembly continues into a fresh one.

use voicebot_core::{AudioFrame, Utterance};

use crate::vad::{VadEvent, VadFrame};

/// Assembly bounds
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Sealed utterances below this many PCM16 bytes are dropped as noise
    pub min_utterance_bytes: usize,
    /// Force-seal once the buffer reaches this many PCM16 bytes
    pub max_utterance_bytes: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            min_utterance_bytes: 3200,
            max_utterance_bytes: 160_000,
        }
    }
}

/// Accumulates frames into utterances between VAD boundaries
pub struct UtteranceAssembler {
    config: AssemblerConfig,
    sample_rate: u32,
    /// Consecutive speech frames seen before a start boundary
    pending: Vec<i16>,
    pending_frames: usize,
    /// Open utterance, if a start boundary has been declared
    current: Option<Vec<i16>>,
    frames: usize,
}

impl UtteranceAssembler {
    /// Create an assembler for audio at `sample_rate`
    pub fn new(config: AssemblerConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
            pending: Vec::new(),
            pending_frames: 0,
            current: None,
            frames: 0,
        }
    }

    /// Whether an utterance is currently being assembled
    pub fn in_progress(&self) -> bool {
        self.current.is_some()
    }

    /// Feed one frame with its VAD result; returns an utterance when sealed
    pub fn push(&mut self, frame: &AudioFrame, vad: VadFrame) -> Option<Utterance> {
        if self.current.is_none() {
            if vad.is_speech {
                self.pending.extend_from_slice(&frame.samples);
                self.pending_frames += 1;
            } else {
                self.pending.clear();
                self.pending_frames = 0;
            }

            if vad.event == Some(VadEvent::SpeechStart) {
                self.current = Some(std::mem::take(&mut self.pending));
                self.frames = self.pending_frames;
                self.pending_frames = 0;
            }
            return None;
        }

        if let Some(buffer) = self.current.as_mut() {
            buffer.extend_from_slice(&frame.samples);
            self.frames += 1;

            if vad.event == Some(VadEvent::SpeechEnd) {
                return self.seal(false);
            }
            if buffer.len() * 2 >= self.config.max_utterance_bytes {
                return self.seal(true);
            }
        }
        None
    }

    /// Discard anything in progress
    pub fn reset(&mut self) {
        self.pending.clear();
        self.pending_frames = 0;
        self.current = None;
        self.frames = 0;
    }

    fn seal(&mut self, forced: bool) -> Option<Utterance> {
        let samples = self.current.take()?;
        let frames = std::mem::replace(&mut self.frames, 0);

        if forced {
            // The caller is still mid-sentence; keep collecting into a fresh
            // utterance so nothing is lost
            self.current = Some(Vec::new());
            tracing::debug!(bytes = samples.len() * 2, "Utterance force-sealed at maximum size");
        }

        if samples.len() * 2 < self.config.min_utterance_bytes {
            tracing::debug!(bytes = samples.len() * 2, "Utterance below minimum, dropped as noise");
            return None;
        }

        Some(Utterance::new(samples, self.sample_rate, frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::{EnergyVad, VadConfig, VadEngine};

    fn frame(amplitude: i16) -> AudioFrame {
        AudioFrame::new(vec![amplitude; 160], 8000)
    }

    fn vad_frame(is_speech: bool, event: Option<VadEvent>) -> VadFrame {
        VadFrame { is_speech, event }
    }

    fn assembler(min_bytes: usize, max_bytes: usize) -> UtteranceAssembler {
        UtteranceAssembler::new(
            AssemblerConfig {
                min_utterance_bytes: min_bytes,
                max_utterance_bytes: max_bytes,
            },
            8000,
        )
    }

    #[test]
    fn test_pending_frames_included_at_start() {
        let mut asm = assembler(0, 1_000_000);

        // Two speech frames before the boundary fires on the third
        assert!(asm.push(&frame(3000), vad_frame(true, None)).is_none());
        assert!(asm.push(&frame(3000), vad_frame(true, None)).is_none());
        assert!(asm
            .push(&frame(3000), vad_frame(true, Some(VadEvent::SpeechStart)))
            .is_none());
        assert!(asm.in_progress());

        let utterance = asm
            .push(&frame(0), vad_frame(false, Some(VadEvent::SpeechEnd)))
            .unwrap();
        // 3 speech frames + 1 closing frame
        assert_eq!(utterance.samples().len(), 4 * 160);
        assert_eq!(utterance.frame_count(), 4);
    }

    #[test]
    fn test_noise_before_start_discarded() {
        let mut asm = assembler(0, 1_000_000);

        asm.push(&frame(3000), vad_frame(true, None));
        // Silence resets the pending run
        asm.push(&frame(0), vad_frame(false, None));
        asm.push(&frame(3000), vad_frame(true, None));
        asm.push(&frame(3000), vad_frame(true, None));
        asm.push(&frame(3000), vad_frame(true, Some(VadEvent::SpeechStart)));

        let utterance = asm
            .push(&frame(0), vad_frame(false, Some(VadEvent::SpeechEnd)))
            .unwrap();
        // Only the 3 contiguous frames plus the closer survive
        assert_eq!(utterance.frame_count(), 4);
    }

    #[test]
    fn test_short_utterance_rejected() {
        // Minimum of 5 frames' worth of bytes
        let mut asm = assembler(5 * 160 * 2, 1_000_000);

        asm.push(&frame(3000), vad_frame(true, Some(VadEvent::SpeechStart)));
        let sealed = asm.push(&frame(0), vad_frame(false, Some(VadEvent::SpeechEnd)));
        assert!(sealed.is_none());
        assert!(!asm.in_progress());
    }

    #[test]
    fn test_force_seal_at_max_and_continue() {
        // Max at 4 frames' worth of bytes
        let mut asm = assembler(0, 4 * 160 * 2);

        asm.push(&frame(3000), vad_frame(true, Some(VadEvent::SpeechStart)));
        assert!(asm.push(&frame(3000), vad_frame(true, None)).is_none());
        assert!(asm.push(&frame(3000), vad_frame(true, None)).is_none());
        let sealed = asm.push(&frame(3000), vad_frame(true, None));
        let utterance = sealed.expect("force-seal at maximum");
        assert_eq!(utterance.frame_count(), 4);

        // Assembly continues into a fresh utterance
        assert!(asm.in_progress());
        asm.push(&frame(3000), vad_frame(true, None));
        let next = asm
            .push(&frame(0), vad_frame(false, Some(VadEvent::SpeechEnd)))
            .unwrap();
        assert_eq!(next.frame_count(), 2);
    }

    #[test]
    fn test_end_to_end_with_vad() {
        let mut vad = EnergyVad::new(VadConfig {
            energy_threshold: 500.0,
            min_speech_frames: 2,
            silence_frames: 3,
        });
        let mut asm = assembler(0, 1_000_000);

        let mut sealed = Vec::new();
        let pattern: Vec<i16> = vec![0, 0, 3000, 3000, 3000, 3000, 0, 0, 0, 0];
        for amplitude in pattern {
            let f = frame(amplitude);
            let v = vad.process_frame(&f);
            if let Some(u) = asm.push(&f, v) {
                sealed.push(u);
            }
        }

        assert_eq!(sealed.len(), 1);
        // 4 speech frames + 3 silence frames up to the end boundary
        assert_eq!(sealed[0].frame_count(), 7);
    }
}
