//! Audio frame and utterance types

use serde::{Deserialize, Serialize};

/// A fixed-duration slice of PCM16 samples.
///
/// Frames are immutable once produced; ownership flows from the codec
/// adapter through the frame buffer into the VAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFrame {
    /// PCM16 samples, mono
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Create a new audio frame
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Frame duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    /// Mean absolute sample amplitude, the energy measure used by the VAD
    pub fn mean_abs_amplitude(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self
            .samples
            .iter()
            .map(|&s| (s as i32).unsigned_abs() as u64)
            .sum();
        sum as f32 / self.samples.len() as f32
    }

    /// Length in bytes when serialized as PCM16
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }

    /// Check if the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One continuous caller speech segment, sealed by the utterance assembler.
///
/// Immutable by construction: the assembler accumulates samples and only
/// builds an `Utterance` at seal time.
#[derive(Debug, Clone)]
pub struct Utterance {
    samples: Vec<i16>,
    sample_rate: u32,
    frames: usize,
}

impl Utterance {
    /// Seal an utterance from accumulated samples
    pub fn new(samples: Vec<i16>, sample_rate: u32, frames: usize) -> Self {
        Self {
            samples,
            sample_rate,
            frames,
        }
    }

    /// The accumulated PCM16 samples
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Consume the utterance, yielding its samples
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames that went into this utterance
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Accumulated byte length as PCM16
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }

    /// Utterance duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        let frame = AudioFrame::new(vec![0; 160], 8000);
        assert_eq!(frame.duration_ms(), 20);

        let frame = AudioFrame::new(vec![0; 320], 16000);
        assert_eq!(frame.duration_ms(), 20);
    }

    #[test]
    fn test_mean_abs_amplitude() {
        let frame = AudioFrame::new(vec![0; 160], 8000);
        assert_eq!(frame.mean_abs_amplitude(), 0.0);

        let frame = AudioFrame::new(vec![1000, -1000, 1000, -1000], 8000);
        assert_eq!(frame.mean_abs_amplitude(), 1000.0);

        // i16::MIN must not overflow the per-sample abs
        let frame = AudioFrame::new(vec![i16::MIN], 8000);
        assert_eq!(frame.mean_abs_amplitude(), 32768.0);
    }

    #[test]
    fn test_utterance_accounting() {
        let utterance = Utterance::new(vec![0; 1600], 8000, 10);
        assert_eq!(utterance.byte_len(), 3200);
        assert_eq!(utterance.duration_ms(), 200);
        assert_eq!(utterance.frame_count(), 10);
    }
}
