//! Playback streaming
//!
//! Splits a synthesized reply into wire-frame-sized chunks and emits them
//! paced to real time so the transport is never flooded and a caller can
//! interrupt mid-utterance. Cancellation is a single cooperative flag
//! checked at every chunk boundary, so it is observed within one chunk's
//! duration.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use voicebot_transport::{OutboundFrame, WireCodec};

use crate::PipelineError;

/// Playback tuning
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Outbound chunk duration in milliseconds
    pub chunk_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { chunk_ms: 100 }
    }
}

/// Shared playback state between the streaming loop and the frame path.
///
/// The cancel flag is the only cross-task signal in a session; everything
/// else is confined to the owning task.
#[derive(Debug, Default)]
pub struct PlaybackControl {
    speaking: AtomicBool,
    cancel: AtomicBool,
}

impl PlaybackControl {
    /// Request cancellation of the in-flight reply
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether a reply is currently streaming
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn begin(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.speaking.store(true, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// How a stream finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every chunk was emitted
    Completed { chunks: usize },
    /// Cancelled after the given number of chunks
    Cancelled { chunks: usize },
}

/// Chunks, encodes and paces synthesized audio onto the outbound channel
pub struct PlaybackStreamer {
    codec: WireCodec,
    chunk_samples: usize,
    chunk_duration: std::time::Duration,
}

impl PlaybackStreamer {
    /// Create a streamer for the given wire codec
    pub fn new(codec: WireCodec, config: &PlaybackConfig) -> Self {
        let chunk_samples =
            ((codec.sample_rate() as u64 * config.chunk_ms) / 1000).max(1) as usize;
        Self {
            codec,
            chunk_samples,
            chunk_duration: std::time::Duration::from_millis(config.chunk_ms),
        }
    }

    /// Samples per outbound chunk
    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    /// Stream a reply. Chunks are emitted in order, none re-sent, and the
    /// cancel flag is honored at each chunk boundary.
    pub async fn stream(
        &self,
        samples: &[i16],
        control: &PlaybackControl,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<PlaybackOutcome, PipelineError> {
        control.begin();

        let mut interval = tokio::time::interval(self.chunk_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut chunks = 0;
        for chunk in samples.chunks(self.chunk_samples) {
            interval.tick().await;

            if control.cancel_requested() {
                control.finish();
                tracing::debug!(chunks, "Playback cancelled");
                return Ok(PlaybackOutcome::Cancelled { chunks });
            }

            let payload = self.codec.encode_payload(chunk);
            if out.send(OutboundFrame::Media { payload }).await.is_err() {
                control.finish();
                return Err(PipelineError::ChannelClosed);
            }
            chunks += 1;
        }

        control.finish();
        Ok(PlaybackOutcome::Completed { chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streamer(chunk_ms: u64) -> PlaybackStreamer {
        PlaybackStreamer::new(
            WireCodec::Pcm16 { sample_rate: 8000 },
            &PlaybackConfig { chunk_ms },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_in_order_none_resent() {
        let streamer = streamer(20);
        let control = PlaybackControl::default();
        let (tx, mut rx) = mpsc::channel(64);

        // 5 chunks of 160 samples
        let samples: Vec<i16> = (0..800).map(|i| i as i16).collect();
        let outcome = streamer.stream(&samples, &control, &tx).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed { chunks: 5 });
        assert!(!control.is_speaking());

        let codec = WireCodec::Pcm16 { sample_rate: 8000 };
        let mut seen = 0i16;
        while let Ok(frame) = rx.try_recv() {
            let OutboundFrame::Media { payload } = frame else {
                panic!("unexpected frame");
            };
            for sample in codec.decode_payload(&payload).unwrap() {
                assert_eq!(sample, seen);
                seen += 1;
            }
        }
        assert_eq!(seen, 800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cancel_cleared_on_begin() {
        let streamer = streamer(20);
        let control = PlaybackControl::default();
        let (tx, mut rx) = mpsc::channel(64);

        // A cancel left over from the previous reply must not kill this one
        control.cancel();
        let samples = vec![0i16; 800];
        let outcome = streamer.stream(&samples, &control, &tx).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed { chunks: 5 });
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_bound() {
        use std::sync::Arc;

        let streamer = Arc::new(streamer(20));
        let control = Arc::new(PlaybackControl::default());
        let (tx, mut rx) = mpsc::channel(1024);

        let samples = vec![1000i16; 160 * 50]; // 50 chunks = 1s of audio
        let streaming = {
            let streamer = streamer.clone();
            let control = control.clone();
            tokio::spawn(async move { streamer.stream(&samples, &control, &tx).await })
        };

        // Let a few chunks go out, then cancel
        tokio::time::sleep(std::time::Duration::from_millis(90)).await;
        control.cancel();

        let outcome = streaming.await.unwrap().unwrap();
        let PlaybackOutcome::Cancelled { chunks } = outcome else {
            panic!("expected cancellation, got {:?}", outcome);
        };

        // No chunk beyond the one in flight at cancel time
        let mut emitted = 0;
        while rx.try_recv().is_ok() {
            emitted += 1;
        }
        assert_eq!(emitted, chunks);
        assert!(chunks <= 6, "cancellation observed too late: {} chunks", chunks);
        assert!(!control.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply() {
        let streamer = streamer(20);
        let control = PlaybackControl::default();
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = streamer.stream(&[], &control, &tx).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed { chunks: 0 });
        assert!(rx.try_recv().is_err());
    }
}
