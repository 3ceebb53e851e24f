//! Turn controller / session orchestrator
//!
//! One call maps to one pair of tasks. The frame path (this module's event
//! loop) owns the codec, frame buffer, VAD and assembler and never blocks on
//! the network, so inbound frames keep flowing while a reply is being
//! computed or played. A per-session reply worker owns the dialog state
//! machine and the speech facade and consumes sealed utterances strictly in
//! arrival order. The playback cancel flag is the only signal crossing the
//! two tasks.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use voicebot_agent::{DialogFlow, FlowConfig, IntentClassifier};
use voicebot_config::DialogScript;
use voicebot_core::Utterance;
use voicebot_speech::SpeechServices;
use voicebot_transport::{InboundEvent, OutboundFrame, Resampler, WireCodec};

use crate::frame::FrameBuffer;
use crate::playback::{PlaybackConfig, PlaybackControl, PlaybackOutcome, PlaybackStreamer};
use crate::utterance::{AssemblerConfig, UtteranceAssembler};
use crate::vad::{EnergyVad, VadConfig, VadEngine, VadEvent};

/// Per-session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wire audio encoding
    pub wire_codec: WireCodec,
    /// VAD analysis frame duration in milliseconds
    pub frame_ms: u64,
    /// VAD tuning
    pub vad: VadConfig,
    /// Utterance assembly bounds
    pub assembler: AssemblerConfig,
    /// Playback pacing
    pub playback: PlaybackConfig,
    /// Dialog flow tuning
    pub flow: FlowConfig,
    /// Language tag for STT and TTS
    pub language: String,
    /// TTS synthesis rate; resampled to the wire rate when they differ
    pub tts_sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wire_codec: WireCodec::Mulaw8k,
            frame_ms: 20,
            vad: VadConfig::default(),
            assembler: AssemblerConfig::default(),
            playback: PlaybackConfig::default(),
            flow: FlowConfig::default(),
            language: "en-IN".to_string(),
            tts_sample_rate: 16000,
        }
    }
}

enum Job {
    /// Speak the opening pitch
    Opening,
    /// Process one sealed caller utterance
    Utterance(Utterance),
}

/// One active call: owns every piece of per-call mutable state
pub struct CallSession {
    id: String,
    config: SessionConfig,
    script: Arc<DialogScript>,
    speech: Arc<dyn SpeechServices>,
    outbound: mpsc::Sender<OutboundFrame>,
    vad: Box<dyn VadEngine>,
}

impl CallSession {
    /// Create a session with the default energy VAD
    pub fn new(
        id: impl Into<String>,
        config: SessionConfig,
        script: Arc<DialogScript>,
        speech: Arc<dyn SpeechServices>,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        let vad = Box::new(EnergyVad::new(config.vad.clone()));
        Self {
            id: id.into(),
            config,
            script,
            speech,
            outbound,
            vad,
        }
    }

    /// Substitute a different VAD strategy
    pub fn with_vad_engine(mut self, vad: Box<dyn VadEngine>) -> Self {
        self.vad = vad;
        self
    }

    /// Run the session event loop until the transport closes, `stop`
    /// arrives, or the dialog reaches a terminal phase.
    pub async fn run(mut self, mut events: mpsc::Receiver<InboundEvent>) {
        let wire_rate = self.config.wire_codec.sample_rate();
        let mut frames = FrameBuffer::new(wire_rate, self.config.frame_ms);
        let mut assembler = UtteranceAssembler::new(self.config.assembler.clone(), wire_rate);
        let control = Arc::new(PlaybackControl::default());

        let (job_tx, job_rx) = mpsc::channel::<Job>(8);
        let (done_tx, mut done_rx) = watch::channel(false);

        let worker = ReplyWorker {
            session: self.id.clone(),
            flow: DialogFlow::new(self.script.clone(), self.config.flow.clone()),
            classifier: IntentClassifier::new(self.script.clone()),
            speech: self.speech.clone(),
            streamer: PlaybackStreamer::new(self.config.wire_codec, &self.config.playback),
            control: control.clone(),
            outbound: self.outbound.clone(),
            resampler: (self.config.tts_sample_rate != wire_rate)
                .then(|| Resampler::new(self.config.tts_sample_rate, wire_rate)),
            language: self.config.language.clone(),
            tts_sample_rate: self.config.tts_sample_rate,
        };
        let worker_handle = tokio::spawn(worker.run(job_rx, done_tx));

        tracing::info!(session = %self.id, "Session started");

        let mut started = false;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    None => {
                        tracing::info!(session = %self.id, "Transport disconnected");
                        break;
                    }
                    Some(InboundEvent::Connected) => {
                        tracing::debug!(session = %self.id, "Transport connected");
                    }
                    Some(InboundEvent::Start) if started => {
                        tracing::warn!(session = %self.id, "Duplicate start event ignored");
                    }
                    Some(InboundEvent::Start) => {
                        started = true;
                        tracing::info!(session = %self.id, "Call started, queueing pitch");
                        if job_tx.send(Job::Opening).await.is_err() {
                            break;
                        }
                    }
                    Some(InboundEvent::Media { payload }) => {
                        if self
                            .on_media(&payload, &mut frames, &mut assembler, &control, &job_tx)
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(InboundEvent::Stop) => {
                        tracing::info!(session = %self.id, "Call stopped by transport");
                        break;
                    }
                },
                _ = done_rx.changed() => {
                    if *done_rx.borrow() {
                        tracing::info!(session = %self.id, "Dialog complete");
                        break;
                    }
                }
            }
        }

        // Best-effort teardown: cancel any in-flight reply and drop the
        // worker; leaked speech calls resolve unobserved
        control.cancel();
        worker_handle.abort();
        tracing::info!(session = %self.id, "Session closed");
    }

    /// Decode one media frame and feed the analysis path. Codec failures
    /// drop the frame; a closed channel ends the session.
    async fn on_media(
        &mut self,
        payload: &str,
        frames: &mut FrameBuffer,
        assembler: &mut UtteranceAssembler,
        control: &PlaybackControl,
        job_tx: &mpsc::Sender<Job>,
    ) -> Result<(), ()> {
        let samples = match self.config.wire_codec.decode_payload(payload) {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Dropping malformed media frame");
                return Ok(());
            }
        };

        for frame in frames.push(&samples) {
            let result = self.vad.process_frame(&frame);

            // The VAD keeps running while the bot speaks; a confirmed speech
            // start during playback is a barge-in. The interrupting frames
            // are already in the assembler, so the caller's new utterance
            // starts from them.
            if control.is_speaking() && result.event == Some(VadEvent::SpeechStart) {
                tracing::info!(session = %self.id, "Barge-in, cancelling reply");
                control.cancel();
                if self.outbound.send(OutboundFrame::Clear).await.is_err() {
                    return Err(());
                }
            }

            if let Some(utterance) = assembler.push(&frame, result) {
                tracing::debug!(
                    session = %self.id,
                    duration_ms = utterance.duration_ms(),
                    frames = utterance.frame_count(),
                    "Utterance sealed"
                );
                if job_tx.send(Job::Utterance(utterance)).await.is_err() {
                    return Err(());
                }
            }
        }

        Ok(())
    }
}

/// Consumes sealed utterances in order: transcribe, classify, transition,
/// synthesize, stream.
struct ReplyWorker {
    session: String,
    flow: DialogFlow,
    classifier: IntentClassifier,
    speech: Arc<dyn SpeechServices>,
    streamer: PlaybackStreamer,
    control: Arc<PlaybackControl>,
    outbound: mpsc::Sender<OutboundFrame>,
    resampler: Option<Resampler>,
    language: String,
    tts_sample_rate: u32,
}

impl ReplyWorker {
    async fn run(mut self, mut jobs: mpsc::Receiver<Job>, done: watch::Sender<bool>) {
        while let Some(job) = jobs.recv().await {
            match job {
                Job::Opening => {
                    let text = self.flow.opening().to_string();
                    self.speak(&text).await;
                }
                Job::Utterance(utterance) => {
                    let transcript = match self
                        .speech
                        .transcribe(utterance.samples(), utterance.sample_rate(), &self.language)
                        .await
                    {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(
                                session = %self.session,
                                error = %e,
                                "Transcription failed, treating as silence"
                            );
                            String::new()
                        }
                    };

                    let intent = self.classifier.classify(&transcript);
                    tracing::info!(
                        session = %self.session,
                        transcript = %transcript,
                        intent = ?intent,
                        phase = ?self.flow.phase(),
                        "Caller turn"
                    );

                    let turn = self.flow.apply(&intent);
                    if let Some(reply) = turn.reply {
                        self.speak(&reply).await;
                    }
                    if turn.hangup {
                        let _ = done.send(true);
                        break;
                    }
                }
            }
        }
    }

    /// Synthesize and stream one reply. Synthesis failure skips the reply;
    /// the session stays alive either way.
    async fn speak(&mut self, text: &str) {
        let audio = match self
            .speech
            .synthesize(text, &self.language, self.tts_sample_rate)
            .await
        {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "Synthesis failed, skipping reply");
                return;
            }
        };

        let audio = match &self.resampler {
            Some(resampler) => resampler.resample(&audio),
            None => audio,
        };

        match self.streamer.stream(&audio, &self.control, &self.outbound).await {
            Ok(PlaybackOutcome::Completed { chunks }) => {
                tracing::debug!(session = %self.session, chunks, "Reply streamed");
            }
            Ok(PlaybackOutcome::Cancelled { chunks }) => {
                tracing::debug!(session = %self.session, chunks, "Reply cancelled by barge-in");
            }
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "Reply streaming failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicebot_speech::MockSpeech;

    #[tokio::test]
    async fn test_session_runs_and_closes_on_channel_drop() {
        let (out_tx, _out_rx) = mpsc::channel(16);
        let (evt_tx, evt_rx) = mpsc::channel(16);

        let session = CallSession::new(
            "test",
            SessionConfig::default(),
            Arc::new(DialogScript::default()),
            Arc::new(MockSpeech::new()),
            out_tx,
        );

        drop(evt_tx);
        // With the event channel closed the session must return promptly
        session.run(evt_rx).await;
    }
}
