//! Dialog state machine
//!
//! Owns the conversation phase, step index and failure counter, and decides
//! the next spoken reply for each classified intent. Transitions are pure
//! over (phase, intent, clock): given the same inputs the same reply and
//! phase come out, which is what the determinism tests pin down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use voicebot_config::DialogScript;

use crate::intent::Intent;

/// Conversation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogPhase {
    /// Opening sales pitch
    Pitch,
    /// Guided step at the given index
    Step(usize),
    /// Escalated to a human; terminal
    HumanHandoff,
    /// Call over; terminal
    Terminated,
}

impl DialogPhase {
    /// Terminal phases end the session once the closing reply has streamed
    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogPhase::HumanHandoff | DialogPhase::Terminated)
    }
}

/// Flow tuning
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Misunderstood turns before escalating to a human handoff
    pub max_failures: u32,
    /// Minimum gap between counted failures
    pub failure_cooldown: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_failures: 3,
            failure_cooldown: Duration::from_millis(2000),
        }
    }
}

/// Outcome of one state-machine transition
#[derive(Debug, Clone)]
pub struct Turn {
    /// Text to speak, if any
    pub reply: Option<String>,
    /// Phase after the transition
    pub phase: DialogPhase,
    /// Close the session once the reply has finished streaming
    pub hangup: bool,
}

/// The dialog state machine for one call
pub struct DialogFlow {
    script: Arc<DialogScript>,
    config: FlowConfig,
    phase: DialogPhase,
    failures: u32,
    last_failure_at: Option<Instant>,
}

impl DialogFlow {
    /// Create a flow positioned at the pitch
    pub fn new(script: Arc<DialogScript>, config: FlowConfig) -> Self {
        Self {
            script,
            config,
            phase: DialogPhase::Pitch,
            failures: 0,
            last_failure_at: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    /// Current failure count
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// The opening pitch, spoken on call start
    pub fn opening(&self) -> &str {
        &self.script.pitch
    }

    /// Apply an intent using the current time
    pub fn apply(&mut self, intent: &Intent) -> Turn {
        self.apply_at(intent, Instant::now())
    }

    /// Apply an intent at an explicit time (deterministic for tests)
    pub fn apply_at(&mut self, intent: &Intent, now: Instant) -> Turn {
        if self.phase.is_terminal() {
            return Turn {
                reply: None,
                phase: self.phase,
                hangup: true,
            };
        }

        match intent {
            Intent::HumanRequest => self.handoff(self.script.handoff.clone()),

            Intent::Faq(key) => match self.script.faq_answer(key) {
                Some(answer) => {
                    // Interstitial: answer, then re-speak the current prompt;
                    // the phase does not move
                    let reply = format!("{} {}", answer, self.current_prompt());
                    Turn {
                        reply: Some(reply),
                        phase: self.phase,
                        hangup: false,
                    }
                }
                None => self.register_failure(now),
            },

            Intent::Greeting => Turn {
                reply: Some(self.current_prompt()),
                phase: self.phase,
                hangup: false,
            },

            Intent::Empty | Intent::Unknown => self.register_failure(now),

            _ => match self.phase {
                DialogPhase::Pitch => self.apply_at_pitch(intent, now),
                DialogPhase::Step(index) => self.apply_at_step(index, intent, now),
                // Terminal phases returned above
                DialogPhase::HumanHandoff | DialogPhase::Terminated => Turn {
                    reply: None,
                    phase: self.phase,
                    hangup: true,
                },
            },
        }
    }

    fn apply_at_pitch(&mut self, intent: &Intent, now: Instant) -> Turn {
        match intent {
            Intent::Affirm => self.goto_step(0),
            Intent::Deny => self.terminate(self.script.farewell.clone()),
            // Navigation before the steps have started is unhandled
            _ => self.register_failure(now),
        }
    }

    fn apply_at_step(&mut self, index: usize, intent: &Intent, now: Instant) -> Turn {
        match intent {
            // "yes" to "shall we continue" advances like an explicit next
            Intent::Next | Intent::Affirm => {
                if index + 1 < self.script.step_count() {
                    self.goto_step(index + 1)
                } else {
                    self.terminate(self.script.closing.clone())
                }
            }
            Intent::Previous => self.goto_step(index.saturating_sub(1)),
            Intent::Repeat => self.goto_step(index),
            Intent::Done => self.terminate(self.script.closing.clone()),
            Intent::Deny => self.terminate(self.script.stop_line.clone()),
            _ => self.register_failure(now),
        }
    }

    /// The prompt belonging to the current phase, used after FAQ answers and
    /// re-prompts
    fn current_prompt(&self) -> String {
        match self.phase {
            DialogPhase::Pitch => self.script.pitch.clone(),
            DialogPhase::Step(index) => self
                .script
                .step(index)
                .unwrap_or(&self.script.closing)
                .to_string(),
            DialogPhase::HumanHandoff => self.script.handoff.clone(),
            DialogPhase::Terminated => self.script.farewell.clone(),
        }
    }

    fn goto_step(&mut self, index: usize) -> Turn {
        self.reset_failures();
        self.phase = DialogPhase::Step(index);
        Turn {
            reply: Some(self.current_prompt()),
            phase: self.phase,
            hangup: false,
        }
    }

    fn terminate(&mut self, reply: String) -> Turn {
        self.reset_failures();
        self.phase = DialogPhase::Terminated;
        Turn {
            reply: Some(reply),
            phase: self.phase,
            hangup: true,
        }
    }

    fn handoff(&mut self, reply: String) -> Turn {
        self.reset_failures();
        self.phase = DialogPhase::HumanHandoff;
        Turn {
            reply: Some(reply),
            phase: self.phase,
            hangup: true,
        }
    }

    /// Count a misunderstood turn and either re-prompt or escalate.
    ///
    /// A failure arriving within the cooldown of the last counted one is not
    /// counted again; the same misunderstood sentence often produces several
    /// utterances in quick succession.
    fn register_failure(&mut self, now: Instant) -> Turn {
        let counted = match self.last_failure_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.failure_cooldown,
        };

        if counted {
            self.failures += 1;
            self.last_failure_at = Some(now);
            tracing::debug!(failures = self.failures, phase = ?self.phase, "Misunderstood turn");
        }

        if self.failures >= self.config.max_failures {
            self.reset_failures();
            self.phase = DialogPhase::HumanHandoff;
            return Turn {
                reply: Some(self.script.escalation.clone()),
                phase: self.phase,
                hangup: true,
            };
        }

        Turn {
            reply: Some(format!("{} {}", self.script.reprompt, self.current_prompt())),
            phase: self.phase,
            hangup: false,
        }
    }

    fn reset_failures(&mut self) {
        self.failures = 0;
        self.last_failure_at = None;
    }
}
