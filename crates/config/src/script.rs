//! Dialog script
//!
//! The scripted content of a call: opening pitch, ordered guided steps, the
//! FAQ table, canned closing lines, and the phrase lists the intent
//! classifier matches against. Loaded once at startup and never mutated.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One FAQ entry: any keyword hit maps the caller's question to the answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Stable key identifying the topic (e.g. "interest")
    pub key: String,
    /// Keywords matched case-insensitively as substrings
    pub keywords: Vec<String>,
    /// Spoken answer
    pub answer: String,
}

/// Phrase lists for rule-based intent matching.
///
/// Matching is case-insensitive substring containment; first matching rule
/// wins. Overlap between lists is accepted by design (no tokenization or
/// stemming), so ordering in the classifier matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseSet {
    #[serde(default = "default_greeting")]
    pub greeting: Vec<String>,
    #[serde(default = "default_affirm")]
    pub affirm: Vec<String>,
    #[serde(default = "default_deny")]
    pub deny: Vec<String>,
    #[serde(default = "default_next")]
    pub next: Vec<String>,
    #[serde(default = "default_previous")]
    pub previous: Vec<String>,
    #[serde(default = "default_repeat")]
    pub repeat: Vec<String>,
    #[serde(default = "default_done")]
    pub done: Vec<String>,
    #[serde(default = "default_human")]
    pub human: Vec<String>,
}

fn default_greeting() -> Vec<String> {
    to_vec(&["hello", "namaste", "good morning", "good evening"])
}
fn default_affirm() -> Vec<String> {
    to_vec(&[
        "yes",
        "interested",
        "sure",
        "okay",
        "ok",
        "yep",
        "yeah",
        "haan",
    ])
}
fn default_deny() -> Vec<String> {
    to_vec(&["no", "not now", "nahi", "cancel", "stop", "exit"])
}
fn default_next() -> Vec<String> {
    to_vec(&["next", "continue", "proceed", "go ahead"])
}
fn default_previous() -> Vec<String> {
    to_vec(&["previous", "go back", "last step"])
}
fn default_repeat() -> Vec<String> {
    to_vec(&["repeat", "again", "once more", "say that"])
}
fn default_done() -> Vec<String> {
    to_vec(&["done", "finished", "completed", "that is all"])
}
fn default_human() -> Vec<String> {
    to_vec(&[
        "agent",
        "human",
        "representative",
        "customer care",
        "executive",
        "real person",
        "talk to someone",
    ])
}

fn to_vec(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| p.to_string()).collect()
}

impl Default for PhraseSet {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            affirm: default_affirm(),
            deny: default_deny(),
            next: default_next(),
            previous: default_previous(),
            repeat: default_repeat(),
            done: default_done(),
            human: default_human(),
        }
    }
}

/// Immutable, process-wide dialog content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogScript {
    /// Opening sales pitch, spoken on call start
    #[serde(default = "default_pitch")]
    pub pitch: String,

    /// Ordered guided steps
    #[serde(default = "default_steps")]
    pub steps: Vec<String>,

    /// FAQ table
    #[serde(default = "default_faqs")]
    pub faqs: Vec<FaqEntry>,

    /// Prefix spoken before re-prompting after a misunderstood turn
    #[serde(default = "default_reprompt")]
    pub reprompt: String,

    /// Spoken when the caller declines the pitch
    #[serde(default = "default_farewell")]
    pub farewell: String,

    /// Spoken when the caller aborts the guided steps
    #[serde(default = "default_stop_line")]
    pub stop_line: String,

    /// Spoken when the guided steps complete
    #[serde(default = "default_closing")]
    pub closing: String,

    /// Spoken when the caller asks for a human
    #[serde(default = "default_handoff")]
    pub handoff: String,

    /// Spoken when repeated confusion escalates to a handoff
    #[serde(default = "default_escalation")]
    pub escalation: String,

    /// Phrase lists for intent matching
    #[serde(default)]
    pub phrases: PhraseSet,
}

fn default_pitch() -> String {
    "Hello, this is the Rupeek personal loan assistant. We have a pre approved \
     personal loan offer for you. Are you interested?"
        .to_string()
}

fn default_steps() -> Vec<String> {
    to_vec(&[
        "Open the Rupeek app.",
        "On the home screen, click the Cash banner.",
        "Check your pre-approved limit.",
        "Slide the slider to select the amount and tenure required.",
        "Tick the consent box to proceed.",
        "Add your bank account if not visible.",
        "Update your email id and address, then select proceed to mandate setup.",
        "Setup autopay for EMI deduction on 5th of each month.",
        "Once mandate setup is done, you will see the loan summary page.",
        "Review loan details and click Get Money Now.",
        "Enter the OTP sent to your mobile. Loan disbursal will be initiated \
         within 30 to 40 seconds.",
    ])
}

fn default_faqs() -> Vec<FaqEntry> {
    vec![
        FaqEntry {
            key: "interest".to_string(),
            keywords: to_vec(&["interest", "rate"]),
            answer: "The interest rate starts from ten percent per annum and is \
                     personalized for each customer."
                .to_string(),
        },
        FaqEntry {
            key: "limit".to_string(),
            keywords: to_vec(&["limit", "pre approved", "how much"]),
            answer: "Your pre approved limit is already sanctioned. Please check \
                     the Rupeek app for the exact amount."
                .to_string(),
        },
        FaqEntry {
            key: "emi".to_string(),
            keywords: to_vec(&["emi", "repay", "installment"]),
            answer: "Your EMI will be auto deducted from your linked bank account \
                     on the fifth of every month."
                .to_string(),
        },
    ]
}

fn default_reprompt() -> String {
    "Sorry, I did not catch that.".to_string()
}
fn default_farewell() -> String {
    "No worries! Have a nice day.".to_string()
}
fn default_stop_line() -> String {
    "Okay, stopping the guidance. You can try again later.".to_string()
}
fn default_closing() -> String {
    "Congratulations! You have completed the loan disbursal process. Thank you \
     for choosing Rupeek."
        .to_string()
}
fn default_handoff() -> String {
    "Let me connect you to one of our loan specialists. Please stay on the line.".to_string()
}
fn default_escalation() -> String {
    "I am having trouble understanding. Let me connect you to one of our loan \
     specialists."
        .to_string()
}

impl Default for DialogScript {
    fn default() -> Self {
        Self {
            pitch: default_pitch(),
            steps: default_steps(),
            faqs: default_faqs(),
            reprompt: default_reprompt(),
            farewell: default_farewell(),
            stop_line: default_stop_line(),
            closing: default_closing(),
            handoff: default_handoff(),
            escalation: default_escalation(),
            phrases: PhraseSet::default(),
        }
    }
}

impl DialogScript {
    /// Load a script from a JSON file.
    ///
    /// Missing fields fall back to the default content.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let script: DialogScript = serde_json::from_str(&raw)?;
        script.validate()?;
        Ok(script)
    }

    /// Load from a file if it exists, otherwise the default script
    pub fn load_or_default(path: impl AsRef<Path>) -> Arc<Self> {
        let path = path.as_ref();
        if path.exists() {
            match Self::from_file(path) {
                Ok(script) => {
                    tracing::info!(path = %path.display(), "Dialog script loaded");
                    return Arc::new(script);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load dialog script, using defaults");
                }
            }
        } else {
            tracing::info!(path = %path.display(), "Dialog script not found, using defaults");
        }
        Arc::new(Self::default())
    }

    /// Validate script content
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pitch.trim().is_empty() {
            return Err(ConfigError::Script("pitch must not be empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(ConfigError::Script(
                "at least one guided step is required".to_string(),
            ));
        }
        for (i, faq) in self.faqs.iter().enumerate() {
            if faq.keywords.is_empty() {
                return Err(ConfigError::Script(format!(
                    "faq entry {} ({}) has no keywords",
                    i, faq.key
                )));
            }
        }
        Ok(())
    }

    /// Step text by index
    pub fn step(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(|s| s.as_str())
    }

    /// Number of guided steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// FAQ answer by topic key
    pub fn faq_answer(&self, key: &str) -> Option<&str> {
        self.faqs
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.answer.as_str())
    }
}
