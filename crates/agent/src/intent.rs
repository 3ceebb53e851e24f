//! Intent classification
//!
//! Rule matching over the script's phrase lists. Matching is
//! case-insensitive substring containment and the first matching rule wins,
//! so ordering matters: "yes" must beat a longer FAQ phrase appearing later
//! in the same sentence. Substring overlap across lists is accepted; there
//! is no tokenization or stemming.

use std::sync::Arc;

use voicebot_config::DialogScript;

/// Closed set of dialog intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Affirm,
    Deny,
    Next,
    Previous,
    Repeat,
    Done,
    HumanRequest,
    /// FAQ hit, carrying the topic key
    Faq(String),
    Unknown,
    Empty,
}

/// Rule-based intent classifier over a dialog script's phrase lists
pub struct IntentClassifier {
    script: Arc<DialogScript>,
}

impl IntentClassifier {
    /// Create a classifier for the given script
    pub fn new(script: Arc<DialogScript>) -> Self {
        Self { script }
    }

    /// Classify a transcript.
    ///
    /// Priority: greeting, affirm, deny, next, previous, repeat, done,
    /// human request, FAQ keywords, else `Unknown`. Empty or whitespace-only
    /// text maps to `Empty`.
    pub fn classify(&self, text: &str) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            return Intent::Empty;
        }
        let lower = text.to_lowercase();
        let phrases = &self.script.phrases;

        if matches_any(&lower, &phrases.greeting) {
            return Intent::Greeting;
        }
        if matches_any(&lower, &phrases.affirm) {
            return Intent::Affirm;
        }
        if matches_any(&lower, &phrases.deny) {
            return Intent::Deny;
        }
        if matches_any(&lower, &phrases.next) {
            return Intent::Next;
        }
        if matches_any(&lower, &phrases.previous) {
            return Intent::Previous;
        }
        if matches_any(&lower, &phrases.repeat) {
            return Intent::Repeat;
        }
        if matches_any(&lower, &phrases.done) {
            return Intent::Done;
        }
        if matches_any(&lower, &phrases.human) {
            return Intent::HumanRequest;
        }

        for faq in &self.script.faqs {
            if matches_any(&lower, &faq.keywords) {
                return Intent::Faq(faq.key.clone());
            }
        }

        Intent::Unknown
    }
}

fn matches_any(text: &str, phrases: &[String]) -> bool {
    phrases
        .iter()
        .any(|p| !p.is_empty() && text.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(Arc::new(DialogScript::default()))
    }

    #[test]
    fn test_empty_text() {
        let c = classifier();
        assert_eq!(c.classify(""), Intent::Empty);
        assert_eq!(c.classify("   "), Intent::Empty);
    }

    #[test]
    fn test_affirm() {
        let c = classifier();
        assert_eq!(c.classify("yes please"), Intent::Affirm);
        assert_eq!(c.classify("Yeah I am interested"), Intent::Affirm);
        assert_eq!(c.classify("HAAN"), Intent::Affirm);
    }

    #[test]
    fn test_deny() {
        let c = classifier();
        assert_eq!(c.classify("no thanks"), Intent::Deny);
        assert_eq!(c.classify("please stop"), Intent::Deny);
    }

    #[test]
    fn test_navigation() {
        let c = classifier();
        assert_eq!(c.classify("next"), Intent::Next);
        assert_eq!(c.classify("go back"), Intent::Previous);
        assert_eq!(c.classify("can you repeat"), Intent::Repeat);
        assert_eq!(c.classify("I am done"), Intent::Done);
    }

    #[test]
    fn test_human_request() {
        let c = classifier();
        assert_eq!(c.classify("I want to talk to an agent"), Intent::HumanRequest);
    }

    #[test]
    fn test_faq() {
        let c = classifier();
        assert_eq!(
            c.classify("what is the interest rate"),
            Intent::Faq("interest".to_string())
        );
        assert_eq!(
            c.classify("when is my emi deducted"),
            Intent::Faq("emi".to_string())
        );
    }

    #[test]
    fn test_priority_affirm_over_faq() {
        // "yes" must win even when an FAQ keyword appears later in the text
        let c = classifier();
        assert_eq!(
            c.classify("yes but what about the interest rate"),
            Intent::Affirm
        );
    }

    #[test]
    fn test_unknown() {
        let c = classifier();
        assert_eq!(c.classify("purple monkey dishwasher"), Intent::Unknown);
    }
}
