//! Spam classification
//!
//! [`Classifier`] runs the rule filter first and only calls the external
//! text-generation service when no rule decides. Service failures never
//! escape: they are recorded in the activity log and reported as
//! [`Verdict::Unclassified`].

mod openai;

pub use openai::OpenAiClient;

use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};

use crate::filter::RuleFilter;
use crate::models::Verdict;
use crate::storage::ActivityLog;

/// System role instruction sent with every classification request
pub const SYSTEM_INSTRUCTION: &str = "You are an email classification assistant.";

/// Failures from the text classification service
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response contained no completion text")]
    EmptyCompletion,
}

/// Text returned by a completion service
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Completion text of the first choice
    pub text: String,
    /// Full response body, kept for diagnostics
    pub raw: String,
}

/// A chat-completion style text generation service
pub trait CompletionService: Send + Sync {
    fn complete(&self, system: &str, prompt: &str) -> Result<Completion, ClassifierError>;
}

/// How a completion is mapped to a spam verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerdictMatching {
    /// Spam iff a word containing "spam" appears and no "not"/"non" word
    /// precedes the first one ("not spam", "not-spam", "not a spam message")
    #[default]
    Strict,
    /// Spam iff the text contains "spam" anywhere, so "not spam" is spam too
    Substring,
}

impl VerdictMatching {
    /// Whether `response` (case-insensitive) means spam under this mode
    pub fn is_spam(self, response: &str) -> bool {
        let response = response.to_lowercase();
        match self {
            VerdictMatching::Strict => {
                let mut words = response
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty());
                let mut negated = false;
                words.any(|word| {
                    if matches!(word, "not" | "non") {
                        negated = true;
                    }
                    word.contains("spam")
                }) && !negated
            }
            VerdictMatching::Substring => response.contains("spam"),
        }
    }
}

impl FromStr for VerdictMatching {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(VerdictMatching::Strict),
            "substring" => Ok(VerdictMatching::Substring),
            other => anyhow::bail!("Unknown verdict matching mode: {} (expected strict or substring)", other),
        }
    }
}

/// Name shown to the model: the text before the first `@`, or "Unknown"
pub fn sender_name(sender: &str) -> &str {
    if sender.is_empty() {
        return "Unknown";
    }
    sender.split('@').next().unwrap_or(sender)
}

/// Build the user prompt for one message
pub fn build_prompt(sender: &str, body: &str) -> String {
    format!(
        "\nYou are tasked with reviewing the following email to determine if it is spam or not. \n\
         Respond with either \"spam\" or \"not spam\".\n\
         EMAIL SENDER NAME AND ADDRESS: \"{}\"\n\
         EMAIL BODY (delimited by triple-backticks): ```{}```\n",
        sender_name(sender),
        body
    )
}

/// Rule filter plus external classification service
pub struct Classifier {
    filter: RuleFilter,
    service: Box<dyn CompletionService>,
    log: Arc<dyn ActivityLog>,
    matching: VerdictMatching,
}

impl Classifier {
    pub fn new(
        filter: RuleFilter,
        service: Box<dyn CompletionService>,
        log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            filter,
            service,
            log,
            matching: VerdictMatching::default(),
        }
    }

    pub fn with_matching(mut self, matching: VerdictMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Classify one message
    ///
    /// Rule shortcuts return without calling the service. A service failure
    /// is logged and yields [`Verdict::Unclassified`].
    pub fn classify(&self, body_sample: &str, sender: &str, subject: &str) -> Verdict {
        if let Some(reason) = self.filter.should_skip_classification(sender, subject, body_sample) {
            debug!("Skipping classification for {}: {}", sender, reason.describe());
            self.record(&format!(
                "Skipped classification for {}: {}",
                reason.describe(),
                sender
            ));
            return reason.verdict();
        }

        let prompt = build_prompt(sender, body_sample);

        match self.service.complete(SYSTEM_INSTRUCTION, &prompt) {
            Ok(completion) => {
                let verdict = Verdict::from_spam(self.matching.is_spam(&completion.text));
                self.record(&format!("GPT API Response: {}", completion.raw));
                self.record(&format!("Classification result: {}", completion.text));
                debug!("Classified message from {} as {:?}", sender, verdict);
                verdict
            }
            Err(e) => {
                warn!("Classification failed for {}: {}", sender, e);
                self.record(&format!("Error during classification: {}", e));
                Verdict::Unclassified
            }
        }
    }

    /// Append to the activity log; a storage failure only warns
    fn record(&self, message: &str) {
        if let Err(e) = self.log.record(message) {
            warn!("Failed to write activity log entry: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRules;
    use crate::storage::InMemoryActivityLog;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Completion service returning a fixed reply and counting calls
    struct FixedReply {
        reply: Result<String, String>,
        calls: Arc<AtomicUsize>,
        last_prompt: Arc<Mutex<Option<String>>>,
    }

    impl FixedReply {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
                last_prompt: Arc::new(Mutex::new(None)),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                ..Self::ok("")
            }
        }
    }

    impl CompletionService for FixedReply {
        fn complete(&self, system: &str, prompt: &str) -> Result<Completion, ClassifierError> {
            assert_eq!(system, SYSTEM_INSTRUCTION);
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    raw: format!("{{\"content\":\"{}\"}}", text),
                }),
                Err(message) => Err(ClassifierError::Transport(message.clone())),
            }
        }
    }

    fn classifier(service: FixedReply) -> (Classifier, Arc<InMemoryActivityLog>, Arc<AtomicUsize>) {
        let calls = service.calls.clone();
        let log = Arc::new(InMemoryActivityLog::new());
        let classifier = Classifier::new(
            RuleFilter::new(FilterRules::default()),
            Box::new(service),
            log.clone(),
        );
        (classifier, log, calls)
    }

    #[test]
    fn test_benign_sender_skips_service() {
        let (classifier, log, calls) = classifier(FixedReply::ok("spam"));
        let verdict = classifier.classify("Your statement", "alerts@bankofamerica.com", "Statement");

        assert_eq!(verdict, Verdict::NotSpam);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            log.messages().unwrap(),
            vec!["Skipped classification for known marketing domain: alerts@bankofamerica.com"]
        );
    }

    #[test]
    fn test_malicious_sender_skips_service() {
        let (classifier, _log, calls) = classifier(FixedReply::ok("not spam"));
        let verdict = classifier.classify("Hi", "team@contact.kamalaharris.com", "Hello");

        assert_eq!(verdict, Verdict::Spam);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_body_is_spam_for_any_sender() {
        let (classifier, _log, calls) = classifier(FixedReply::ok("not spam"));

        assert_eq!(classifier.classify("", "friend@example.com", "Lunch"), Verdict::Spam);
        assert_eq!(classifier.classify("", "", ""), Verdict::Spam);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blocked_phrase_mixed_case_is_spam() {
        let (classifier, _log, calls) = classifier(FixedReply::ok("not spam"));
        let verdict = classifier.classify("Please DoNaTe now", "friend@example.com", "Hello");

        assert_eq!(verdict, Verdict::Spam);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_service_spam_reply() {
        let (classifier, log, calls) = classifier(FixedReply::ok("Spam"));
        let verdict = classifier.classify("Cheap watches", "seller@example.com", "Deal");

        assert_eq!(verdict, Verdict::Spam);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let messages = log.messages().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("GPT API Response: "));
        assert_eq!(messages[1], "Classification result: Spam");
    }

    #[test]
    fn test_not_spam_reply_under_strict_matching() {
        let (classifier, _log, _calls) = classifier(FixedReply::ok("not spam"));
        let verdict = classifier.classify("See you at noon", "friend@example.com", "Lunch");
        assert_eq!(verdict, Verdict::NotSpam);
    }

    #[test]
    fn test_not_spam_reply_counts_as_spam_under_substring_matching() {
        // Substring matching is the legacy mapping: "not spam" contains "spam".
        // Strict matching (the default) returns NotSpam for the same reply.
        let (classifier, _log, _calls) = classifier(FixedReply::ok("not spam"));
        let classifier = classifier.with_matching(VerdictMatching::Substring);
        let verdict = classifier.classify("See you at noon", "friend@example.com", "Lunch");
        assert_eq!(verdict, Verdict::Spam);
    }

    #[test]
    fn test_service_error_is_unclassified_and_logged_once() {
        let (classifier, log, calls) = classifier(FixedReply::failing("rate limit exceeded"));
        let verdict = classifier.classify("See you at noon", "friend@example.com", "Lunch");

        assert_eq!(verdict, Verdict::Unclassified);
        assert_eq!(verdict.as_bool(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let messages = log.messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("rate limit exceeded"));
    }

    #[test]
    fn test_prompt_embeds_sender_name_and_body() {
        let service = FixedReply::ok("not spam");
        let last_prompt = service.last_prompt.clone();
        let (classifier, _log, _calls) = classifier(service);

        classifier.classify("See you at noon", "alice@example.com", "Lunch");

        let prompt = last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("EMAIL SENDER NAME AND ADDRESS: \"alice\""));
        assert!(prompt.contains("```See you at noon```"));
        assert!(prompt.contains("Respond with either \"spam\" or \"not spam\"."));
    }

    #[test]
    fn test_sender_name() {
        assert_eq!(sender_name("alice@example.com"), "alice");
        assert_eq!(sender_name("Alice <alice@example.com>"), "Alice <alice");
        assert_eq!(sender_name("no-at-sign"), "no-at-sign");
        assert_eq!(sender_name(""), "Unknown");
    }

    #[test]
    fn test_verdict_matching() {
        assert!(VerdictMatching::Strict.is_spam("SPAM"));
        assert!(VerdictMatching::Strict.is_spam("This is spam."));
        assert!(!VerdictMatching::Strict.is_spam("Not Spam"));
        assert!(!VerdictMatching::Strict.is_spam("legitimate"));
        assert!(!VerdictMatching::Strict.is_spam("not-spam"));
        assert!(!VerdictMatching::Strict.is_spam("This is not a spam message."));
        assert!(!VerdictMatching::Strict.is_spam("Non-spam"));
        assert!(VerdictMatching::Strict.is_spam("Spam. It is not a real invoice."));
        assert!(VerdictMatching::Strict.is_spam("spammy newsletter"));

        assert!(VerdictMatching::Substring.is_spam("not spam"));
        assert!(!VerdictMatching::Substring.is_spam("legitimate"));
    }

    #[test]
    fn test_parse_verdict_matching() {
        assert_eq!("strict".parse::<VerdictMatching>().unwrap(), VerdictMatching::Strict);
        assert_eq!(" Substring ".parse::<VerdictMatching>().unwrap(), VerdictMatching::Substring);
        assert!("fuzzy".parse::<VerdictMatching>().is_err());
    }
}
