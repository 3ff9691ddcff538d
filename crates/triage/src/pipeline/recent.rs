//! Classification of the most recent messages
//!
//! The run is linear: list IDs, then fetch, extract and classify each
//! message in listing order. A mail provider error at any point aborts the
//! whole batch; classification errors never do.

use anyhow::{Context, Result};
use log::{debug, info};

use crate::classifier::Classifier;
use crate::gmail::api::GmailMessage;
use crate::gmail::{MailSource, extract_body, extract_header};
use crate::models::{ClassificationResult, Verdict};

/// Maximum number of body characters kept per message
pub const BODY_SAMPLE_CHARS: usize = 500;

const DEFAULT_SUBJECT: &str = "No Subject";
const DEFAULT_SENDER: &str = "Unknown Sender";

/// Options for a triage run
#[derive(Debug, Clone)]
pub struct TriageOptions {
    /// Number of recent messages to fetch
    pub limit: usize,
}

impl Default for TriageOptions {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

/// Verdict counts from one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TriageStats {
    pub spam: usize,
    pub not_spam: usize,
    pub unclassified: usize,
}

impl TriageStats {
    fn count(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Spam => self.spam += 1,
            Verdict::NotSpam => self.not_spam += 1,
            Verdict::Unclassified => self.unclassified += 1,
        }
    }
}

/// Fetch orchestrator: mail source plus classifier
pub struct Triage {
    source: Box<dyn MailSource>,
    classifier: Classifier,
    options: TriageOptions,
}

impl Triage {
    pub fn new(source: Box<dyn MailSource>, classifier: Classifier) -> Self {
        Self {
            source,
            classifier,
            options: TriageOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TriageOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch and classify the most recent messages
    ///
    /// Results are in fetch order. Fails as a whole if listing or fetching
    /// any message fails.
    pub fn fetch_and_classify_recent(&self) -> Result<Vec<ClassificationResult>> {
        let start = std::time::Instant::now();

        let ids = self
            .source
            .list_recent(self.options.limit)
            .context("Failed to list recent messages")?;

        let mut stats = TriageStats::default();
        let mut results = Vec::with_capacity(ids.len());

        for id in &ids {
            let message = self
                .source
                .get_message(id)
                .with_context(|| format!("Failed to fetch message {}", id))?;

            let (result, verdict) = self.classify_message(&message);
            debug!("Message {}: {:?}", id, verdict);
            stats.count(verdict);
            results.push(result);
        }

        info!(
            "Classified {} messages in {}ms (spam: {}, not spam: {}, unclassified: {})",
            results.len(),
            start.elapsed().as_millis(),
            stats.spam,
            stats.not_spam,
            stats.unclassified
        );

        Ok(results)
    }

    /// Extract headers and body from one fetched message and classify it
    pub fn classify_message(&self, message: &GmailMessage) -> (ClassificationResult, Verdict) {
        let headers = message.headers();
        let subject = extract_header(headers, "Subject").unwrap_or(DEFAULT_SUBJECT);
        let sender = extract_header(headers, "From").unwrap_or(DEFAULT_SENDER);

        let body = body_sample(&extract_body(message));
        let verdict = self.classifier.classify(&body, sender, subject);

        let result =
            ClassificationResult::new(subject.to_string(), sender.to_string(), body, verdict);
        (result, verdict)
    }
}

/// First [`BODY_SAMPLE_CHARS`] characters of `body`, trimmed
pub fn body_sample(body: &str) -> String {
    let cut = body
        .char_indices()
        .nth(BODY_SAMPLE_CHARS)
        .map_or(body.len(), |(idx, _)| idx);
    body[..cut].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_sample_short_body() {
        assert_eq!(body_sample("  hello  "), "hello");
    }

    #[test]
    fn test_body_sample_truncates_by_characters() {
        let body = "é".repeat(600);
        let sample = body_sample(&body);
        assert_eq!(sample.chars().count(), BODY_SAMPLE_CHARS);
    }

    #[test]
    fn test_body_sample_trims_after_truncation() {
        let body = format!("{}   tail", "a".repeat(BODY_SAMPLE_CHARS - 2));
        assert_eq!(body_sample(&body), "a".repeat(BODY_SAMPLE_CHARS - 2));
    }

    #[test]
    fn test_stats_count() {
        let mut stats = TriageStats::default();
        stats.count(Verdict::Spam);
        stats.count(Verdict::Unclassified);
        stats.count(Verdict::Spam);
        assert_eq!(
            stats,
            TriageStats {
                spam: 2,
                not_spam: 0,
                unclassified: 1
            }
        );
    }
}
