//! Verdicts and classification output

use serde::{Deserialize, Serialize};

/// Outcome of classifying a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Spam,
    NotSpam,
    /// The classification service failed; neither spam nor clean
    Unclassified,
}

impl Verdict {
    /// Build a verdict from a definite spam / not-spam answer
    pub fn from_spam(is_spam: bool) -> Self {
        if is_spam { Verdict::Spam } else { Verdict::NotSpam }
    }

    /// `Some(true)` for spam, `Some(false)` for not spam, `None` when unclassified
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Verdict::Spam => Some(true),
            Verdict::NotSpam => Some(false),
            Verdict::Unclassified => None,
        }
    }
}

/// Outward-facing label attached to each result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "spam")]
    Spam,
    #[serde(rename = "not spam")]
    NotSpam,
}

impl From<Verdict> for Classification {
    /// Unclassified messages share the "not spam" label; see
    /// [`ClassificationResult::unclassified`] for the distinguishing flag.
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Spam => Classification::Spam,
            Verdict::NotSpam | Verdict::Unclassified => Classification::NotSpam,
        }
    }
}

/// Classification of one fetched message, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub subject: String,
    pub sender: String,
    /// Body sample (at most 500 characters, trimmed)
    #[serde(rename = "body")]
    pub body_sample: String,
    pub classification: Classification,
    /// Set when the classification service failed for this message
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unclassified: bool,
}

impl ClassificationResult {
    pub fn new(subject: String, sender: String, body_sample: String, verdict: Verdict) -> Self {
        Self {
            subject,
            sender,
            body_sample,
            classification: verdict.into(),
            unclassified: verdict == Verdict::Unclassified,
        }
    }
}
