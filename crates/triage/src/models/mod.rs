//! Domain models for message triage

mod log_entry;
mod message;
mod verdict;

pub use log_entry::LogEntry;
pub use message::MessageId;
pub use verdict::{Classification, ClassificationResult, Verdict};
