//! Fetch-and-classify pipeline

mod recent;

pub use recent::{BODY_SAMPLE_CHARS, Triage, TriageOptions, TriageStats, body_sample};
