//! Triage crate - spam classification for recent Gmail messages
//!
//! This crate provides:
//! - Gmail API client and OAuth token handling
//! - Body extraction from Gmail's part tree
//! - Configurable allow/deny rules applied before any external call
//! - Classification through a chat-completions service
//! - An append-only activity log (SQLite or in-memory)
//! - The fetch-and-classify pipeline tying these together
//!
//! Everything is synchronous and executor-agnostic; collaborators are
//! injected through the [`MailSource`], [`CompletionService`] and
//! [`ActivityLog`] traits.

pub mod classifier;
pub mod config;
pub mod filter;
pub mod gmail;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use classifier::{
    Classifier, ClassifierError, Completion, CompletionService, OpenAiClient, VerdictMatching,
    build_prompt,
};
pub use config::{GmailCredentials, Settings};
pub use filter::{FilterRules, RuleFilter, SkipReason};
pub use gmail::{AuthError, GmailAuth, GmailClient, MailSource, extract_body};
pub use models::{Classification, ClassificationResult, LogEntry, MessageId, Verdict};
pub use pipeline::{Triage, TriageOptions, TriageStats};
pub use storage::{ActivityLog, InMemoryActivityLog, SqliteActivityLog};
