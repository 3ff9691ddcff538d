//! Storage trait definitions

use crate::models::LogEntry;
use anyhow::Result;

/// Append-only store of activity events
pub trait ActivityLog: Send + Sync {
    /// Append an entry; the timestamp is assigned at insertion
    fn record(&self, message: &str) -> Result<LogEntry>;

    /// Most recent entries, newest first
    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>>;

    /// Total number of entries
    fn count(&self) -> Result<usize>;
}
