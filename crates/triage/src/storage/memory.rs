//! In-memory activity log
//!
//! Used by tests and by runs that should not persist anything.

use anyhow::{Result, anyhow};
use chrono::Utc;
use std::sync::RwLock;

use super::ActivityLog;
use crate::models::LogEntry;

/// In-memory implementation of ActivityLog
#[derive(Default)]
pub struct InMemoryActivityLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryActivityLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in insertion order
    pub fn messages(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| anyhow!("activity log lock poisoned"))?;
        Ok(entries.iter().map(|e| e.message.clone()).collect())
    }
}

impl ActivityLog for InMemoryActivityLog {
    fn record(&self, message: &str) -> Result<LogEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("activity log lock poisoned"))?;

        let entry = LogEntry {
            id: entries.len() as i64 + 1,
            timestamp: Utc::now(),
            message: message.to_string(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let entries = self.entries.read().map_err(|_| anyhow!("activity log lock poisoned"))?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    fn count(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(|_| anyhow!("activity log lock poisoned"))?;
        Ok(entries.len())
    }
}
