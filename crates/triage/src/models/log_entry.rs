//! Activity log entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single persisted activity event (skip reason, model response, error)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Storage-assigned identifier, increasing with insertion order
    pub id: i64,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Free-form event text
    pub message: String,
}
