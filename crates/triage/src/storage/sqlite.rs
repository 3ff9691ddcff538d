//! SQLite-backed activity log

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use rusqlite_migration::{M, Migrations};

use super::ActivityLog;
use crate::models::LogEntry;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE log_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                message TEXT NOT NULL
            );
            "#,
        ),
    ])
}

/// SQLite-based activity log
pub struct SqliteActivityLog {
    conn: Mutex<Connection>,
}

impl SqliteActivityLog {
    /// Open (or create) the activity database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        // WAL lets readers (`sift log`) run while a classification run appends
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("activity database lock poisoned"))
    }
}

impl ActivityLog for SqliteActivityLog {
    fn record(&self, message: &str) -> Result<LogEntry> {
        let conn = self.conn()?;
        let timestamp = Utc::now();

        conn.execute(
            "INSERT INTO log_entries (timestamp, message) VALUES (?, ?)",
            params![timestamp.to_rfc3339(), message],
        )
        .context("Failed to insert activity log entry")?;

        Ok(LogEntry {
            id: conn.last_insert_rowid(),
            timestamp,
            message: message.to_string(),
        })
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, message FROM log_entries
             ORDER BY id DESC
             LIMIT ?",
        )?;

        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, timestamp, message)| -> Result<LogEntry> {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .with_context(|| format!("Invalid timestamp on log entry {}", id))?
                    .with_timezone(&Utc);
                Ok(LogEntry {
                    id,
                    timestamp,
                    message,
                })
            })
            .collect()
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM log_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
