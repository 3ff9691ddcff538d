//! Activity log storage
//!
//! The activity log is append-only: entries are recorded and read back,
//! never updated or deleted. The trait-based design allows swapping between
//! in-memory and SQLite implementations.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryActivityLog;
pub use sqlite::SqliteActivityLog;
pub use traits::ActivityLog;
