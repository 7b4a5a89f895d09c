//! SQLite persistence
//!
//! Every store holds only a file path. Each read or write opens a fresh
//! connection, runs its statement(s), and drops the handle, so no lock is
//! held between logical steps. The durable file is the source of truth.

pub mod context_store;
pub mod history;
pub mod schema;
pub mod snapshot;

pub use context_store::{ContextStore, TaskSummary};
pub use history::{HistoryRecord, HistoryStore};
pub use snapshot::SnapshotStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Handle to a database file
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open or create the database at a specific path and ensure the schema
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let db = Self { path };
        let conn = db.connect()?;
        schema::create_tables(&conn)?;

        tracing::debug!("Database ready at {:?}", db.path);
        Ok(db)
    }

    /// Open a fresh connection for one operation
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open database at {:?}", self.path))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
