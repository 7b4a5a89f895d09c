//! Append-only conversation history for the single-agent loop

use super::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::PathBuf;

use crate::llm::{Message, Role, ToolInvocation};

/// One persisted history row
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub tool_calls: Option<Vec<ToolInvocation>>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
        }
    }
}

type RawRow = (i64, String, String, Option<String>, String);

fn decode_row(raw: RawRow) -> Result<HistoryRecord> {
    let (id, role, content, tool_calls, timestamp) = raw;

    let tool_calls = tool_calls
        .map(|json| serde_json::from_str::<Vec<ToolInvocation>>(&json))
        .transpose()
        .with_context(|| format!("Corrupt tool_calls in history row {}", id))?;

    Ok(HistoryRecord {
        id,
        role: role.parse()?,
        content,
        tool_calls,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .with_context(|| format!("Corrupt timestamp in history row {}", id))?
            .with_timezone(&Utc),
    })
}

/// The single global conversation
#[derive(Debug, Clone)]
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            db: Database::open_at(path)?,
        })
    }

    /// Append one message; returns its row id
    pub fn append(&self, message: &Message) -> Result<i64> {
        let tool_calls_json = message
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO conversation (role, content, tool_calls, timestamp) VALUES (?1, ?2, ?3, ?4)",
            (
                message.role.as_str(),
                &message.content,
                &tool_calls_json,
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        )
        .context("Failed to append history message")?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, role = %message.role, len = message.content.len(), "History message saved");
        Ok(id)
    }

    /// Every record in insertion order
    pub fn records(&self) -> Result<Vec<HistoryRecord>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, role, content, tool_calls, timestamp FROM conversation ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<RawRow>, _>>()?;

        rows.into_iter().map(decode_row).collect()
    }

    /// The last `limit` records, still in insertion order
    pub fn recent(&self, limit: u32) -> Result<Vec<HistoryRecord>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, role, content, tool_calls, timestamp FROM conversation ORDER BY id DESC LIMIT ?1",
        )?;

        let mut rows = stmt
            .query_map([limit], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<RawRow>, _>>()?;
        rows.reverse();

        rows.into_iter().map(decode_row).collect()
    }

    /// Full history as chat messages
    pub fn load(&self) -> Result<Vec<Message>> {
        let messages: Vec<Message> =
            self.records()?.iter().map(HistoryRecord::to_message).collect();
        tracing::info!("Loaded {} history messages", messages.len());
        Ok(messages)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM conversation", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Truncate the whole history; returns the number of rows removed
    pub fn clear(&self) -> Result<usize> {
        let conn = self.db.connect()?;
        let removed = conn.execute("DELETE FROM conversation", [])?;
        tracing::info!(removed, "History cleared");
        Ok(removed)
    }
}
