//! Durable task context checkpoints, one row per task id

use super::Database;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::path::PathBuf;

use crate::pipeline::TaskContext;

/// Listing entry for a stored checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub task_id: String,
    pub user_input: String,
    pub has_report: bool,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ContextStore {
    db: Database,
}

impl ContextStore {
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            db: Database::open_at(path)?,
        })
    }

    /// Insert or overwrite the checkpoint for `ctx.task_id`
    pub fn save(&self, ctx: &TaskContext) -> Result<()> {
        let json = serde_json::to_string(ctx)?;

        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO task_context (task_id, context_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(task_id) DO UPDATE SET
                context_json = excluded.context_json,
                updated_at = excluded.updated_at",
            (&ctx.task_id, &json, Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        )
        .with_context(|| format!("Failed to save task context {}", ctx.task_id))?;

        tracing::debug!(task_id = %ctx.task_id, messages = ctx.messages.len(), "Task context saved");
        Ok(())
    }

    pub fn load(&self, task_id: &str) -> Result<Option<TaskContext>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare("SELECT context_json FROM task_context WHERE task_id = ?1")?;
        let mut rows = stmt.query([task_id])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let json: String = row.get(0)?;
        let ctx = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt task context {}", task_id))?;
        Ok(Some(ctx))
    }

    /// Stored checkpoints, most recently updated first
    pub fn list(&self, limit: u32) -> Result<Vec<TaskSummary>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT task_id,
                    COALESCE(json_extract(context_json, '$.user_input'), ''),
                    json_extract(context_json, '$.final_report') IS NOT NULL,
                    updated_at
             FROM task_context
             ORDER BY updated_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let summaries = stmt
            .query_map([limit], |row| {
                Ok(TaskSummary {
                    task_id: row.get(0)?,
                    user_input: row.get(1)?,
                    has_report: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM task_context", [], |row| row.get(0))?;
        Ok(count)
    }
}
