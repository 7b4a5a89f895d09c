//! The `current_stock_data` snapshot shared by the fetch and chart tools

use super::Database;
use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::tools::Bar;

/// Latest fetched price series; every fetch replaces it wholesale
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    db: Database,
}

impl SnapshotStore {
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            db: Database::open_at(path)?,
        })
    }

    /// Replace the snapshot with `bars` for `symbol`
    pub fn replace(&self, symbol: &str, bars: &[Bar]) -> Result<usize> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM current_stock_data", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO current_stock_data (symbol, date, open, close, high, low, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for bar in bars {
                stmt.execute((
                    symbol, &bar.date, bar.open, bar.close, bar.high, bar.low, bar.volume,
                ))?;
            }
        }

        tx.commit().context("Failed to replace snapshot")?;
        Ok(bars.len())
    }

    /// Symbol and bars of the current snapshot, oldest first
    pub fn load(&self) -> Result<(Option<String>, Vec<Bar>)> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT symbol, date, open, close, high, low, volume
             FROM current_stock_data ORDER BY date ASC, rowid ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Bar {
                        date: row.get(1)?,
                        open: row.get(2)?,
                        close: row.get(3)?,
                        high: row.get(4)?,
                        low: row.get(5)?,
                        volume: row.get(6)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let symbol = rows.first().map(|(symbol, _)| symbol.clone());
        let bars = rows.into_iter().map(|(_, bar)| bar).collect();
        Ok((symbol, bars))
    }
}
