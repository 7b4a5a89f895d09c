//! Shared fixtures

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use fin_agent::config::{AgentFileConfig, ToolsConfig};
use fin_agent::db::SnapshotStore;
use fin_agent::llm::{ChatResponse, MockModel};
use fin_agent::tools::{
    builtin_registry_with, Bar, Indicator, MacroDataSource, MacroRow, MarketDataSource, Period,
    ToolError, ToolExecutor, ToolRegistry,
};

/// Thirty daily bars with a rising close
pub struct FixtureMarket;

#[async_trait]
impl MarketDataSource for FixtureMarket {
    async fn fetch_bars(
        &self,
        _symbol: &str,
        _period: Period,
        _start: &str,
        _end: &str,
    ) -> Result<Vec<Bar>, ToolError> {
        Ok((1..=30)
            .map(|day| {
                let close = 30.0 + day as f64 * 0.5;
                Bar {
                    date: format!("2024-01-{:02}", day),
                    open: close - 0.2,
                    close,
                    high: close + 0.4,
                    low: close - 0.6,
                    volume: 1_000_000.0,
                }
            })
            .collect())
    }
}

/// Ten yearly observations per indicator, newest first
pub struct FixtureMacro;

#[async_trait]
impl MacroDataSource for FixtureMacro {
    async fn fetch_indicator(
        &self,
        indicator: Indicator,
        _limit: usize,
    ) -> Result<Vec<MacroRow>, ToolError> {
        let base = match indicator {
            Indicator::Cpi => 100.0,
            Indicator::Gdp => 1_000_000.0,
        };
        Ok((0..10)
            .map(|i| MacroRow {
                period: (2024 - i).to_string(),
                value: base + i as f64,
            })
            .collect())
    }
}

/// Config with every file under `dir`
pub fn test_config(dir: &TempDir) -> AgentFileConfig {
    let mut config = AgentFileConfig::default();
    let path = |name: &str| dir.path().join(name).display().to_string();
    config.storage.history_db = path("history.db");
    config.storage.context_db = path("pipeline.db");
    config.storage.snapshot_db = path("market.db");
    config.tools = ToolsConfig {
        chart_dir: path("charts"),
        ..ToolsConfig::default()
    };
    config.logging.file = false;
    config
}

pub fn test_registry(config: &AgentFileConfig) -> ToolRegistry {
    let snapshots = SnapshotStore::open_at(config.storage.snapshot_path().unwrap()).unwrap();
    builtin_registry_with(
        &config.tools,
        Arc::new(FixtureMarket),
        Arc::new(FixtureMacro),
        snapshots,
    )
    .unwrap()
}

pub fn test_executor(config: &AgentFileConfig) -> ToolExecutor {
    ToolExecutor::new(Arc::new(test_registry(config)))
}

/// Raw tool call in the Ollama envelope shape
pub fn call(name: &str, arguments: Value) -> Value {
    json!({"function": {"name": name, "arguments": arguments}})
}

pub fn scripted(responses: Vec<ChatResponse>) -> Arc<MockModel> {
    Arc::new(MockModel::new(responses))
}
