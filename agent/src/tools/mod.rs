//! Tools the model can call
//!
//! A [`Tool`] declares its contract as a [`ToolSpec`] and receives arguments
//! that were already validated against it. Tools live in an immutable
//! [`ToolRegistry`]; the [`ToolExecutor`] is the only caller and turns every
//! outcome into a JSON string for the conversation.

pub mod args;
pub mod chart;
pub mod eastmoney;
mod executor;
pub mod macro_data;
pub mod market;
mod registry;
pub mod spec;

pub use args::{validate, ArgumentError, ToolArgs};
pub use chart::TrendChartTool;
pub use eastmoney::{EastmoneyMacroSource, EastmoneyMarketSource};
pub use executor::{ToolExecutor, ToolResult};
pub use macro_data::{Indicator, MacroDataSource, MacroDataTool, MacroRow};
pub use market::{Bar, MarketDataSource, Period, StockDataTool};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use spec::{ParamKind, ParamSpec, ToolSpec};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ToolsConfig;
use crate::db::SnapshotStore;

/// Failure inside a tool body
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Failed(String),

    #[error("no data returned for {0}")]
    NoData(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What a tool hands back on success
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Serialized to JSON text
    Structured(Value),
    /// Already text, passed through as-is
    Text(String),
}

impl ToolOutput {
    pub fn into_content(self) -> Result<String, serde_json::Error> {
        match self {
            ToolOutput::Text(text) | ToolOutput::Structured(Value::String(text)) => Ok(text),
            ToolOutput::Structured(value) => serde_json::to_string(&value),
        }
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Structured(value)
    }
}

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;
}

/// Registry of the three built-in tools backed by the Eastmoney endpoints
pub fn builtin_registry(config: &ToolsConfig, snapshots: SnapshotStore) -> Result<ToolRegistry> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let market = Arc::new(EastmoneyMarketSource::new(
        client.clone(),
        &config.market_data_url,
    ));
    let macro_source = Arc::new(EastmoneyMacroSource::new(client, &config.macro_data_url));

    builtin_registry_with(config, market, macro_source, snapshots)
}

/// Registry of the built-in tools over caller-supplied data sources
pub fn builtin_registry_with(
    config: &ToolsConfig,
    market: Arc<dyn MarketDataSource>,
    macro_source: Arc<dyn MacroDataSource>,
    snapshots: SnapshotStore,
) -> Result<ToolRegistry> {
    let chart_dir = crate::config::expand_path(&config.chart_dir)?;

    ToolRegistry::builder()
        .register(StockDataTool::new(market, snapshots.clone()))
        .register(TrendChartTool::new(snapshots, chart_dir, config.ma_period))
        .register(MacroDataTool::new(macro_source, config.macro_history_depth))
        .build()
}
