//! Market data fetch tool

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolSpec};
use crate::db::SnapshotStore;

pub const STOCK_DATA_TOOL: &str = "get_stock_zh_a_spot_data";

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// `YYYY-MM-DD`
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

/// Bar size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            other => Err(ToolError::Failed(format!("unsupported period '{}'", other))),
        }
    }
}

/// Where price history comes from
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Bars for `symbol` between `start` and `end` (`YYYYMMDD`, inclusive), oldest first
    async fn fetch_bars(
        &self,
        symbol: &str,
        period: Period,
        start: &str,
        end: &str,
    ) -> Result<Vec<Bar>, ToolError>;
}

/// Fetches A-share bars and replaces the current snapshot with them
pub struct StockDataTool {
    spec: ToolSpec,
    source: Arc<dyn MarketDataSource>,
    snapshots: SnapshotStore,
}

impl StockDataTool {
    pub fn new(source: Arc<dyn MarketDataSource>, snapshots: SnapshotStore) -> Self {
        let spec = ToolSpec::new(
            STOCK_DATA_TOOL,
            "Fetch historical A-share prices for a stock or index and store them for charting. \
             Returns a summary with the number of bars, date range, latest close and highest high.",
        )
        .param(
            ParamSpec::string(
                "symbol",
                "Stock or index code, e.g. '600036' (China Merchants Bank) or 'sh000001' (SSE Composite)",
            )
            .required()
            .default_value(json!("sh000001")),
        )
        .param(
            ParamSpec::string("period", "Bar size")
                .one_of(&["daily", "weekly", "monthly"])
                .default_value(json!("daily")),
        )
        .param(
            ParamSpec::string("start_date", "Start date, YYYYMMDD")
                .default_value(json!("20240101")),
        )
        .param(
            ParamSpec::string("end_date", "End date, YYYYMMDD")
                .default_value(json!("20241231")),
        );

        Self {
            spec,
            source,
            snapshots,
        }
    }
}

#[async_trait]
impl Tool for StockDataTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let symbol = args.require_str("symbol")?;
        let period: Period = args.require_str("period")?.parse()?;
        let start = args.require_str("start_date")?;
        let end = args.require_str("end_date")?;

        let bars = self.source.fetch_bars(symbol, period, start, end).await?;
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(ToolError::NoData(format!("{} between {} and {}", symbol, start, end)));
        };

        self.snapshots.replace(symbol, &bars)?;
        tracing::info!(symbol, bars = bars.len(), "Snapshot replaced");

        let max_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

        Ok(json!({
            "symbol": symbol,
            "data_points": bars.len(),
            "start_date": first.date,
            "end_date": last.date,
            "latest_close": last.close,
            "max_high": max_high,
        })
        .into())
    }
}
