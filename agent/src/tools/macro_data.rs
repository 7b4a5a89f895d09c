//! Macroeconomic indicator tool

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolSpec};

pub const MACRO_DATA_TOOL: &str = "query_macro_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Cpi,
    Gdp,
}

impl Indicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Cpi => "CPI",
            Indicator::Gdp => "GDP",
        }
    }

    fn describe(&self, row: &MacroRow) -> String {
        match self {
            Indicator::Cpi => format!(
                "Period {}: consumer price index (previous year = 100) is {}",
                row.period, row.value
            ),
            Indicator::Gdp => format!(
                "Period {}: gross domestic product {} (100 million CNY)",
                row.period, row.value
            ),
        }
    }
}

impl std::str::FromStr for Indicator {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CPI" => Ok(Indicator::Cpi),
            "GDP" => Ok(Indicator::Gdp),
            other => Err(ToolError::Failed(format!(
                "unsupported indicator '{}', query 'CPI' or 'GDP'",
                other
            ))),
        }
    }
}

/// One observation, newest first when returned by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRow {
    pub period: String,
    pub value: f64,
}

/// Where indicator series come from
#[async_trait]
pub trait MacroDataSource: Send + Sync {
    /// Up to `limit` observations, newest first
    async fn fetch_indicator(&self, indicator: Indicator, limit: usize)
        -> Result<Vec<MacroRow>, ToolError>;
}

/// Latest CPI or GDP observations for China
pub struct MacroDataTool {
    spec: ToolSpec,
    source: Arc<dyn MacroDataSource>,
    history_depth: usize,
}

impl MacroDataTool {
    pub fn new(source: Arc<dyn MacroDataSource>, history_depth: usize) -> Self {
        let spec = ToolSpec::new(
            MACRO_DATA_TOOL,
            "Query China's macroeconomic indicators (CPI or GDP) and return the latest data points \
             with a readable summary.",
        )
        .param(
            ParamSpec::string("indicator", "Indicator to query")
                .required()
                .one_of(&["CPI", "GDP"]),
        );

        Self {
            spec,
            source,
            history_depth,
        }
    }
}

#[async_trait]
impl Tool for MacroDataTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let indicator: Indicator = args.require_str("indicator")?.parse()?;

        let mut rows = self
            .source
            .fetch_indicator(indicator, self.history_depth)
            .await?;
        if rows.is_empty() {
            return Err(ToolError::NoData(indicator.as_str().to_string()));
        }
        rows.truncate(self.history_depth);

        let lines: Vec<String> = rows.iter().map(|row| indicator.describe(row)).collect();
        let formatted = format!(
            "Latest {} macro data:\n{}",
            indicator.as_str(),
            lines.join("\n")
        );

        Ok(json!({
            "indicator": indicator.as_str(),
            "latest_data_points": rows,
            "formatted_output": formatted,
        })
        .into())
    }
}
