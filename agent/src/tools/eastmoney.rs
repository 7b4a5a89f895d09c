//! Eastmoney HTTP data sources
//!
//! Price history comes from the push2his kline API, indicator series from
//! the datacenter report API. Both answer JSON with a nullable payload when
//! nothing matches.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Bar, Indicator, MacroDataSource, MacroRow, MarketDataSource, Period, ToolError};

/// `secid` and price adjustment for a symbol
///
/// `sh`/`sz` prefixed codes are indices and stay unadjusted. Bare codes are
/// stocks, forward adjusted, with the market taken from the first digit.
fn resolve_symbol(symbol: &str) -> (String, u8) {
    let lower = symbol.to_ascii_lowercase();
    if let Some(code) = lower.strip_prefix("sh") {
        return (format!("1.{}", code), 0);
    }
    if let Some(code) = lower.strip_prefix("sz") {
        return (format!("0.{}", code), 0);
    }

    let market = match symbol.chars().next() {
        Some('5') | Some('6') | Some('9') => 1,
        _ => 0,
    };
    (format!("{}.{}", market, symbol), 1)
}

fn kline_type(period: Period) -> &'static str {
    match period {
        Period::Daily => "101",
        Period::Weekly => "102",
        Period::Monthly => "103",
    }
}

/// `date,open,close,high,low,volume[,...]`
fn parse_kline(line: &str) -> Result<Bar, ToolError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 6 {
        return Err(ToolError::Failed(format!("unexpected kline row '{}'", line)));
    }

    let number = |i: usize| -> Result<f64, ToolError> {
        fields[i]
            .trim()
            .parse::<f64>()
            .map_err(|_| ToolError::Failed(format!("invalid number '{}' in kline row", fields[i])))
    };

    Ok(Bar {
        date: fields[0].trim().to_string(),
        open: number(1)?,
        close: number(2)?,
        high: number(3)?,
        low: number(4)?,
        volume: number(5)?,
    })
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

/// Kline endpoint client
pub struct EastmoneyMarketSource {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyMarketSource {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MarketDataSource for EastmoneyMarketSource {
    async fn fetch_bars(
        &self,
        symbol: &str,
        period: Period,
        start: &str,
        end: &str,
    ) -> Result<Vec<Bar>, ToolError> {
        let (secid, adjust) = resolve_symbol(symbol);
        let adjust = adjust.to_string();
        let url = format!("{}/api/qt/stock/kline/get", self.base_url);
        tracing::debug!(symbol, %secid, period = period.as_str(), start, end, "Fetching klines");

        let response: KlineResponse = self
            .client
            .get(&url)
            .query(&[
                ("secid", secid.as_str()),
                ("klt", kline_type(period)),
                ("fqt", adjust.as_str()),
                ("beg", start),
                ("end", end),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .data
            .map(|data| data.klines)
            .unwrap_or_default()
            .iter()
            .map(|line| parse_kline(line))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    result: Option<ReportResult>,
}

#[derive(Debug, Deserialize)]
struct ReportResult {
    #[serde(default)]
    data: Vec<Value>,
}

fn report_name(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Cpi => "RPT_ECONOMY_CPI",
        Indicator::Gdp => "RPT_ECONOMY_GDP",
    }
}

fn value_column(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Cpi => "NATIONAL_BASE",
        Indicator::Gdp => "DOMESTICL_PRODUCT_BASE",
    }
}

fn report_row(indicator: Indicator, row: &Value) -> Option<MacroRow> {
    let period = row
        .get("TIME")
        .or_else(|| row.get("REPORT_DATE"))
        .and_then(Value::as_str)?;
    let value = row.get(value_column(indicator)).and_then(Value::as_f64)?;
    Some(MacroRow {
        period: period.to_string(),
        value,
    })
}

/// Datacenter report endpoint client
pub struct EastmoneyMacroSource {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyMacroSource {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MacroDataSource for EastmoneyMacroSource {
    async fn fetch_indicator(
        &self,
        indicator: Indicator,
        limit: usize,
    ) -> Result<Vec<MacroRow>, ToolError> {
        let url = format!("{}/api/data/v1/get", self.base_url);
        let page_size = limit.to_string();
        tracing::debug!(indicator = indicator.as_str(), limit, "Fetching macro report");

        let response: ReportResponse = self
            .client
            .get(&url)
            .query(&[
                ("reportName", report_name(indicator)),
                ("columns", "ALL"),
                ("sortColumns", "REPORT_DATE"),
                ("sortTypes", "-1"),
                ("pageNumber", "1"),
                ("pageSize", page_size.as_str()),
                ("source", "WEB"),
                ("client", "WEB"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rows: Vec<MacroRow> = response
            .result
            .map(|result| result.data)
            .unwrap_or_default()
            .iter()
            .filter_map(|row| report_row(indicator, row))
            .take(limit)
            .collect();

        Ok(rows)
    }
}
