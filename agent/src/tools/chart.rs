//! Trend chart tool
//!
//! Reads the current snapshot, overlays a moving average of the close and
//! writes the result as a standalone SVG file.

use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::{Bar, ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolSpec};
use crate::db::SnapshotStore;

pub const TREND_CHART_TOOL: &str = "visualize_stock_data_trend";

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 700.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;

const CLOSE_COLOR: &str = "#1f77b4";
const OPEN_COLOR: &str = "#ff7f0e";
const MA_COLOR: &str = "#d62728";

/// Rolling mean over `period` values; `None` until the window is full
pub fn moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
        }
        out.push((i + 1 >= period).then(|| window_sum / period as f64));
    }
    out
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

struct Frame {
    count: usize,
    min: f64,
    max: f64,
}

impl Frame {
    fn x(&self, index: usize) -> f64 {
        let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        if self.count <= 1 {
            return MARGIN_LEFT + plot_width / 2.0;
        }
        MARGIN_LEFT + plot_width * index as f64 / (self.count - 1) as f64
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            return MARGIN_TOP + plot_height / 2.0;
        }
        MARGIN_TOP + plot_height * (self.max - value) / span
    }
}

fn polyline(frame: &Frame, points: impl Iterator<Item = (usize, f64)>, style: &str) -> String {
    let coords: Vec<String> = points
        .map(|(i, v)| format!("{:.1},{:.1}", frame.x(i), frame.y(v)))
        .collect();
    format!(
        "  <polyline fill=\"none\" {} points=\"{}\"/>\n",
        style,
        coords.join(" ")
    )
}

/// Render close, open and moving average as an SVG line chart
pub fn render_trend_svg(title: &str, bars: &[Bar], ma: &[Option<f64>], ma_period: usize) -> String {
    let values = bars
        .iter()
        .flat_map(|b| [b.close, b.open])
        .chain(ma.iter().flatten().copied());
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let frame = Frame {
        count: bars.len(),
        min: if min.is_finite() { min } else { 0.0 },
        max: if max.is_finite() { max } else { 1.0 },
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">",
        w = WIDTH,
        h = HEIGHT
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    let _ = writeln!(
        svg,
        "  <text x=\"{}\" y=\"35\" font-size=\"22\" font-weight=\"bold\" text-anchor=\"middle\">{}</text>",
        WIDTH / 2.0,
        escape_xml(title)
    );

    // Horizontal grid with price labels
    for step in 0..=4 {
        let value = frame.min + (frame.max - frame.min) * step as f64 / 4.0;
        let y = frame.y(value);
        let _ = writeln!(
            svg,
            "  <line x1=\"{}\" y1=\"{y:.1}\" x2=\"{}\" y2=\"{y:.1}\" stroke=\"#dddddd\"/>",
            MARGIN_LEFT,
            WIDTH - MARGIN_RIGHT
        );
        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"end\">{:.2}</text>",
            MARGIN_LEFT - 8.0,
            y + 4.0,
            value
        );
    }

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        let label_y = HEIGHT - MARGIN_BOTTOM + 20.0;
        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\">{}</text>",
            MARGIN_LEFT,
            label_y,
            escape_xml(&first.date)
        );
        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" text-anchor=\"end\">{}</text>",
            WIDTH - MARGIN_RIGHT,
            label_y,
            escape_xml(&last.date)
        );
    }

    svg.push_str(&polyline(
        &frame,
        bars.iter().enumerate().map(|(i, b)| (i, b.open)),
        &format!(
            "stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"2,3\" opacity=\"0.6\"",
            OPEN_COLOR
        ),
    ));
    svg.push_str(&polyline(
        &frame,
        bars.iter().enumerate().map(|(i, b)| (i, b.close)),
        &format!("stroke=\"{}\" stroke-width=\"2.5\" opacity=\"0.8\"", CLOSE_COLOR),
    ));
    svg.push_str(&polyline(
        &frame,
        ma.iter().enumerate().filter_map(|(i, v)| v.map(|v| (i, v))),
        &format!("stroke=\"{}\" stroke-width=\"2.5\"", MA_COLOR),
    ));

    let legend = [
        (CLOSE_COLOR, "Close".to_string()),
        (OPEN_COLOR, "Open".to_string()),
        (MA_COLOR, format!("MA{}", ma_period)),
    ];
    for (i, (color, label)) in legend.iter().enumerate() {
        let y = MARGIN_TOP + 10.0 + 20.0 * i as f64;
        let _ = writeln!(
            svg,
            "  <line x1=\"{x1}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"{color}\" stroke-width=\"3\"/>",
            x1 = MARGIN_LEFT + 10.0,
            x2 = MARGIN_LEFT + 35.0,
        );
        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\">{}</text>",
            MARGIN_LEFT + 42.0,
            y + 4.0,
            label
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Draws the current snapshot as a trend chart
pub struct TrendChartTool {
    spec: ToolSpec,
    snapshots: SnapshotStore,
    chart_dir: PathBuf,
    ma_period: usize,
}

impl TrendChartTool {
    pub fn new(snapshots: SnapshotStore, chart_dir: PathBuf, ma_period: usize) -> Self {
        let spec = ToolSpec::new(
            TREND_CHART_TOOL,
            "Draw a trend chart (close, open and moving average) of the most recently fetched \
             price data. Call the data fetch tool first.",
        )
        .param(
            ParamSpec::string("symbol", "Stock or index code, used for the chart title")
                .required(),
        );

        Self {
            spec,
            snapshots,
            chart_dir,
            ma_period,
        }
    }

    fn chart_path(&self, symbol: &str) -> PathBuf {
        let safe: String = symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.chart_dir.join(format!("{}_trend.svg", safe))
    }
}

#[async_trait]
impl Tool for TrendChartTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let symbol = args.require_str("symbol")?;

        let (stored_symbol, bars) = self.snapshots.load()?;
        if bars.is_empty() {
            return Err(ToolError::Failed(
                "table current_stock_data is empty, fetch price data first".to_string(),
            ));
        }
        if let Some(stored) = stored_symbol.as_deref().filter(|s| *s != symbol) {
            tracing::warn!(requested = symbol, stored, "Charting snapshot of a different symbol");
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ma = moving_average(&closes, self.ma_period);
        let title = format!("{} price and {}-period moving average", symbol, self.ma_period);
        let svg = render_trend_svg(&title, &bars, &ma, self.ma_period);

        std::fs::create_dir_all(&self.chart_dir)?;
        let path = self.chart_path(symbol);
        std::fs::write(&path, svg)?;
        tracing::info!(symbol, path = %path.display(), "Trend chart written");

        Ok(json!({
            "success": true,
            "message": format!(
                "Trend chart for {} with the {}-period moving average saved to {}",
                symbol,
                self.ma_period,
                path.display()
            ),
            "path": path.display().to_string(),
            "points": bars.len(),
        })
        .into())
    }
}
