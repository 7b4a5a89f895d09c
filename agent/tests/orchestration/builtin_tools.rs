//! Built-in tools driven through the executor

use serde_json::{json, Map, Value};
use tempfile::tempdir;

use super::common::{test_config, test_executor};

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[tokio::test]
async fn test_cpi_through_executor() {
    let dir = tempdir().unwrap();
    let executor = test_executor(&test_config(&dir));

    let result = executor
        .execute("query_macro_data", &args(json!({"indicator": "CPI"})))
        .await;
    assert!(!result.is_error, "{}", result.content);

    let value: Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(value["indicator"], "CPI");
    let points = value["latest_data_points"].as_array().unwrap();
    assert!(points.len() <= 5);
    assert!(value["formatted_output"]
        .as_str()
        .unwrap()
        .starts_with("Latest CPI macro data:"));
}

#[tokio::test]
async fn test_fetch_then_chart() {
    let dir = tempdir().unwrap();
    let executor = test_executor(&test_config(&dir));

    let fetched = executor
        .execute("get_stock_zh_a_spot_data", &args(json!({"symbol": "600036"})))
        .await;
    let summary: Value = serde_json::from_str(&fetched.content).unwrap();
    assert_eq!(summary["symbol"], "600036");
    assert_eq!(summary["data_points"], 30);
    assert_eq!(summary["start_date"], "2024-01-01");
    assert_eq!(summary["latest_close"], 45.0);

    let charted = executor
        .execute("visualize_stock_data_trend", &args(json!({"symbol": "600036"})))
        .await;
    assert!(!charted.is_error, "{}", charted.content);
    let chart: Value = serde_json::from_str(&charted.content).unwrap();
    assert_eq!(chart["points"], 30);

    let svg = std::fs::read_to_string(chart["path"].as_str().unwrap()).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("MA5"));
}

#[tokio::test]
async fn test_chart_before_fetch_is_runtime_error() {
    let dir = tempdir().unwrap();
    let executor = test_executor(&test_config(&dir));

    let result = executor
        .execute("visualize_stock_data_trend", &args(json!({"symbol": "600036"})))
        .await;
    assert!(result.is_error);

    let value: Value = serde_json::from_str(&result.content).unwrap();
    let message = value["error"].as_str().unwrap();
    assert!(message.starts_with("runtime error: tool 'visualize_stock_data_trend' execution failed"));
    assert!(message.contains("fetch price data first"));
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments() {
    let dir = tempdir().unwrap();
    let executor = test_executor(&test_config(&dir));
    assert_eq!(executor.tool_names().len(), 3);

    let missing = executor.execute("nonexistent_tool", &Map::new()).await;
    assert!(missing.is_error);
    assert_eq!(
        serde_json::from_str::<Value>(&missing.content).unwrap(),
        json!({"error": "execution failed: tool 'nonexistent_tool' not found"})
    );

    let bad_period = executor
        .execute(
            "get_stock_zh_a_spot_data",
            &args(json!({"symbol": "600036", "period": "hourly"})),
        )
        .await;
    assert!(bad_period.is_error);
    assert!(bad_period.content.contains("parameter error"));
}
