//! Durability across store handles and process restarts

use serde_json::json;
use tempfile::tempdir;

use fin_agent::app::Runtime;
use fin_agent::db::{ContextStore, HistoryStore};
use fin_agent::llm::{ChatResponse, Message, Role};
use fin_agent::pipeline::TaskContext;

use super::common::{call, scripted, test_config, test_registry};

#[tokio::test]
async fn test_history_reloads_in_order_after_restart() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let model = scripted(vec![
        ChatResponse::tool_calls(vec![call("query_macro_data", json!({"indicator": "GDP"}))]),
        ChatResponse::text("GDP keeps growing."),
    ]);

    {
        let runtime = Runtime::new(config.clone(), model, test_registry(&config));
        runtime.agent(None).unwrap().chat("GDP trend?").await.unwrap();
    }

    // A fresh handle on the same file, as after a restart
    let history = HistoryStore::open_at(config.storage.history_path().unwrap()).unwrap();
    let records = history.records().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.windows(2).all(|w| w[0].id < w[1].id));
    assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let messages = history.load().unwrap();
    assert_eq!(messages[0], Message::user("GDP trend?"));
    let calls = messages[1].tool_calls.as_ref().unwrap();
    assert_eq!(calls[0].name, "query_macro_data");
    assert_eq!(calls[0].arguments["indicator"], "GDP");
    assert_eq!(messages[2].role, Role::Tool);
    assert!(messages[2].tool_calls.is_none());
    assert_eq!(messages[3], Message::assistant("GDP keeps growing."));

    let recent = history.recent(2).unwrap();
    assert_eq!(recent[0].role, Role::Tool);
    assert_eq!(recent[1].content, "GDP keeps growing.");
}

#[test]
fn test_context_upsert_across_handles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pipeline.db");

    let mut ctx = TaskContext::new("Analyze 000001", "qwen2.5:14b");
    ContextStore::open_at(&path).unwrap().save(&ctx).unwrap();

    ctx.messages.push(Message::user("Analyze 000001"));
    ctx.completed_stages.push("DataFetchAgent".to_string());
    ctx.final_report = Some("Flat week.".to_string());
    let second = ContextStore::open_at(&path).unwrap();
    second.save(&ctx).unwrap();

    assert_eq!(second.count().unwrap(), 1);
    assert_eq!(second.load(&ctx.task_id).unwrap(), Some(ctx.clone()));
    assert!(second.load("no-such-task").unwrap().is_none());

    let summaries = second.list(5).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].user_input, "Analyze 000001");
    assert!(summaries[0].has_report);
}

#[tokio::test]
async fn test_clearing_history_keeps_task_contexts() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let model = scripted(vec![
        ChatResponse::text("Hello."),
        ChatResponse::text("Fetched nothing."),
        ChatResponse::text("Nothing happened."),
        ChatResponse::text("Report."),
    ]);
    let runtime = Runtime::new(config.clone(), model, test_registry(&config));

    runtime.agent(None).unwrap().chat("Hi").await.unwrap();
    let ctx = runtime
        .pipeline(None)
        .unwrap()
        .run("Analyze 600036", runtime.pipeline_model())
        .await
        .unwrap();

    assert_eq!(runtime.agent(None).unwrap().clear_history().unwrap(), 2);
    assert_eq!(runtime.history().unwrap().count().unwrap(), 0);

    let stored = runtime.contexts().unwrap().load(&ctx.task_id).unwrap().unwrap();
    assert_eq!(stored.final_report.as_deref(), Some("Report."));
    assert_eq!(stored.model, "qwen2.5:14b");
}
