//! Pipeline runs over a shared task context

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

use fin_agent::db::ContextStore;
use fin_agent::llm::{ChatResponse, Message, Role};
use fin_agent::pipeline::{AgentRole, Pipeline, PipelineAgent, RoleAgent, RoleSettings, TaskContext};

use super::common::{call, scripted, test_config, test_executor};

fn settings() -> RoleSettings {
    RoleSettings {
        parse_content_tool_calls: false,
        fallback_answer: "No report.".to_string(),
    }
}

/// Records the persisted checkpoint after the wrapped agent finishes
struct Checkpointed {
    inner: RoleAgent,
    store: ContextStore,
    seen: Arc<Mutex<Vec<TaskContext>>>,
}

#[async_trait]
impl PipelineAgent for Checkpointed {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn run(&self, ctx: &mut TaskContext) -> Result<()> {
        self.inner.run(ctx).await?;
        let saved = self.store.load(&ctx.task_id)?.expect("checkpoint saved");
        self.seen.lock().unwrap().push(saved);
        Ok(())
    }
}

fn happy_path_script() -> Vec<ChatResponse> {
    vec![
        ChatResponse::tool_calls(vec![
            call(
                "get_stock_zh_a_spot_data",
                json!({"symbol": "600519", "start_date": "20240101", "end_date": "20240131"}),
            ),
            call("query_macro_data", json!({"indicator": "CPI"})),
        ]),
        ChatResponse::tool_calls(vec![call(
            "visualize_stock_data_trend",
            json!({"symbol": "600519"}),
        )]),
        ChatResponse::text("## 600519\nClose rose from 30.5 to 45.0 while CPI held near 100."),
    ]
}

#[tokio::test]
async fn test_pipeline_happy_path() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let executor = test_executor(&config);
    let store = ContextStore::open_at(config.storage.context_path().unwrap()).unwrap();
    let model = scripted(happy_path_script());

    let pipeline = Pipeline::standard(
        model.clone(),
        &executor,
        store.clone(),
        settings(),
        Default::default(),
    );
    assert_eq!(
        pipeline.agent_names(),
        vec!["DataFetchAgent", "DataProcessAgent", "ReportAgent"]
    );

    let ctx = pipeline
        .run("Analyze 600519 for January 2024", "qwen2.5:14b")
        .await
        .unwrap();

    assert_eq!(model.call_count(), 3);
    assert_eq!(
        ctx.completed_stages,
        vec!["DataFetchAgent", "DataProcessAgent", "ReportAgent"]
    );
    assert!(ctx.final_report.as_deref().unwrap().starts_with("## 600519"));

    // user, fetch turn + 2 results, process turn + 1 result; the report is not a message
    let roles: Vec<Role> = ctx.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant, Role::Tool]
    );
    assert_eq!(ctx.messages[0], Message::user("Analyze 600519 for January 2024"));

    let chart: Value = serde_json::from_str(&ctx.messages[5].content).unwrap();
    assert_eq!(chart["success"], true);
    assert!(std::path::Path::new(chart["path"].as_str().unwrap()).exists());

    let stored = store.load(&ctx.task_id).unwrap().unwrap();
    assert_eq!(stored, ctx);
    assert_eq!(store.count().unwrap(), 1);

    // Every request carries the task model and the role's own tools
    let requests = model.requests();
    assert!(requests.iter().all(|r| r.model == "qwen2.5:14b"));
    let offered = |i: usize| -> Vec<String> {
        requests[i]
            .tools
            .iter()
            .flatten()
            .map(|t| t.function.name.clone())
            .collect()
    };
    assert_eq!(offered(0), vec!["get_stock_zh_a_spot_data", "query_macro_data"]);
    assert_eq!(offered(1), vec!["visualize_stock_data_trend"]);
    assert!(requests[2].tools.is_none());

    // The report agent sees everything the earlier agents produced
    assert_eq!(requests[2].messages.len(), 1 + ctx.messages.len());
    assert_eq!(requests[2].messages[0].role, Role::System);
}

#[tokio::test]
async fn test_checkpoints_grow_and_report_comes_last() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let executor = test_executor(&config);
    let store = ContextStore::open_at(config.storage.context_path().unwrap()).unwrap();
    let model = scripted(happy_path_script());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let agents: Vec<Box<dyn PipelineAgent>> = AgentRole::ALL
        .iter()
        .map(|role| {
            Box::new(Checkpointed {
                inner: RoleAgent::new(*role, model.clone(), &executor, store.clone(), settings()),
                store: store.clone(),
                seen: Arc::clone(&seen),
            }) as Box<dyn PipelineAgent>
        })
        .collect();
    let pipeline = Pipeline::new(agents, store.clone());

    let ctx = pipeline.run("Analyze 600519", "qwen2.5:14b").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    for checkpoint in seen.iter() {
        assert_eq!(checkpoint.task_id, ctx.task_id);
    }

    assert_eq!(seen[0].completed_stages, vec!["DataFetchAgent"]);
    assert_eq!(seen[1].completed_stages, vec!["DataFetchAgent", "DataProcessAgent"]);
    assert_eq!(seen[2].last_stage(), Some("ReportAgent"));

    assert!(seen[0].final_report.is_none());
    assert!(seen[1].final_report.is_none());
    assert!(seen[2].final_report.is_some());

    // Earlier messages are never rewritten
    for pair in seen.windows(2) {
        let (before, after) = (&pair[0].messages, &pair[1].messages);
        assert!(after.len() >= before.len());
        assert_eq!(&after[..before.len()], &before[..]);
    }
}

#[tokio::test]
async fn test_disallowed_tool_is_refused() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let executor = test_executor(&config);
    let store = ContextStore::open_at(config.storage.context_path().unwrap()).unwrap();
    let model = scripted(vec![
        // Data-fetch agent asks for the chart tool, which belongs to data-process
        ChatResponse::tool_calls(vec![call("visualize_stock_data_trend", json!({}))]),
        ChatResponse::text("Nothing to chart."),
        ChatResponse::text(""),
    ]);

    let pipeline = Pipeline::standard(model, &executor, store, settings(), Default::default());
    let ctx = pipeline.run("Chart something", "m").await.unwrap();

    let result: Value = serde_json::from_str(&ctx.messages[2].content).unwrap();
    assert_eq!(
        result["error"],
        "execution failed: tool 'visualize_stock_data_trend' is not permitted for this agent"
    );

    // The process agent answered in text, and the empty report fell back
    assert_eq!(ctx.messages[3], Message::assistant("Nothing to chart."));
    assert_eq!(ctx.final_report.as_deref(), Some("No report."));
    assert!(ctx.is_complete());
}

#[tokio::test]
async fn test_failing_stage_keeps_earlier_checkpoint() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let executor = test_executor(&config);
    let store = ContextStore::open_at(config.storage.context_path().unwrap()).unwrap();
    // Script runs out after the first agent
    let model = scripted(vec![ChatResponse::text("I will not call tools.")]);

    let pipeline =
        Pipeline::standard(model, &executor, store.clone(), settings(), Default::default());
    let err = pipeline.run("Analyze 000001", "m").await.unwrap_err();
    assert!(format!("{:#}", err).contains("DataProcessAgent failed"));

    let summaries = store.list(10).unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(!summaries[0].has_report);

    let saved = store.load(&summaries[0].task_id).unwrap().unwrap();
    assert_eq!(saved.completed_stages, vec!["DataFetchAgent"]);
    assert_eq!(saved.messages.len(), 2);
}
