//! Single-agent loop behavior

use serde_json::{json, Value};
use tempfile::tempdir;

use fin_agent::agent::{event_channel, AgentEvent, TurnOutcome};
use fin_agent::app::Runtime;
use fin_agent::llm::{ChatResponse, Message, MockModel, Role};
use std::sync::Arc;

use super::common::{call, scripted, test_config, test_registry};

fn runtime_with(model: Arc<MockModel>, dir: &tempfile::TempDir) -> Runtime {
    let config = test_config(dir);
    let registry = test_registry(&config);
    Runtime::new(config, model, registry)
}

#[tokio::test]
async fn test_loop_stops_after_five_model_calls() {
    let dir = tempdir().unwrap();
    let model = Arc::new(MockModel::repeating(ChatResponse::tool_calls(vec![call(
        "query_macro_data",
        json!({"indicator": "CPI"}),
    )])));
    let runtime = runtime_with(model.clone(), &dir);
    let agent = runtime.agent(None).unwrap();

    let outcome = agent.chat("Keep checking CPI").await.unwrap();

    assert_eq!(model.call_count(), 5);
    assert_eq!(outcome, TurnOutcome::IterationLimit { iterations: 5 });
    assert!(outcome.message().contains("Iteration limit reached"));

    // user + 5 × (assistant tool-call turn + tool result), no synthetic answer
    let history = agent.history().load().unwrap();
    assert_eq!(history.len(), 11);
    assert_eq!(history[0], Message::user("Keep checking CPI"));
    assert!(history.last().map(|m| m.role) == Some(Role::Tool));
    assert!(history
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .all(Message::has_tool_calls));
}

#[tokio::test]
async fn test_final_answer_on_round_k() {
    let dir = tempdir().unwrap();
    let model = scripted(vec![
        ChatResponse::tool_calls(vec![call(
            "get_stock_zh_a_spot_data",
            json!({"symbol": "600036"}),
        )]),
        ChatResponse::tool_calls(vec![call(
            "visualize_stock_data_trend",
            json!({"symbol": "600036"}),
        )]),
        ChatResponse::text("600036 rose steadily through January."),
    ]);
    let runtime = runtime_with(model.clone(), &dir);
    let agent = runtime.agent(None).unwrap();

    let outcome = agent.chat("Chart 600036 for January").await.unwrap();

    assert_eq!(model.call_count(), 3);
    assert_eq!(
        outcome,
        TurnOutcome::Final {
            content: "600036 rose steadily through January.".to_string(),
            iterations: 3
        }
    );

    // The last request carried every earlier message, tool results included
    let last = model.requests().pop().unwrap();
    let roles: Vec<Role> = last.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant, Role::Tool]
    );
    let fetch: Value = serde_json::from_str(&last.messages[3].content).unwrap();
    assert_eq!(fetch["data_points"], 30);
    let chart: Value = serde_json::from_str(&last.messages[5].content).unwrap();
    assert_eq!(chart["success"], true);

    // Every registered tool was offered
    assert_eq!(last.tools.as_ref().map(Vec::len), Some(3));
    assert!(last.messages[0].content.contains("query_macro_data"));
}

#[tokio::test]
async fn test_results_follow_model_order_and_errors_are_isolated() {
    let dir = tempdir().unwrap();
    let model = scripted(vec![
        ChatResponse::tool_calls(vec![
            call("query_macro_data", json!({"indicator": "GDP"})),
            call("nonexistent_tool", json!({})),
            call("query_macro_data", json!({"indicator": "PPI"})),
            json!({"function": {"name": "query_macro_data", "arguments": "not json"}}),
            json!({"name": "query_macro_data", "arguments": {"indicator": "CPI"}}),
        ]),
        ChatResponse::text("Done."),
    ]);
    let runtime = runtime_with(model.clone(), &dir);
    let agent = runtime.agent(None).unwrap();

    agent.chat("Macro overview").await.unwrap();

    let history = agent.history().load().unwrap();
    let assistant = &history[1];
    assert_eq!(assistant.tool_calls.as_ref().map(Vec::len), Some(5));

    let results: Vec<Value> = history[2..7]
        .iter()
        .map(|m| {
            assert_eq!(m.role, Role::Tool);
            serde_json::from_str(&m.content).unwrap()
        })
        .collect();

    assert_eq!(results[0]["indicator"], "GDP");
    assert_eq!(
        results[1]["error"],
        "execution failed: tool 'nonexistent_tool' not found"
    );
    assert!(results[2]["error"]
        .as_str()
        .unwrap()
        .starts_with("parameter error: tool 'query_macro_data'"));
    assert!(results[3]["error"]
        .as_str()
        .unwrap()
        .starts_with("malformed tool call"));
    assert_eq!(results[4]["indicator"], "CPI");

    assert_eq!(history[7], Message::assistant("Done."));
}

#[tokio::test]
async fn test_history_carries_across_turns() {
    let dir = tempdir().unwrap();
    let model = scripted(vec![
        ChatResponse::text("Hello."),
        ChatResponse::tool_calls(vec![call("query_macro_data", json!({"indicator": "CPI"}))]),
        ChatResponse::text("CPI is stable."),
    ]);
    let runtime = runtime_with(model.clone(), &dir);

    runtime.agent(None).unwrap().chat("Hi").await.unwrap();
    // A fresh agent over the same file sees the first turn
    runtime.agent(None).unwrap().chat("How is CPI?").await.unwrap();

    let second_turn_request = &model.requests()[1];
    let contents: Vec<&str> = second_turn_request
        .messages
        .iter()
        .skip(1)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Hi", "Hello.", "How is CPI?"]);

    let history = runtime.history().unwrap().load().unwrap();
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(history[5].content, "CPI is stable.");
}

#[tokio::test]
async fn test_events_emitted() {
    let dir = tempdir().unwrap();
    let model = scripted(vec![
        ChatResponse::tool_calls(vec![call("nonexistent_tool", json!({}))]),
        ChatResponse::text("Sorry."),
    ]);
    let runtime = runtime_with(model, &dir);
    let (tx, mut rx) = event_channel();
    let agent = runtime.agent(Some(tx)).unwrap();

    agent.chat("Try something").await.unwrap();
    drop(agent);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(AgentEvent::ProcessingStart { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        AgentEvent::ToolComplete { name, is_error: true, .. } if name == "nonexistent_tool"
    )));
    assert!(matches!(
        events.last(),
        Some(AgentEvent::ResponseComplete { iterations: 2, .. })
    ));
}

#[tokio::test]
async fn test_non_array_tool_calls_reported_to_model() {
    let dir = tempdir().unwrap();
    let scalar: ChatResponse = serde_json::from_value(json!({
        "message": {"role": "assistant", "content": "", "tool_calls": "query_macro_data"}
    }))
    .unwrap();
    let model = scripted(vec![scalar, ChatResponse::text("Let me answer without tools.")]);
    let runtime = runtime_with(model.clone(), &dir);
    let agent = runtime.agent(None).unwrap();

    let outcome = agent.chat("CPI?").await.unwrap();
    assert!(outcome.is_final());
    assert_eq!(model.call_count(), 2);

    let history = agent.history().load().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].tool_calls.as_ref().map(Vec::len), Some(1));
    assert_eq!(history[2].role, Role::Tool);
    let result: Value = serde_json::from_str(&history[2].content).unwrap();
    assert!(result["error"]
        .as_str()
        .unwrap()
        .starts_with("malformed tool call: expected an object"));

    // The model saw the error before its final answer
    let second = &model.requests()[1];
    assert_eq!(
        second.messages.last().map(|m| m.content.as_str()),
        Some(history[2].content.as_str())
    );
}
