//! One round of tool calls: normalize → execute → tool messages
//!
//! Both the chat loop and the pipeline agents go through here, so the
//! one-result-per-invocation rule is enforced in a single place.

use anyhow::Result;
use serde_json::{Map, Value};
use std::time::Instant;

use super::events::AgentEventSender;
use super::parsers::{MalformedToolCall, NormalizedCall, ToolCallParserRegistry};
use crate::llm::{Message, ResponseMessage, ToolInvocation};
use crate::tools::ToolExecutor;

/// Tool calls requested by a response, in the model's order
///
/// Structured calls win. When there are none and `parse_content` is set, a
/// bare JSON tool call in the content is taken as a single invocation.
pub fn requested_calls(
    parsers: &ToolCallParserRegistry,
    response: &ResponseMessage,
    parse_content: bool,
) -> Vec<NormalizedCall> {
    let raw = response.raw_tool_calls();
    if !raw.is_empty() {
        return parsers.normalize_all(raw);
    }

    if parse_content {
        if let Some(call) = parsers.parse_content(&response.content) {
            tracing::info!(tool = %call.name, "Tool call recovered from message content");
            return vec![Ok(call)];
        }
    }

    Vec::new()
}

/// Stand-in recorded on the assistant turn for a call that did not normalize
fn placeholder(malformed: &MalformedToolCall) -> ToolInvocation {
    let raw = &malformed.raw;
    let name = raw
        .pointer("/function/name")
        .or_else(|| raw.get("name"))
        .or_else(|| raw.get("tool"))
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("unknown");
    ToolInvocation::new(name, Map::new())
}

/// Assistant message recording the calls of this round
pub fn assistant_turn(content: &str, calls: &[NormalizedCall]) -> Message {
    let invocations = calls
        .iter()
        .map(|call| match call {
            Ok(invocation) => invocation.clone(),
            Err(malformed) => placeholder(malformed),
        })
        .collect();
    Message::assistant_tool_calls(content, invocations)
}

/// Execute `calls` strictly in order, one `tool` message per call
///
/// `record` sees every tool message as soon as it exists; an error from it
/// stops the round. A failing tool never does.
pub async fn run_tool_calls<F>(
    executor: &ToolExecutor,
    calls: &[NormalizedCall],
    events: &AgentEventSender,
    mut record: F,
) -> Result<Vec<Message>>
where
    F: FnMut(&Message) -> Result<()>,
{
    let mut results = Vec::with_capacity(calls.len());

    for call in calls {
        let (name, arguments) = match call {
            Ok(invocation) => (
                invocation.name.as_str(),
                Value::Object(invocation.arguments.clone()),
            ),
            Err(malformed) => ("malformed", malformed.raw.clone()),
        };
        events.tool_start(name, &arguments);

        let start = Instant::now();
        let result = executor.execute_call(call).await;
        events.tool_complete(name, &result.content, start.elapsed(), result.is_error);

        let message = Message::tool(result.content);
        record(&message)?;
        results.push(message);
    }

    Ok(results)
}
