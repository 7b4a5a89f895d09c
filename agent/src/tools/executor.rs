//! Tool execution
//!
//! `execute` never fails: an unknown or forbidden name, arguments that do
//! not bind, a failing tool body and a malformed call all come back as a
//! `{"error": "..."}` payload the model can read and react to.

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::{validate, ToolRegistry};
use crate::agent::parsers::NormalizedCall;
use crate::llm::ToolSchema;

/// Text handed back to the conversation for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            content: json!({ "error": message }).to_string(),
            is_error: true,
        }
    }
}

/// Runs tools from a registry, optionally limited to an allow-list
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    allowed: Option<HashSet<String>>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            allowed: None,
        }
    }

    /// Executor over the same registry that only runs `names`
    pub fn restricted_to(&self, names: &[&str]) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            allowed: Some(names.iter().map(|n| n.to_string()).collect()),
        }
    }

    pub fn is_permitted(&self, name: &str) -> bool {
        self.allowed.as_ref().map_or(true, |allowed| allowed.contains(name))
    }

    /// Names this executor will run, in registry order
    pub fn tool_names(&self) -> Vec<&str> {
        self.registry
            .names()
            .into_iter()
            .filter(|name| self.is_permitted(name))
            .collect()
    }

    /// Definitions of the tools this executor will run
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.registry
            .specs()
            .filter(|spec| self.is_permitted(&spec.name))
            .map(|spec| spec.to_schema())
            .collect()
    }

    /// Execute one `(name, arguments)` pair
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> ToolResult {
        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = name, "Tool not found");
            return ToolResult::error(format!("execution failed: tool '{}' not found", name));
        };

        if !self.is_permitted(name) {
            tracing::warn!(tool = name, "Tool not permitted for this agent");
            return ToolResult::error(format!(
                "execution failed: tool '{}' is not permitted for this agent",
                name
            ));
        }

        let args = match validate(tool.spec(), arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool arguments rejected");
                return ToolResult::error(format!(
                    "parameter error: tool '{}' rejected the provided arguments: {}",
                    name, e
                ));
            }
        };

        tracing::info!(tool = name, args = ?args.as_map(), "Executing tool");
        let start = Instant::now();
        // A panicking tool body ends its own task, not the turn
        let outcome = tokio::spawn(async move { tool.call(args).await }).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let content = match outcome {
            Ok(Ok(output)) => output.into_content().map_err(|e| e.to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) if e.is_panic() => Err("tool panicked".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match content {
            Ok(content) => {
                tracing::info!(tool = name, duration_ms, len = content.len(), "Tool completed");
                ToolResult::success(content)
            }
            Err(message) => {
                tracing::warn!(tool = name, duration_ms, error = %message, "Tool failed");
                ToolResult::error(format!(
                    "runtime error: tool '{}' execution failed: {}",
                    name, message
                ))
            }
        }
    }

    /// Execute a normalized call, reporting a malformed one as an error payload
    pub async fn execute_call(&self, call: &NormalizedCall) -> ToolResult {
        match call {
            Ok(invocation) => self.execute(&invocation.name, &invocation.arguments).await,
            Err(malformed) => {
                tracing::warn!(raw = %malformed.raw, "{}", malformed);
                ToolResult::error(malformed.to_string())
            }
        }
    }
}
