//! Tool call normalization
//!
//! Runtimes and model versions disagree on the shape of a tool call. Some
//! send `{"function": {"name", "arguments"}}`, some a flat
//! `{"name", "arguments"}`, some `{"tool", "args"}`, and `arguments` may be
//! an object or a JSON-encoded string. Every raw call is converted here into
//! one canonical [`ToolInvocation`]; nothing past this module looks at the
//! raw shape.
//!
//! The registry tries parsers in priority order, making it easy to add new
//! shapes.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm::ToolInvocation;

mod envelope;
mod standard;
mod tool_args;

pub use envelope::EnvelopeParser;
pub use standard::StandardParser;
pub use tool_args::ToolArgsParser;

/// A raw tool call that no parser could turn into `{name, arguments}`
#[derive(Debug, Clone, Error, PartialEq)]
#[error("malformed tool call: {reason}")]
pub struct MalformedToolCall {
    pub reason: String,
    pub raw: Value,
}

impl MalformedToolCall {
    fn new(reason: impl Into<String>, raw: &Value) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.clone(),
        }
    }
}

/// Outcome of normalizing one raw tool call
pub type NormalizedCall = Result<ToolInvocation, MalformedToolCall>;

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for recognizing one tool call shape
pub trait ToolCallParser: Send + Sync {
    /// Attempt to read `raw` as this parser's shape
    ///
    /// Returns `None` if the shape does not match, `Some(Err)` if it matches
    /// but the content is unusable (e.g. arguments that are not an object).
    fn parse(&self, raw: &Value) -> Option<NormalizedCall>;

    /// Parser name for logging/debugging
    fn name(&self) -> &'static str;

    /// Priority (higher = try first)
    fn priority(&self) -> u32;
}

/// Convert an `arguments` value into an argument map
///
/// Objects pass through, strings are decoded as JSON objects, null or absent
/// becomes an empty map.
pub(crate) fn arguments_to_map(value: Option<&Value>, raw: &Value) -> ArgumentMap {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Map::new()),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(MalformedToolCall::new(
                format!("arguments decode to {} instead of an object", type_name(&other)),
                raw,
            )),
            Err(e) => Err(MalformedToolCall::new(
                format!("arguments are not valid JSON: {}", e),
                raw,
            )),
        },
        Some(other) => Err(MalformedToolCall::new(
            format!("arguments must be an object, got {}", type_name(other)),
            raw,
        )),
    }
}

type ArgumentMap = Result<Map<String, Value>, MalformedToolCall>;

/// Shared tail of every parser: validate the name and decode the arguments
pub(crate) fn build_call(
    name: Option<&Value>,
    arguments: Option<&Value>,
    raw: &Value,
) -> NormalizedCall {
    let name = match name {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::String(_)) => return Err(MalformedToolCall::new("tool name is empty", raw)),
        _ => return Err(MalformedToolCall::new("tool name is missing or not a string", raw)),
    };

    let arguments = arguments_to_map(arguments, raw)?;
    Ok(ToolInvocation::new(name, arguments))
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Parser Registry
// ============================================================================

/// Registry of tool call shape parsers
pub struct ToolCallParserRegistry {
    parsers: Vec<Box<dyn ToolCallParser>>,
}

impl Default for ToolCallParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallParserRegistry {
    /// Create a new registry with all built-in parsers
    pub fn new() -> Self {
        let mut parsers: Vec<Box<dyn ToolCallParser>> = vec![
            Box::new(EnvelopeParser),
            Box::new(StandardParser),
            Box::new(ToolArgsParser),
        ];

        parsers.sort_by(|a, b| b.priority().cmp(&a.priority()));

        Self { parsers }
    }

    /// Normalize one raw tool call
    pub fn normalize(&self, raw: &Value) -> NormalizedCall {
        if !raw.is_object() {
            return Err(MalformedToolCall::new(
                format!("expected an object, got {}", type_name(raw)),
                raw,
            ));
        }

        for parser in &self.parsers {
            if let Some(result) = parser.parse(raw) {
                if let Ok(ref call) = result {
                    tracing::trace!(parser = parser.name(), tool = %call.name, "Normalized tool call");
                }
                return result;
            }
        }

        Err(MalformedToolCall::new("unrecognized tool call shape", raw))
    }

    /// Normalize a batch, keeping the model's order and one entry per call
    pub fn normalize_all(&self, raw_calls: &[Value]) -> Vec<NormalizedCall> {
        raw_calls.iter().map(|raw| self.normalize(raw)).collect()
    }

    /// Fallback for models that write a tool call as JSON in the content
    ///
    /// Only a bare JSON object that some parser recognizes counts; anything
    /// else is treated as ordinary text.
    pub fn parse_content(&self, content: &str) -> Option<ToolInvocation> {
        let trimmed = content.trim();
        if !trimmed.starts_with('{') {
            return None;
        }

        let value: Value = serde_json::from_str(trimmed).ok()?;
        self.parsers
            .iter()
            .find_map(|parser| parser.parse(&value))
            .and_then(Result::ok)
    }

    /// Get list of registered parser names (for debugging)
    pub fn parser_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
