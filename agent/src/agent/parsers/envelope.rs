//! Function envelope parser
//!
//! Handles the shape Ollama and OpenAI-compatible runtimes emit:
//! `{"type": "function", "function": {"name": "...", "arguments": {...}}}`

use serde_json::Value;

use super::{build_call, NormalizedCall, ToolCallParser};

pub struct EnvelopeParser;

impl ToolCallParser for EnvelopeParser {
    fn parse(&self, raw: &Value) -> Option<NormalizedCall> {
        let function = raw.get("function")?;
        if !function.is_object() {
            return None;
        }

        Some(build_call(
            function.get("name"),
            function.get("arguments"),
            raw,
        ))
    }

    fn name(&self) -> &'static str {
        "EnvelopeParser"
    }

    fn priority(&self) -> u32 {
        100
    }
}
