//! Flat tool call format parser
//!
//! Handles `{"name": "...", "arguments": {...}}`, which some clients produce
//! after flattening the function envelope.

use serde_json::Value;

use super::{build_call, NormalizedCall, ToolCallParser};

pub struct StandardParser;

impl ToolCallParser for StandardParser {
    fn parse(&self, raw: &Value) -> Option<NormalizedCall> {
        let name = raw.get("name")?;
        // Without "arguments", only a lone "name" key counts as a call
        if raw.get("arguments").is_none() && raw.as_object().is_some_and(|o| o.len() > 1) {
            return None;
        }

        Some(build_call(Some(name), raw.get("arguments"), raw))
    }

    fn name(&self) -> &'static str {
        "StandardParser"
    }

    fn priority(&self) -> u32 {
        90
    }
}
