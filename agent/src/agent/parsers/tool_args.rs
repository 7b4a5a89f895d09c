//! Alternative tool call format parser (tool/args)
//!
//! Handles format: {"tool": "...", "args": {...}}
//! Some models use this alternative naming convention.

use serde_json::Value;

use super::{build_call, NormalizedCall, ToolCallParser};

pub struct ToolArgsParser;

impl ToolCallParser for ToolArgsParser {
    fn parse(&self, raw: &Value) -> Option<NormalizedCall> {
        let tool = raw.get("tool")?;
        Some(build_call(Some(tool), raw.get("args"), raw))
    }

    fn name(&self) -> &'static str {
        "ToolArgsParser"
    }

    fn priority(&self) -> u32 {
        50 // Lower priority - alternative format
    }
}
