//! System prompts
//!
//! Templates carry a `{tools}` placeholder that is replaced with the
//! pretty-printed schema of the tools the agent is actually offered.

mod assistant;
mod data_fetch;
mod data_process;
mod report;

pub use assistant::ASSISTANT_PROMPT;
pub use data_fetch::DATA_FETCH_PROMPT;
pub use data_process::DATA_PROCESS_PROMPT;
pub use report::REPORT_PROMPT;

use crate::llm::ToolSchema;

const TOOLS_PLACEHOLDER: &str = "{tools}";

/// Substitute the tool definitions into a prompt template
pub fn render(template: &str, tools: &[ToolSchema]) -> String {
    if !template.contains(TOOLS_PLACEHOLDER) {
        return template.to_string();
    }

    let schema = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    template.replace(TOOLS_PLACEHOLDER, &schema)
}
