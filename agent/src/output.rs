//! Plain-text rendering of agent events on stderr

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::agent::{AgentEvent, EventReceiver};

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max.saturating_sub(3)).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Event printer for the CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainOutput {
    /// Show tool results and per-iteration lines
    verbose: bool,
}

impl PlainOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn format_args(&self, args: &Value) -> String {
        match args {
            Value::Object(map) if map.is_empty() => String::new(),
            Value::Null => String::new(),
            _ => truncate(&args.to_string(), 80),
        }
    }

    /// Line to print for an event, if any
    pub fn render(&self, event: &AgentEvent) -> Option<String> {
        match event {
            AgentEvent::ProcessingStart { .. } => None,

            AgentEvent::Iteration { number, tool_calls } => {
                if !self.verbose {
                    return None;
                }
                if *tool_calls == 0 {
                    Some(format!("  [{}] final answer", number))
                } else {
                    Some(format!("  [{}] {} tool call(s)", number, tool_calls))
                }
            }

            AgentEvent::ToolStart { name, arguments } => {
                let args = self.format_args(arguments);
                if args.is_empty() {
                    Some(format!("  -> {}", name))
                } else {
                    Some(format!("  -> {} {}", name, args))
                }
            }

            AgentEvent::ToolComplete {
                name,
                result,
                duration,
                is_error,
            } => {
                let status = if *is_error { "FAIL" } else { "OK" };
                let time = format!("({}ms)", duration.as_millis());
                if self.verbose || *is_error {
                    Some(format!("  {} {} {} {}", status, name, time, truncate(result, 100)))
                } else {
                    Some(format!("  {} {} {}", status, name, time))
                }
            }

            AgentEvent::ResponseComplete {
                iterations,
                total_duration,
                ..
            } => self.verbose.then(|| {
                format!(
                    "  Total {}ms ({} iteration{})",
                    total_duration.as_millis(),
                    iterations,
                    if *iterations == 1 { "" } else { "s" }
                )
            }),

            AgentEvent::StageStart { agent, .. } => Some(format!("== {}", agent)),

            AgentEvent::StageComplete { agent, messages, .. } => self
                .verbose
                .then(|| format!("   {} done ({} messages)", agent, messages)),

            AgentEvent::Error { message } => Some(format!("Warning: {}", message)),
        }
    }

    /// Print events until every sender is dropped
    pub fn spawn(self, mut receiver: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Some(line) = self.render(&event) {
                    eprintln!("{}", line);
                }
            }
        })
    }
}
