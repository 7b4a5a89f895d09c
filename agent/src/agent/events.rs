//! Progress events from the chat loop and the pipeline
//!
//! Purely informational: the CLI prints them on stderr, and a dropped or
//! missing receiver changes nothing about a turn.

use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    ProcessingStart {
        message: String,
    },
    ToolStart {
        name: String,
        arguments: Value,
    },
    ToolComplete {
        name: String,
        /// Result payload sent back to the model, error payloads included
        result: String,
        duration: Duration,
        is_error: bool,
    },
    /// One model call finished; `tool_calls` is zero on the final answer
    Iteration {
        number: usize,
        tool_calls: usize,
    },
    ResponseComplete {
        content: String,
        iterations: usize,
        total_duration: Duration,
    },
    StageStart {
        task_id: String,
        agent: String,
    },
    /// The agent's checkpoint is saved
    StageComplete {
        task_id: String,
        agent: String,
        messages: usize,
    },
    Error {
        message: String,
    },
}

pub type EventSender = mpsc::UnboundedSender<AgentEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AgentEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Optional sender shared by the loop, the dispatcher and the pipeline agents
#[derive(Clone, Default)]
pub struct AgentEventSender {
    sender: Option<EventSender>,
}

impl AgentEventSender {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Discards every event
    pub fn none() -> Self {
        Self::default()
    }

    fn send(&self, event: AgentEvent) {
        if let Some(sender) = &self.sender {
            // receiver gone means nobody is watching
            let _ = sender.send(event);
        }
    }

    pub fn processing_start(&self, message: &str) {
        self.send(AgentEvent::ProcessingStart {
            message: message.to_string(),
        });
    }

    pub fn tool_start(&self, name: &str, arguments: &Value) {
        self.send(AgentEvent::ToolStart {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
    }

    pub fn tool_complete(&self, name: &str, result: &str, duration: Duration, is_error: bool) {
        self.send(AgentEvent::ToolComplete {
            name: name.to_string(),
            result: result.to_string(),
            duration,
            is_error,
        });
    }

    pub fn iteration(&self, number: usize, tool_calls: usize) {
        self.send(AgentEvent::Iteration { number, tool_calls });
    }

    pub fn response_complete(&self, content: &str, iterations: usize, total_duration: Duration) {
        self.send(AgentEvent::ResponseComplete {
            content: content.to_string(),
            iterations,
            total_duration,
        });
    }

    pub fn stage_start(&self, task_id: &str, agent: &str) {
        self.send(AgentEvent::StageStart {
            task_id: task_id.to_string(),
            agent: agent.to_string(),
        });
    }

    pub fn stage_complete(&self, task_id: &str, agent: &str, messages: usize) {
        self.send(AgentEvent::StageComplete {
            task_id: task_id.to_string(),
            agent: agent.to_string(),
            messages,
        });
    }

    pub fn error(&self, message: &str) {
        self.send(AgentEvent::Error {
            message: message.to_string(),
        });
    }
}
