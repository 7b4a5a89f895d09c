//! Shared state threaded through one pipeline run

use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// Task context, checkpointed after every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub task_id: String,
    pub user_input: String,
    pub model: String,
    pub messages: Vec<Message>,
    pub final_report: Option<String>,
    /// Agents that finished, in order
    #[serde(default)]
    pub completed_stages: Vec<String>,
}

impl TaskContext {
    /// Fresh context with a new unique id and no messages
    pub fn new(user_input: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            user_input: user_input.into(),
            model: model.into(),
            messages: Vec::new(),
            final_report: None,
            completed_stages: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.final_report.is_some()
    }

    pub fn last_stage(&self) -> Option<&str> {
        self.completed_stages.last().map(String::as_str)
    }
}
