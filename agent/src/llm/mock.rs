//! Scripted chat model for tests and offline runs

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{ChatModel, ChatRequest, ChatResponse};

/// A [`ChatModel`] that replays a fixed script of responses
///
/// Every request is recorded so callers can assert on what the model saw.
pub struct MockModel {
    script: Mutex<VecDeque<ChatResponse>>,
    repeat_last: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockModel {
    /// Return each response once, in order; further calls fail
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Return the same response forever
    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([response])),
            repeat_last: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of chat calls made so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let mut script = self
            .script
            .lock()
            .map_err(|_| anyhow::anyhow!("mock model script poisoned"))?;

        if self.repeat_last && script.len() == 1 {
            return script
                .front()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("mock model script exhausted"));
        }

        script
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock model script exhausted"))
    }
}
