//! Single-agent tool-calling loop
//!
//! One user turn:
//! 1. Load the persisted history, prefix the system prompt, append and
//!    persist the user message
//! 2. Ask the model, offering every registered tool
//! 3. If it requests tools, persist its turn, run the tools in order,
//!    persist each result, and ask again
//! 4. A response without tool calls is the final answer
//!
//! The number of model calls per turn is bounded; running out ends the turn
//! with a notice and nothing further is persisted.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::config::AgentFileConfig;
use crate::db::HistoryStore;
use crate::llm::{ChatModel, ChatRequest, Message};
use crate::prompts;
use crate::tools::ToolExecutor;

pub mod dispatch;
pub mod events;
pub mod parsers;

pub use events::{event_channel, AgentEvent, AgentEventSender, EventReceiver, EventSender};
use parsers::ToolCallParserRegistry;

/// Loop settings resolved from configuration and CLI flags
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub max_iterations: usize,
    /// Template; `{tools}` is replaced with the offered tool schema
    pub system_prompt: String,
    pub fallback_answer: String,
    pub parse_content_tool_calls: bool,
}

impl AgentSettings {
    pub fn from_config(config: &AgentFileConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            max_iterations: config.agent.max_iterations,
            system_prompt: config
                .agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| prompts::ASSISTANT_PROMPT.to_string()),
            fallback_answer: config.agent.fallback_answer.clone(),
            parse_content_tool_calls: config.agent.parse_content_tool_calls,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AgentFileConfig::default())
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model answered without requesting tools
    Final { content: String, iterations: usize },
    /// Every allowed model call requested tools
    IterationLimit { iterations: usize },
}

impl TurnOutcome {
    /// Text to show the user
    pub fn message(&self) -> String {
        match self {
            TurnOutcome::Final { content, .. } => content.clone(),
            TurnOutcome::IterationLimit { iterations } => format!(
                "Iteration limit reached: no final answer after {} model calls.",
                iterations
            ),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, TurnOutcome::Final { .. })
    }

    pub fn iterations(&self) -> usize {
        match self {
            TurnOutcome::Final { iterations, .. } | TurnOutcome::IterationLimit { iterations } => {
                *iterations
            }
        }
    }
}

/// Tool-using chat agent over the global conversation history
pub struct Agent {
    model: Arc<dyn ChatModel>,
    executor: ToolExecutor,
    history: HistoryStore,
    settings: AgentSettings,
    parser_registry: ToolCallParserRegistry,
    event_sender: AgentEventSender,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        executor: ToolExecutor,
        history: HistoryStore,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            executor,
            history,
            settings,
            parser_registry: ToolCallParserRegistry::new(),
            event_sender: AgentEventSender::none(),
        }
    }

    /// Set event sender for real-time event visibility
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = AgentEventSender::new(sender);
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Truncate the persisted history
    pub fn clear_history(&self) -> Result<usize> {
        self.history.clear()
    }

    /// Run one user turn
    pub async fn chat(&self, user_message: &str) -> Result<TurnOutcome> {
        let total_start = Instant::now();
        self.event_sender.processing_start(user_message);

        let result = self.run_turn(user_message, total_start).await;
        if let Err(ref e) = result {
            self.event_sender.error(&format!("{:#}", e));
        }
        result
    }

    async fn run_turn(&self, user_message: &str, total_start: Instant) -> Result<TurnOutcome> {
        let tools = self.executor.schemas();
        let system = prompts::render(&self.settings.system_prompt, &tools);

        let mut messages = vec![Message::system(system)];
        messages.extend(self.history.load()?);

        let user = Message::user(user_message);
        self.history.append(&user)?;
        messages.push(user);

        for iteration in 1..=self.settings.max_iterations {
            tracing::debug!(iteration, messages = messages.len(), "Agent iteration");

            let request = ChatRequest::new(&self.settings.model, messages.clone())
                .with_tools(tools.clone());
            let model_start = Instant::now();
            let response = self.model.chat(&request).await?;
            let reply = response.message;

            let calls = dispatch::requested_calls(
                &self.parser_registry,
                &reply,
                self.settings.parse_content_tool_calls,
            );
            tracing::info!(
                iteration,
                tool_calls = calls.len(),
                elapsed_ms = model_start.elapsed().as_millis() as u64,
                "Model responded"
            );
            self.event_sender.iteration(iteration, calls.len());

            if calls.is_empty() {
                let content = if reply.content.trim().is_empty() {
                    tracing::warn!(iteration, "Empty final answer, using fallback");
                    self.settings.fallback_answer.clone()
                } else {
                    reply.content
                };

                self.history.append(&Message::assistant(content.clone()))?;
                self.event_sender
                    .response_complete(&content, iteration, total_start.elapsed());

                return Ok(TurnOutcome::Final {
                    content,
                    iterations: iteration,
                });
            }

            let assistant = dispatch::assistant_turn(&reply.content, &calls);
            self.history.append(&assistant)?;
            messages.push(assistant);

            let results = dispatch::run_tool_calls(&self.executor, &calls, &self.event_sender, |m| {
                self.history.append(m).map(|_| ())
            })
            .await?;
            messages.extend(results);
        }

        let iterations = self.settings.max_iterations;
        tracing::warn!(iterations, "Agent reached max iterations without a final answer");
        let outcome = TurnOutcome::IterationLimit { iterations };
        self.event_sender.error(&outcome.message());
        Ok(outcome)
    }
}
