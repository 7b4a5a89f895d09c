//! Wiring from resolved configuration to the loop and the pipeline

use anyhow::Result;
use std::sync::Arc;

use crate::agent::{Agent, AgentEventSender, AgentSettings, EventSender};
use crate::config::AgentFileConfig;
use crate::db::{ContextStore, HistoryStore, SnapshotStore};
use crate::llm::{ChatModel, OllamaChat};
use crate::pipeline::{Pipeline, RoleSettings};
use crate::tools::{builtin_registry, ToolExecutor, ToolRegistry};

/// Shared pieces every command builds on
pub struct Runtime {
    config: AgentFileConfig,
    model: Arc<dyn ChatModel>,
    executor: ToolExecutor,
}

impl Runtime {
    /// Ollama model and the built-in tools, as configured
    pub fn from_config(config: AgentFileConfig) -> Result<Self> {
        let snapshots = SnapshotStore::open_at(config.storage.snapshot_path()?)?;
        let registry = builtin_registry(&config.tools, snapshots)?;
        let model: Arc<dyn ChatModel> = Arc::new(OllamaChat::new(&config.llm.url));
        Ok(Self::new(config, model, registry))
    }

    /// Runtime over an explicit model and registry
    pub fn new(config: AgentFileConfig, model: Arc<dyn ChatModel>, registry: ToolRegistry) -> Self {
        Self {
            config,
            model,
            executor: ToolExecutor::new(Arc::new(registry)),
        }
    }

    pub fn config(&self) -> &AgentFileConfig {
        &self.config
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn history(&self) -> Result<HistoryStore> {
        HistoryStore::open_at(self.config.storage.history_path()?)
    }

    pub fn contexts(&self) -> Result<ContextStore> {
        ContextStore::open_at(self.config.storage.context_path()?)
    }

    pub fn agent(&self, events: Option<EventSender>) -> Result<Agent> {
        let agent = Agent::new(
            Arc::clone(&self.model),
            self.executor.clone(),
            self.history()?,
            AgentSettings::from_config(&self.config),
        );
        Ok(match events {
            Some(sender) => agent.with_event_sender(sender),
            None => agent,
        })
    }

    pub fn pipeline(&self, events: Option<EventSender>) -> Result<Pipeline> {
        let settings = RoleSettings {
            parse_content_tool_calls: self.config.agent.parse_content_tool_calls,
            fallback_answer: self.config.agent.fallback_answer.clone(),
        };
        let events = events.map(AgentEventSender::new).unwrap_or_default();

        Ok(Pipeline::standard(
            Arc::clone(&self.model),
            &self.executor,
            self.contexts()?,
            settings,
            events,
        ))
    }

    /// Model recorded in new pipeline task contexts
    pub fn pipeline_model(&self) -> &str {
        &self.config.llm.pipeline_model
    }
}
