//! The three pipeline roles and the agent that plays them

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::TaskContext;
use crate::agent::dispatch;
use crate::agent::parsers::ToolCallParserRegistry;
use crate::agent::AgentEventSender;
use crate::db::ContextStore;
use crate::llm::{ChatModel, ChatRequest, Message};
use crate::prompts;
use crate::tools::chart::TREND_CHART_TOOL;
use crate::tools::macro_data::MACRO_DATA_TOOL;
use crate::tools::market::STOCK_DATA_TOOL;
use crate::tools::ToolExecutor;

/// Closed set of pipeline roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    DataFetch,
    DataProcess,
    Report,
}

impl AgentRole {
    /// Fixed execution order
    pub const ALL: [AgentRole; 3] = [
        AgentRole::DataFetch,
        AgentRole::DataProcess,
        AgentRole::Report,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::DataFetch => "DataFetchAgent",
            AgentRole::DataProcess => "DataProcessAgent",
            AgentRole::Report => "ReportAgent",
        }
    }

    pub fn prompt_template(&self) -> &'static str {
        match self {
            AgentRole::DataFetch => prompts::DATA_FETCH_PROMPT,
            AgentRole::DataProcess => prompts::DATA_PROCESS_PROMPT,
            AgentRole::Report => prompts::REPORT_PROMPT,
        }
    }

    /// Tools this role may see and run
    pub fn allowed_tools(&self) -> &'static [&'static str] {
        match self {
            AgentRole::DataFetch => &[STOCK_DATA_TOOL, MACRO_DATA_TOOL],
            AgentRole::DataProcess => &[TREND_CHART_TOOL],
            AgentRole::Report => &[],
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of the pipeline
///
/// `run` mutates the context and checkpoints it before returning.
#[async_trait]
pub trait PipelineAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &mut TaskContext) -> Result<()>;
}

/// Settings shared by the role agents
#[derive(Debug, Clone, Default)]
pub struct RoleSettings {
    pub parse_content_tool_calls: bool,
    /// Stored as the report when the model returns no text
    pub fallback_answer: String,
}

/// A role played against the model with the role's own prompt and tools
pub struct RoleAgent {
    role: AgentRole,
    model: Arc<dyn ChatModel>,
    executor: ToolExecutor,
    store: ContextStore,
    settings: RoleSettings,
    parser_registry: ToolCallParserRegistry,
    event_sender: AgentEventSender,
}

impl RoleAgent {
    /// `executor` is narrowed to the role's allowed tools
    pub fn new(
        role: AgentRole,
        model: Arc<dyn ChatModel>,
        executor: &ToolExecutor,
        store: ContextStore,
        settings: RoleSettings,
    ) -> Self {
        Self {
            role,
            model,
            executor: executor.restricted_to(role.allowed_tools()),
            store,
            settings,
            parser_registry: ToolCallParserRegistry::new(),
            event_sender: AgentEventSender::none(),
        }
    }

    pub fn with_event_sender(mut self, sender: AgentEventSender) -> Self {
        self.event_sender = sender;
        self
    }

    async fn take_turn(&self, ctx: &mut TaskContext) -> Result<()> {
        if self.role == AgentRole::DataFetch && ctx.messages.is_empty() {
            ctx.messages.push(Message::user(ctx.user_input.clone()));
        }

        let tools = self.executor.schemas();
        let mut messages = vec![Message::system(prompts::render(
            self.role.prompt_template(),
            &tools,
        ))];
        messages.extend(ctx.messages.iter().cloned());

        let request = ChatRequest::new(&ctx.model, messages).with_tools(tools);
        let reply = self.model.chat(&request).await?.message;

        if self.role == AgentRole::Report {
            let report = if reply.content.trim().is_empty() {
                tracing::warn!(task_id = %ctx.task_id, "Empty report, using fallback");
                self.settings.fallback_answer.clone()
            } else {
                reply.content
            };
            ctx.final_report = Some(report);
            return Ok(());
        }

        let calls = dispatch::requested_calls(
            &self.parser_registry,
            &reply,
            self.settings.parse_content_tool_calls,
        );
        tracing::info!(
            task_id = %ctx.task_id,
            agent = self.role.name(),
            tool_calls = calls.len(),
            "Model responded"
        );

        if calls.is_empty() {
            ctx.messages.push(Message::assistant(reply.content));
            return Ok(());
        }

        ctx.messages.push(dispatch::assistant_turn(&reply.content, &calls));
        let results =
            dispatch::run_tool_calls(&self.executor, &calls, &self.event_sender, |_| Ok(())).await?;
        ctx.messages.extend(results);
        Ok(())
    }
}

#[async_trait]
impl PipelineAgent for RoleAgent {
    fn name(&self) -> &str {
        self.role.name()
    }

    async fn run(&self, ctx: &mut TaskContext) -> Result<()> {
        tracing::info!(task_id = %ctx.task_id, agent = self.role.name(), "start");
        self.event_sender.stage_start(&ctx.task_id, self.role.name());

        self.take_turn(ctx).await?;

        ctx.completed_stages.push(self.role.name().to_string());
        self.store.save(ctx)?;

        self.event_sender
            .stage_complete(&ctx.task_id, self.role.name(), ctx.messages.len());
        tracing::info!(task_id = %ctx.task_id, agent = self.role.name(), "finished");
        Ok(())
    }
}
