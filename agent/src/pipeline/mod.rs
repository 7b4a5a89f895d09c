//! Multi-agent pipeline
//!
//! Data-fetch, data-process and report agents run once each, in that
//! order, over one shared [`TaskContext`]. Each agent checkpoints the
//! context to the [`ContextStore`] when its turn ends. There is no
//! branching and no retry: a later agent sees whatever the earlier ones
//! left, tool errors included.

mod context;
mod roles;

pub use context::TaskContext;
pub use roles::{AgentRole, PipelineAgent, RoleAgent, RoleSettings};

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::agent::AgentEventSender;
use crate::db::ContextStore;
use crate::llm::ChatModel;
use crate::tools::ToolExecutor;

pub struct Pipeline {
    agents: Vec<Box<dyn PipelineAgent>>,
    store: ContextStore,
}

impl Pipeline {
    /// Pipeline over an explicit agent list
    pub fn new(agents: Vec<Box<dyn PipelineAgent>>, store: ContextStore) -> Self {
        Self { agents, store }
    }

    /// The standard data-fetch → data-process → report pipeline
    pub fn standard(
        model: Arc<dyn ChatModel>,
        executor: &ToolExecutor,
        store: ContextStore,
        settings: RoleSettings,
        events: AgentEventSender,
    ) -> Self {
        let agents = AgentRole::ALL
            .iter()
            .map(|role| {
                Box::new(
                    RoleAgent::new(
                        *role,
                        Arc::clone(&model),
                        executor,
                        store.clone(),
                        settings.clone(),
                    )
                    .with_event_sender(events.clone()),
                ) as Box<dyn PipelineAgent>
            })
            .collect();

        Self::new(agents, store)
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Create a task for `user_input`, persist it, and run every agent
    pub async fn run(&self, user_input: &str, model: &str) -> Result<TaskContext> {
        let mut ctx = TaskContext::new(user_input, model);
        self.store.save(&ctx)?;
        tracing::info!(task_id = %ctx.task_id, model, "Pipeline started");

        self.run_context(&mut ctx).await?;

        tracing::info!(task_id = %ctx.task_id, "Pipeline finished");
        Ok(ctx)
    }

    /// Run every agent over an existing context
    pub async fn run_context(&self, ctx: &mut TaskContext) -> Result<()> {
        for agent in &self.agents {
            agent
                .run(ctx)
                .await
                .with_context(|| format!("{} failed for task {}", agent.name(), ctx.task_id))?;
        }
        Ok(())
    }
}
