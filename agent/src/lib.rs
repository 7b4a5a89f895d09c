//! Tool-calling financial data agent on Ollama
//!
//! Two ways to drive the model:
//! - [`agent::Agent`]: a bounded chat loop over one global, persisted history
//! - [`pipeline::Pipeline`]: data-fetch, data-process and report agents run in
//!   sequence over a task context checkpointed after each agent

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod llm;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod tools;
