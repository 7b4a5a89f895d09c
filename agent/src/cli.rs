//! CLI argument definitions

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fin-agent")]
#[command(about = "Tool-calling financial data agent and multi-agent report pipeline on Ollama")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Ollama server URL (default: from .fin-agent.toml or http://localhost:11434)
    #[arg(long, env = "OLLAMA_URL", global = true)]
    pub ollama_url: Option<String>,

    /// Model for the command being run (default: from .fin-agent.toml)
    #[arg(short = 'm', long, env = "OLLAMA_MODEL", global = true)]
    pub model: Option<String>,

    /// Config file to use instead of searching for .fin-agent.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive session ('exit' quits, 'clear' truncates history)
    Chat,
    /// Run one turn of the tool-calling agent
    Ask {
        /// Message to send
        message: String,
    },
    /// Run the data-fetch → data-process → report pipeline once
    Pipeline {
        /// Request for the pipeline
        input: String,
    },
    /// Show a stored task context
    Context {
        /// Task id printed by the pipeline command
        task_id: Option<String>,
        /// List stored task contexts instead
        #[arg(long)]
        list: bool,
        /// Entries to list
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show the conversation history
    History {
        /// Only the most recent N messages
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Truncate the conversation history
    Clear,
    /// Print the tool schema offered to the model
    Tools,
    /// Call a tool directly through the executor
    Call {
        /// Tool name
        tool: String,
        /// Arguments as JSON
        #[arg(long, short)]
        args: Option<String>,
    },
    /// List available models from Ollama
    Models,
}
