use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use std::io::{self, BufRead, Write};

use fin_agent::agent::{event_channel, Agent};
use fin_agent::app::Runtime;
use fin_agent::cli::{Cli, Commands};
use fin_agent::config::AgentFileConfig;
use fin_agent::llm::list_models;
use fin_agent::logging;
use fin_agent::output::PlainOutput;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AgentFileConfig::load_from_path(path)?,
        None => AgentFileConfig::load()?,
    };
    config.apply_overrides(cli.ollama_url.clone(), cli.model.clone());

    if let Some(path) = logging::init(&config.logging, cli.verbose)? {
        tracing::info!(path = %path.display(), "Logging to file");
    }

    let verbose = cli.verbose > 0;
    let runtime = Runtime::from_config(config)?;
    run_command(&runtime, cli.command, verbose).await
}

async fn run_command(runtime: &Runtime, command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Chat => {
            let (tx, rx) = event_channel();
            let printer = PlainOutput::new().with_verbose(verbose).spawn(rx);
            let agent = runtime.agent(Some(tx))?;
            run_interactive(&agent).await?;
            drop(agent);
            let _ = printer.await;
        }
        Commands::Ask { message } => {
            let (tx, rx) = event_channel();
            let printer = PlainOutput::new().with_verbose(verbose).spawn(rx);
            let agent = runtime.agent(Some(tx))?;
            let outcome = agent.chat(&message).await;
            drop(agent);
            let _ = printer.await;
            println!("{}", outcome?.message());
        }
        Commands::Pipeline { input } => {
            let (tx, rx) = event_channel();
            let printer = PlainOutput::new().with_verbose(verbose).spawn(rx);
            let pipeline = runtime.pipeline(Some(tx))?;
            let result = pipeline.run(&input, runtime.pipeline_model()).await;
            drop(pipeline);
            let _ = printer.await;

            let ctx = result?;
            println!("Task: {}\n", ctx.task_id);
            println!("===== Final report =====\n");
            println!("{}", ctx.final_report.as_deref().unwrap_or(""));
        }
        Commands::Context { task_id, list, limit } => {
            run_context(runtime, task_id, list, limit)?;
        }
        Commands::History { limit } => {
            run_history(runtime, limit)?;
        }
        Commands::Clear => {
            let removed = runtime.history()?.clear()?;
            println!("History cleared ({} messages).", removed);
        }
        Commands::Tools => {
            let schemas = runtime.executor().schemas();
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
        Commands::Call { tool, args } => {
            run_call_tool(runtime, &tool, args).await?;
        }
        Commands::Models => {
            run_models(&runtime.config().llm.url).await?;
        }
    }

    Ok(())
}

async fn run_interactive(agent: &Agent) -> Result<()> {
    let history_len = agent.history().count()?;
    println!(
        "Financial agent ({}). Type 'exit' to quit, 'clear' to reset history.",
        agent.settings().model
    );
    println!("{} messages in history.", history_len);
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "exit" {
            break;
        }

        if input == "clear" {
            match agent.clear_history() {
                Ok(_) => println!("History cleared.\n"),
                Err(e) => eprintln!("Error: {:#}", e),
            }
            continue;
        }

        match agent.chat(input).await {
            Ok(outcome) => {
                println!("\n{}\n", outcome.message());
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
            }
        }
    }

    Ok(())
}

fn run_context(runtime: &Runtime, task_id: Option<String>, list: bool, limit: u32) -> Result<()> {
    let store = runtime.contexts()?;

    let task_id = match task_id {
        Some(id) if !list => id,
        _ => {
            let summaries = store.list(limit)?;
            if summaries.is_empty() {
                println!("No stored task contexts.");
            }
            for summary in summaries {
                let status = if summary.has_report { "done" } else { "partial" };
                println!(
                    "{}  {:<7}  {}  {}",
                    summary.task_id, status, summary.updated_at, summary.user_input
                );
            }
            return Ok(());
        }
    };

    let ctx = store
        .load(&task_id)?
        .with_context(|| format!("No task context with id {}", task_id))?;
    println!("{}", serde_json::to_string_pretty(&ctx)?);
    Ok(())
}

fn run_history(runtime: &Runtime, limit: Option<u32>) -> Result<()> {
    let store = runtime.history()?;
    let records = match limit {
        Some(limit) => store.recent(limit)?,
        None => store.records()?,
    };

    for record in records {
        let calls = record
            .tool_calls
            .as_ref()
            .map(|calls| {
                let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
                format!(" [calls: {}]", names.join(", "))
            })
            .unwrap_or_default();
        println!(
            "#{} {} {}:{} {}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.role,
            calls,
            record.content
        );
    }
    Ok(())
}

async fn run_call_tool(runtime: &Runtime, tool_name: &str, args: Option<String>) -> Result<()> {
    let arguments: Map<String, Value> = match args {
        Some(json) => serde_json::from_str(&json).context("--args must be a JSON object")?,
        None => Map::new(),
    };

    println!("Calling tool: {}", tool_name);
    if !arguments.is_empty() {
        println!("Arguments: {}", serde_json::to_string_pretty(&arguments)?);
    }
    println!();

    let result = runtime.executor().execute(tool_name, &arguments).await;

    println!("Result:");
    println!("{}", result.content);
    Ok(())
}

async fn run_models(ollama_url: &str) -> Result<()> {
    let models = list_models(ollama_url).await?;

    if models.is_empty() {
        println!("No models found on {}", ollama_url);
        return Ok(());
    }

    for model in models {
        println!("  {} ({:.1} GB)", model.name, model.size as f64 / 1e9);
    }
    Ok(())
}
