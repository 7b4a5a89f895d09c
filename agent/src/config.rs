//! Configuration loading

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name searched for in the working tree and the global config dir
pub const CONFIG_FILE_NAME: &str = ".fin-agent.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/fin-agent/
///
/// Returns the path if found, None otherwise.
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("fin-agent").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand path: {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

// ============================================================================
// Top-level configuration (.fin-agent.toml)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentFileConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentSectionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Model for the single-agent chat loop
    #[serde(default = "default_model")]
    pub model: String,
    /// Model recorded in new pipeline task contexts
    #[serde(default = "default_pipeline_model")]
    pub pipeline_model: String,
}

/// Single-agent loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSectionConfig {
    /// Model calls allowed per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Replaces the built-in system prompt when set
    pub system_prompt: Option<String>,
    /// Substituted when the model's final answer is empty
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,
    /// Treat a bare JSON tool call in the content as a structured call
    #[serde(default)]
    pub parse_content_tool_calls: bool,
}

/// Database locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_history_db")]
    pub history_db: String,
    #[serde(default = "default_context_db")]
    pub context_db: String,
    #[serde(default = "default_snapshot_db")]
    pub snapshot_db: String,
}

/// Built-in tool settings
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_market_data_url")]
    pub market_data_url: String,
    #[serde(default = "default_macro_data_url")]
    pub macro_data_url: String,
    #[serde(default = "default_chart_dir")]
    pub chart_dir: String,
    /// Window of the moving average drawn on trend charts
    #[serde(default = "default_ma_period")]
    pub ma_period: usize,
    /// Rows returned by the macro indicator tool
    #[serde(default = "default_macro_history_depth")]
    pub macro_history_depth: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Directory for per-run log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_true")]
    pub file: bool,
    /// Write the log file as JSON lines
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "gpt-oss:20b".to_string()
}

fn default_pipeline_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_max_iterations() -> usize {
    5
}

fn default_fallback_answer() -> String {
    "The task is complete, but I have nothing further to add.".to_string()
}

fn default_history_db() -> String {
    "~/.fin-agent/history.db".to_string()
}

fn default_context_db() -> String {
    "~/.fin-agent/pipeline.db".to_string()
}

fn default_snapshot_db() -> String {
    "~/.fin-agent/market.db".to_string()
}

fn default_market_data_url() -> String {
    "https://push2his.eastmoney.com".to_string()
}

fn default_macro_data_url() -> String {
    "https://datacenter-web.eastmoney.com".to_string()
}

fn default_chart_dir() -> String {
    "charts".to_string()
}

fn default_ma_period() -> usize {
    5
}

fn default_macro_history_depth() -> usize {
    5
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_log_dir() -> String {
    "debug".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            pipeline_model: default_pipeline_model(),
        }
    }
}

impl Default for AgentSectionConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt: None,
            fallback_answer: default_fallback_answer(),
            parse_content_tool_calls: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_db: default_history_db(),
            context_db: default_context_db(),
            snapshot_db: default_snapshot_db(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            market_data_url: default_market_data_url(),
            macro_data_url: default_macro_data_url(),
            chart_dir: default_chart_dir(),
            ma_period: default_ma_period(),
            macro_history_depth: default_macro_history_depth(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file: true,
            json: false,
        }
    }
}

impl StorageConfig {
    pub fn history_path(&self) -> Result<PathBuf> {
        expand_path(&self.history_db)
    }

    pub fn context_path(&self) -> Result<PathBuf> {
        expand_path(&self.context_db)
    }

    pub fn snapshot_path(&self) -> Result<PathBuf> {
        expand_path(&self.snapshot_db)
    }
}

impl AgentFileConfig {
    /// Load config from .fin-agent.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .fin-agent.toml
    /// 2. Check ~/.config/fin-agent/.fin-agent.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(CONFIG_FILE_NAME) {
            return Self::load_from_path(&config_path);
        }

        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AgentFileConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides; a model flag applies to whichever command runs
    pub fn apply_overrides(&mut self, ollama_url: Option<String>, model: Option<String>) {
        if let Some(url) = ollama_url {
            self.llm.url = url;
        }
        if let Some(model) = model {
            self.llm.pipeline_model = model.clone();
            self.llm.model = model;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            anyhow::bail!("agent.max_iterations must be at least 1");
        }
        if self.tools.ma_period == 0 {
            anyhow::bail!("tools.ma_period must be at least 1");
        }
        if self.tools.macro_history_depth == 0 {
            anyhow::bail!("tools.macro_history_depth must be at least 1");
        }
        Ok(())
    }
}
