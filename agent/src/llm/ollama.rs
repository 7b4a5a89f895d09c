//! Ollama chat backend over direct HTTP

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatModel, ChatRequest, ChatResponse};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Information about an available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<ModelInfo>,
}

/// Normalize a configured URL to `scheme://host:port`
fn base_url(ollama_url: &str) -> String {
    let parsed = url::Url::parse(ollama_url)
        .or_else(|_| url::Url::parse(DEFAULT_OLLAMA_URL));

    match parsed {
        Ok(url) => {
            let host = url.host_str().unwrap_or("localhost");
            let port = url.port_or_known_default().unwrap_or(11434);
            format!("{}://{}:{}", url.scheme(), host, port)
        }
        Err(_) => DEFAULT_OLLAMA_URL.to_string(),
    }
}

/// List available models from Ollama
pub async fn list_models(ollama_url: &str) -> Result<Vec<ModelInfo>> {
    let api_url = format!("{}/api/tags", base_url(ollama_url));

    let response: OllamaTagsResponse = reqwest::Client::new()
        .get(&api_url)
        .send()
        .await
        .context("Failed to reach Ollama")?
        .error_for_status()?
        .json()
        .await
        .context("Failed to parse Ollama model list")?;

    Ok(response.models)
}

/// Chat client for the Ollama `/api/chat` endpoint
pub struct OllamaChat {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(ollama_url: &str) -> Self {
        Self {
            base_url: base_url(ollama_url),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat request"
        );

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send HTTP request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let raw_body = response.text().await.context("Failed to get response text")?;
        let parsed: ChatResponse =
            serde_json::from_str(&raw_body).context("Failed to parse Ollama response")?;

        tracing::debug!(
            content_len = parsed.message.content.len(),
            tool_calls = parsed.message.raw_tool_calls().len(),
            "Received chat response"
        );

        Ok(parsed)
    }
}
