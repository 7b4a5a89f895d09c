//! Chat API types for Ollama
//!
//! These mirror the `/api/chat` request and response bodies. Tool calls in a
//! response are kept as raw JSON; the agent normalizes them into
//! [`ToolInvocation`]s before anything else looks at them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            _ => anyhow::bail!("Unknown message role: {}", s),
        }
    }
}

/// A tool invocation requested by the model, in canonical form
///
/// Serializes in the Ollama wire shape `{"function": {"name", "arguments"}}`
/// so the same value can be sent back to the model and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireToolCall", from = "WireToolCall")]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

impl From<ToolInvocation> for WireToolCall {
    fn from(call: ToolInvocation) -> Self {
        Self {
            function: WireFunction {
                name: call.name,
                arguments: call.arguments,
            },
        }
    }
}

impl From<WireToolCall> for ToolInvocation {
    fn from(wire: WireToolCall) -> Self {
        Self {
            name: wire.function.name,
            arguments: wire.function.arguments,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolInvocation>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// Assistant turn that requests tools
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// A tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ToolSchemaFunction,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchemaFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Chat request for the Ollama `/api/chat` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSchema>>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            stream: false,
        }
    }

    /// Offer tools to the model; an empty list offers none
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

/// Response from the chat endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
}

/// Message in the response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Kept untyped so an odd shape reaches the parsers instead of failing here
    #[serde(default)]
    pub tool_calls: Option<Value>,
}

impl ResponseMessage {
    /// Raw tool calls exactly as the runtime returned them
    ///
    /// An array is the batch. Null means no calls. Any other value counts as
    /// a single call, so a lone object is accepted and a scalar is reported
    /// back as malformed.
    pub fn raw_tool_calls(&self) -> &[Value] {
        match &self.tool_calls {
            None | Some(Value::Null) => &[],
            Some(Value::Array(calls)) => calls,
            Some(single) => std::slice::from_ref(single),
        }
    }
}

impl ChatResponse {
    /// Plain text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: ResponseMessage {
                role: "assistant".to_string(),
                content: content.into(),
                tool_calls: None,
            },
        }
    }

    /// Response carrying raw tool call objects
    pub fn tool_calls(calls: Vec<Value>) -> Self {
        Self {
            message: ResponseMessage {
                role: "assistant".to_string(),
                content: String::new(),
                tool_calls: Some(Value::Array(calls)),
            },
        }
    }
}
