//! Conversation Messages
//!
//! One value per conversation turn, tagged by role. Messages serialize to the
//! chat-completions wire shape: `role` is one of `user`, `assistant`, `tool`,
//! `system`, `content` is a string or `null`, tool requests carry a
//! `tool_calls` array whose `arguments` are a JSON-encoded string, and tool
//! results carry the `tool_call_id` they answer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Kind of a tool call; the chat-completions API only knows functions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallKind {
    #[default]
    Function,
}

/// Function name plus JSON-encoded argument object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// JSON text of the argument object, not a nested object
    pub arguments: String,
}

/// A single tool invocation requested by the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: ToolCallKind,

    pub function: FunctionCall,
}

impl ToolCallRequest {
    /// Build a request, encoding `arguments` to its string form
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self {
            id: id.into(),
            kind: ToolCallKind::Function,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }

    /// Build a request from already-encoded argument text
    pub fn raw(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ToolCallKind::Function,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Requested function name
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Decode the argument text into a JSON object.
    ///
    /// Blank argument text is read as `{}`. Anything that is not a JSON
    /// object is an `InvalidArguments` error.
    pub fn parse_arguments(&self) -> Result<Map<String, Value>> {
        let text = self.function.arguments.trim();
        if text.is_empty() {
            return Ok(Map::new());
        }

        let invalid = |reason: String| AgentError::InvalidArguments {
            tool: self.function.name.clone(),
            reason,
        };

        match serde_json::from_str::<Value>(text).map_err(|e| invalid(e.to_string()))? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(invalid(format!("expected a JSON object, got `{other}`"))),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub enum Message {
    /// Fixed instructions, set once when the agent is built
    System { content: String },

    /// One per user turn
    Human { content: String },

    /// Terminal model output for a turn
    Assistant { content: String },

    /// Non-terminal model output asking for tool execution
    ToolCall {
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },

    /// Output of one tool call, paired to its request by id
    ToolResult { content: String, tool_call_id: String },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::Human { content: content.into() }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant { content: content.into() }
    }

    /// Create a tool request message
    pub const fn tool_call(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::ToolCall { content, tool_calls }
    }

    /// Create a tool result message
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::ToolResult {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::Human { .. } => Role::User,
            Self::Assistant { .. } | Self::ToolCall { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::Tool,
        }
    }

    /// Text content, `None` only for a tool request without text
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content }
            | Self::Human { content }
            | Self::Assistant { content }
            | Self::ToolResult { content, .. } => Some(content.as_str()),
            Self::ToolCall { content, .. } => content.as_deref(),
        }
    }

    /// Pending tool calls; empty for every variant but `ToolCall`
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::ToolCall { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
            _ => None,
        }
    }

    /// True for an assistant message with no pending tool calls
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Assistant { .. })
    }
}

/// Flat record matching the chat-completions message object
#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: Role,

    #[serde(default)]
    content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallRequest>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let role = message.role();
        match message {
            Message::System { content }
            | Message::Human { content }
            | Message::Assistant { content } => Self {
                role,
                content: Some(content),
                tool_calls: None,
                tool_call_id: None,
            },
            Message::ToolCall { content, tool_calls } => Self {
                role,
                content,
                tool_calls: Some(tool_calls),
                tool_call_id: None,
            },
            Message::ToolResult { content, tool_call_id } => Self {
                role,
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_call_id),
            },
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = AgentError;

    fn try_from(wire: WireMessage) -> Result<Self> {
        let WireMessage {
            role,
            content,
            tool_calls,
            tool_call_id,
        } = wire;

        match (role, tool_calls) {
            (Role::Assistant, Some(tool_calls)) => Ok(Self::ToolCall { content, tool_calls }),
            (Role::Assistant, None) => Ok(Self::assistant(content.unwrap_or_default())),
            (Role::Tool, _) => {
                let tool_call_id = tool_call_id.ok_or_else(|| {
                    AgentError::InvalidMessage("tool message without `tool_call_id`".into())
                })?;
                Ok(Self::tool_result(content.unwrap_or_default(), tool_call_id))
            }
            (Role::System, _) => Ok(Self::system(content.unwrap_or_default())),
            (Role::User, _) => Ok(Self::user(content.unwrap_or_default())),
        }
    }
}
