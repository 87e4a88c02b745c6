//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Backend rejected the request (non-2xx status, API error body)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Backend could not be reached
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Backend answered with a body that could not be understood
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// A backend round trip exceeded the configured deadline
    #[error("Provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Maximum model calls reached in the tool-call loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments could not be decoded
    #[error("Invalid arguments for tool `{tool}`: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Tool execution failed
    #[error("Tool `{tool}` failed: {reason}")]
    ToolExecution { tool: String, reason: String },

    /// Tool schema could not be derived
    #[error("Schema derivation error: {0}")]
    SchemaDerivation(String),

    /// Two registered tools share a name
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    /// A message could not be converted from its wire form
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::Timeout(_)
        )
    }

    /// True for failures that happened at the model backend boundary
    pub const fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::Provider(_)
                | Self::ProviderUnavailable(_)
                | Self::InvalidResponse(_)
                | Self::Timeout(_)
        )
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Timeout(_) => "TIMEOUT",
            Self::MaxIterations(_) => "MAX_ITERATIONS",
            Self::ToolNotFound(_) => "TOOL_NOT_FOUND",
            Self::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            Self::ToolExecution { .. } => "TOOL_ERROR",
            Self::SchemaDerivation(_) => "SCHEMA_ERROR",
            Self::DuplicateTool(_) => "DUPLICATE_TOOL",
            Self::InvalidMessage(_) => "INVALID_MESSAGE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Other(_) => "AGENT_ERROR",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            Self::InvalidResponse(_) => "The AI service returned a response that could not be read.".into(),
            Self::Timeout(_) => "The AI service took too long to respond.".into(),
            Self::MaxIterations(_) => "The request took too many tool calls to resolve. Please try a simpler query.".into(),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::InvalidArguments { reason, .. } => format!("Invalid tool input: {reason}"),
            Self::ToolExecution { reason, .. } => format!("Tool error: {reason}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
