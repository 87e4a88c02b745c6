//! # magent-runtime
//!
//! Model backends for the magent system.
//!
//! ## Providers
//!
//! - **OpenAI-compatible** (default): any `/chat/completions` endpoint with
//!   function calling (OpenAI, vLLM, llama.cpp server, LiteLLM, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use magent_runtime::openai::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tool(DateTimeTool)
//!     .build()?;
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use magent_core::{
    Agent, AgentBuilder, AgentConfig, AgentError, LlmProvider, Message, Result, Role, ThreadId, Tool,
    ToolRegistry,
};
