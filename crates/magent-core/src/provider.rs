//! LLM Provider Strategy Pattern
//!
//! Defines the interface of the model backend the agent talks to. A backend
//! takes the working transcript plus the tool schemas and answers with either
//! a terminal [`Message::Assistant`] or a [`Message::ToolCall`]. Transport
//! failures, bad statuses and unreadable bodies surface as errors.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use magent_core::provider::LlmProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//!
//! // Use through the trait
//! let reply = provider.complete(&messages, registry.schemas()).await?;
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;
use crate::schema::ToolSchema;

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs (e.g., "openai")
    fn name(&self) -> &str;

    /// Send one chat request.
    ///
    /// Must return `Message::Assistant` or `Message::ToolCall`.
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
