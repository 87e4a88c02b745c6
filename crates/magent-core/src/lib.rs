//! # magent-core
//!
//! Minimal orchestration of a tool-using conversation with a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │ ToolRegistry │  │   LlmProvider       │  │
//! │  │    Loop     │──│  + schemas   │──│   (Strategy)        │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌─────────────┐                                             │
//! │  │ ThreadStore │                                             │
//! │  └─────────────┘                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Agent::invoke` assembles the transcript from the thread store, calls the
//! provider, executes requested tools sequentially and loops until the model
//! answers. Completed turns are appended to the thread; failed turns are not.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod schema;
pub mod thread;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{FunctionCall, Message, Role, ToolCallRequest};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder, AgentConfig, ToolFailurePolicy};
pub use schema::{ParamType, Signature, ToolSchema};
pub use thread::{ThreadId, ThreadKey, ThreadStore};
pub use tool::{DateTimeTool, FunctionTool, Tool, ToolRegistry};
