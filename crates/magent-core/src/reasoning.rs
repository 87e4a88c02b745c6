//! Reasoning Loop
//!
//! Drives one conversational turn: assemble the transcript from thread
//! history, call the model, run any tools it asks for, feed the results back
//! and repeat until the model answers without tool calls. Only a completed
//! turn is written to the thread store; every failure leaves history as it
//! was.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCallRequest};
use crate::provider::LlmProvider;
use crate::thread::{ThreadId, ThreadKey, ThreadStore};
use crate::tool::{Tool, ToolRegistry};

/// What to send back for a tool call that could not be answered
/// (unknown tool, malformed arguments, tool error)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolFailurePolicy {
    /// Answer with a `ToolResult` whose content starts with `Error:`
    #[default]
    ReportError,

    /// Leave the call unanswered and continue with the other results
    Omit,
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt, prepended to every transcript and never stored.
    /// A blank prompt means no system message.
    pub system_prompt: Option<String>,

    /// Maximum model calls per turn before giving up
    pub max_iterations: usize,

    /// Deadline for a single model call or tool call
    pub call_timeout: Option<Duration>,

    pub tool_failure: ToolFailurePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 10,
            call_timeout: None,
            tool_failure: ToolFailurePolicy::default(),
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    threads: ThreadStore,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        let system = config
            .system_prompt
            .clone()
            .filter(|prompt| !prompt.trim().is_empty())
            .map(Message::system);
        Self {
            provider,
            tools,
            threads: ThreadStore::new(system),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Run one turn and return the model's final answer.
    ///
    /// Without a thread id the reserved default thread is used. On success
    /// the human message, every tool request and result, and the answer are
    /// appended to the thread. On any error nothing is stored.
    pub async fn invoke(&self, prompt: impl Into<String>, thread_id: Option<&ThreadId>) -> Result<Message> {
        let key = ThreadKey::from(thread_id);

        let mut transcript: Vec<Message> = self.threads.system_message().cloned().into_iter().collect();
        transcript.extend(self.threads.history(&key));
        let turn_start = transcript.len();
        transcript.push(Message::user(prompt));

        let mut iterations = 0;

        loop {
            iterations += 1;

            if iterations > self.config.max_iterations {
                tracing::warn!(
                    thread = %key,
                    max_iterations = self.config.max_iterations,
                    "Tool-call loop did not settle; discarding turn"
                );
                return Err(AgentError::MaxIterations(self.config.max_iterations));
            }

            tracing::debug!(
                thread = %key,
                iteration = iterations,
                messages = transcript.len(),
                provider = self.provider.name(),
                "Calling model"
            );

            let reply = self.call_model(&transcript).await.inspect_err(|e| {
                tracing::error!(thread = %key, iteration = iterations, "Model call failed: {}", e);
            })?;

            match reply {
                Message::ToolCall { .. } => {
                    let results = self.execute_tool_calls(reply.tool_calls()).await;
                    transcript.push(reply);
                    transcript.extend(results);
                }
                Message::Assistant { .. } => {
                    let mut turn = transcript.split_off(turn_start);
                    turn.push(reply.clone());
                    tracing::info!(
                        thread = %key,
                        iterations,
                        stored = turn.len(),
                        "Turn complete"
                    );
                    self.threads.append(&key, turn);
                    return Ok(reply);
                }
                other => {
                    return Err(AgentError::InvalidResponse(format!(
                        "model returned a `{}` message",
                        other.role()
                    )));
                }
            }
        }
    }

    async fn call_model(&self, transcript: &[Message]) -> Result<Message> {
        let call = self.provider.complete(transcript, self.tools.schemas());
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => call.await,
        }
    }

    async fn run_tool(&self, call: &ToolCallRequest) -> Result<String> {
        let run = self.tools.execute(call);
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| AgentError::ToolExecution {
                    tool: call.name().to_string(),
                    reason: format!("timed out after {limit:?}"),
                })?,
            None => run.await,
        }
    }

    /// Run requested tools one after another, in request order
    async fn execute_tool_calls(&self, calls: &[ToolCallRequest]) -> Vec<Message> {
        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            if !seen.insert(call.id.as_str()) {
                tracing::warn!(tool = %call.name(), id = %call.id, "Duplicate tool call id; skipping");
                continue;
            }

            tracing::info!(tool = %call.name(), id = %call.id, "Executing tool");

            match self.run_tool(call).await {
                Ok(output) => results.push(Message::tool_result(output, call.id.clone())),
                Err(e) => {
                    match e {
                        AgentError::ToolNotFound(_) | AgentError::InvalidArguments { .. } => {
                            tracing::warn!(tool = %call.name(), id = %call.id, "Tool call rejected: {}", e);
                        }
                        _ => {
                            tracing::error!(
                                tool = %call.name(),
                                arguments = %call.function.arguments,
                                "Tool call failed: {}",
                                e
                            );
                        }
                    }
                    if self.config.tool_failure == ToolFailurePolicy::ReportError {
                        results.push(Message::tool_result(format!("Error: {e}"), call.id.clone()));
                    }
                }
            }
        }

        results
    }

    /// System message followed by the thread's stored history.
    ///
    /// Empty for a thread that has never completed a turn.
    pub fn all_messages(&self, thread_id: Option<&ThreadId>) -> Vec<Message> {
        self.threads.read(&ThreadKey::from(thread_id))
    }

    /// [`Agent::all_messages`] as a JSON array in the chat-completions shape
    pub fn all_messages_json(&self, thread_id: Option<&ThreadId>) -> Result<String> {
        Ok(serde_json::to_string(&self.all_messages(thread_id))?)
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub const fn threads(&self) -> &ThreadStore {
        &self.threads
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn tool_failure(mut self, policy: ToolFailurePolicy) -> Self {
        self.config.tool_failure = policy;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Derive every tool schema and build the agent
    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        let tools = ToolRegistry::new(self.tools)?;

        Ok(Agent::new(provider, Arc::new(tools), self.config))
    }
}
