//! Tool System
//!
//! Local functions the model may invoke. Each tool declares a [`Signature`]
//! and an optional docstring; the [`ToolRegistry`] derives every schema once
//! at construction and stays immutable afterwards.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::ToolCallRequest;
use crate::schema::{self, Signature, ToolSchema};

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable name the model uses to request this tool
    fn name(&self) -> &str;

    /// Docstring in the `Args:` / `Returns:` convention
    fn doc(&self) -> Option<&str> {
        None
    }

    /// Declared parameters
    fn signature(&self) -> Signature;

    /// Run the tool with a decoded argument object
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value>;
}

/// A plain Rust function exposed as a tool.
///
/// Arguments are decoded into `A` before the function runs; a shape mismatch
/// is reported as [`AgentError::InvalidArguments`]. Tools without parameters
/// can use `A = ()`, which accepts an empty argument object.
pub struct FunctionTool<A, R, F> {
    name: String,
    doc: Option<String>,
    signature: Signature,
    func: F,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R, F> FunctionTool<A, R, F>
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(A) -> anyhow::Result<R>,
{
    pub fn new(name: impl Into<String>, signature: Signature, func: F) -> Self {
        Self {
            name: name.into(),
            doc: None,
            signature,
            func,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    fn decode(&self, arguments: Map<String, Value>) -> Result<A> {
        let empty = arguments.is_empty();
        match serde_json::from_value(Value::Object(arguments)) {
            Ok(args) => Ok(args),
            Err(err) => {
                if empty {
                    if let Ok(args) = serde_json::from_value(Value::Null) {
                        return Ok(args);
                    }
                }
                Err(AgentError::InvalidArguments {
                    tool: self.name.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl<A, R, F> Tool for FunctionTool<A, R, F>
where
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(A) -> anyhow::Result<R> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value> {
        let args = self.decode(arguments)?;
        let output = (self.func)(args).map_err(|e| AgentError::ToolExecution {
            tool: self.name.clone(),
            reason: format!("{e:#}"),
        })?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Text sent back to the model for a tool's return value
pub fn stringify_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    schemas: Vec<ToolSchema>,
    index: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Registry with no tools
    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            schemas: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build the registry, deriving each tool's schema.
    ///
    /// Registration order is kept for the schema list sent to the model.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut schemas = Vec::with_capacity(tools.len());
        let mut index = HashMap::with_capacity(tools.len());

        for (position, tool) in tools.iter().enumerate() {
            let schema = schema::derive(tool.as_ref())?;
            if index.insert(schema.name.clone(), position).is_some() {
                return Err(AgentError::DuplicateTool(schema.name));
            }
            schemas.push(schema);
        }

        Ok(Self { tools, schemas, index })
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.index.get(name).map(|&i| &self.schemas[i])
    }

    /// All tool schemas in registration order
    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    /// Execute a tool call and return the text for its result message
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<String> {
        let name = call.name();
        let (tool, schema) = self
            .index
            .get(name)
            .map(|&i| (&self.tools[i], &self.schemas[i]))
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        let arguments = call.parse_arguments()?;

        // Validate first
        for required in &schema.required {
            if !arguments.contains_key(required) {
                return Err(AgentError::InvalidArguments {
                    tool: name.to_string(),
                    reason: format!("Missing required parameter: {required}"),
                });
            }
        }

        let output = tool.call(arguments).await?;
        Ok(stringify_output(&output))
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

const DATETIME_DOC: &str = "Get the current date and time.

Args:
    format: output format, one of 'iso', 'human' or 'unix'
Returns:
    the current UTC time in the requested format";

/// DateTime tool - returns current time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn doc(&self) -> Option<&str> {
        Some(DATETIME_DOC)
    }

    fn signature(&self) -> Signature {
        Signature::new().optional::<String>("format")
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value> {
        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("human");

        let now = chrono::Utc::now();

        let output = match format {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
        };

        Ok(Value::String(output))
    }
}
