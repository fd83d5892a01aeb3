//! Tool System
//!
//! Caller-supplied capabilities the model can invoke. Tools are registered once
//! per agent configuration and looked up by name from the reasoning loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};

/// Decoded arguments of a tool call
pub type Arguments = Map<String, Value>;

/// Parameter schema advertised to the model
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Property name to JSON Schema constraint
    pub properties: Map<String, Value>,

    /// Names of properties the model must supply
    #[serde(default)]
    pub required: Vec<String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property constraint
    pub fn property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Add a required property constraint
    pub fn required_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        self.required.push(name);
        self
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// `{"type": "object", "properties": ..., "required": [...]}`
    pub parameters: Value,
}

/// What a tool hands back to the model
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    /// Used verbatim as the tool-result turn
    Text(String),
    /// Serialized to JSON text before being appended
    Json(Value),
}

impl ToolOutput {
    /// Render the output as the content of a tool-result turn
    pub fn into_turn_content(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Json(value) => Ok(serde_json::to_string(&value)?),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Tool trait - implement to expose a callable function to the model
///
/// `name`, `description` and `parameters` must be side-effect free. `execute`
/// may do arbitrary I/O but must stop promptly once `cancel` fires. Returning
/// an error aborts the whole run.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> Parameters;

    /// Execute the tool with decoded arguments
    async fn execute(
        &self,
        cancel: &CancellationToken,
        arguments: Arguments,
    ) -> anyhow::Result<ToolOutput>;

    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameters().to_json_schema(),
        }
    }
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    // registration order, used when advertising tools
    order: Vec<String>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_owned();
        if self.tools.contains_key(&name) {
            return Err(AgentError::Config(format!(
                "Tool '{name}' is registered more than once"
            )));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.schema())
            .collect()
    }

    /// Tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
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
