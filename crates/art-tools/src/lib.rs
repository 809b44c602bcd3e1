//! The Tool interface and registry: a uniform execute-with-context contract
//! looked up by name.

use std::collections::HashMap;
use std::sync::Arc;

use art_context::{AbortSignal, ExecutionContext};
use art_types::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

/// The outcome of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    pub content: String,
    pub is_success: bool,
    pub citations: Option<Value>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_success: true, citations: None }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_success: false, citations: None }
    }

    pub fn with_citations(mut self, citations: Value) -> Self {
        self.citations = Some(citations);
        self
    }
}

/// A pure in-process capability an agent can invoke; may perform I/O.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value, context: &ExecutionContext, abort: &AbortSignal) -> Result<ToolResult>;
}

/// Lookup of tools by name, shared read-only once agents are running.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    /// JSON-schema-shaped tool definitions for every registered tool, in the
    /// shape a `ModelClient` expects to receive alongside a chat request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Resolve `name` in `registry`, producing the taxonomy's `tool_not_found`
/// error rather than panicking — callers convert this into a synthesized
/// error tool-result step rather than aborting the run.
pub fn resolve(registry: &ToolRegistry, name: &str) -> Result<Arc<dyn Tool>> {
    registry.get(name).ok_or_else(|| {
        tracing::warn!(tool = name, "tool resolution failed: not registered");
        Error::ToolNotFound(name.to_string())
    })
}

/// A trivial illustrative tool: echoes its `text` argument back unchanged.
/// Registered by `art-cli`'s demo harness so `run`/`stream` have something
/// to call without wiring up a real capability.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "echoes the given text back"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
        })
    }

    async fn execute(&self, args: Value, _context: &ExecutionContext, _abort: &AbortSignal) -> Result<ToolResult> {
        let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(ToolResult::success(text))
    }
}
