//! The Step model: the canonical, durable record of one turn in a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnableType {
    Agent,
    Workflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingType {
    ToolCall,
    WorkflowNode,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Natural,
    MaxSteps,
    Aborted,
    Failed,
}

/// A tool call recorded on an assistant step. `arguments` is the raw,
/// already-finalized JSON-object-by-convention string; the engine parses it
/// lazily before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Per-step timing and token accounting. All fields optional: not every
/// provider reports every figure, and tool steps report none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub duration_ms: Option<u64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_read_tokens: Option<u64>,
    pub cache_creation_tokens: Option<u64>,
    pub first_token_latency_ms: Option<u64>,
    pub model_name: Option<String>,
    pub provider: Option<String>,
}

/// Nesting metadata attached to every step so that a flat session log can be
/// reconstructed into an execution tree after the fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestingInfo {
    pub parent_run_id: Option<String>,
    pub runnable_id: Option<String>,
    pub runnable_type: Option<RunnableType>,
    /// Stable config-level id of the enclosing workflow, distinct from
    /// `runnable_id` (which identifies the specific stage/agent that
    /// produced this step). Used to scope resume-by-presence lookups.
    pub workflow_id: Option<String>,
    pub node_id: Option<String>,
    pub branch_key: Option<String>,
    pub iteration: Option<u32>,
    pub depth: u32,
}

/// The atomic unit of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub session_id: String,
    pub run_id: String,
    pub sequence: u64,
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tool_call_id: Option<String>,
    pub name: Option<String>,
    pub reasoning_content: Option<String>,
    pub metrics: Metrics,
    pub nesting: NestingInfo,
    pub created_at: DateTime<Utc>,
}

impl Step {
    pub fn user(session_id: impl Into<String>, run_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            session_id: session_id.into(),
            run_id: run_id.into(),
            sequence: 0,
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            reasoning_content: None,
            metrics: Metrics::default(),
            nesting: NestingInfo::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_tool_call_bearing(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// A provider-neutral projection of a Step used to build model context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Step> for Message {
    fn from(step: &Step) -> Self {
        Self {
            role: step.role,
            content: step.content.clone(),
            tool_calls: step.tool_calls.clone(),
            tool_call_id: step.tool_call_id.clone(),
            name: step.name.clone(),
        }
    }
}
