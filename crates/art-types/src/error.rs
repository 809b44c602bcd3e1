//! Shared error taxonomy used across all Agent Runtime Core crates.

use serde::{Deserialize, Serialize};

/// The error kinds surfaced to callers and carried on `RUN_FAILED`/`ERROR`
/// events. Named to match the taxonomy, not a specific Rust type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ModelError,
    ToolNotFound,
    ToolArgInvalid,
    ToolExecutionError,
    DepthExceeded,
    CycleDetected,
    Timeout,
    Aborted,
    StoreError,
    WorkflowStageFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ModelError => "model_error",
            Self::ToolNotFound => "tool_not_found",
            Self::ToolArgInvalid => "tool_arg_invalid",
            Self::ToolExecutionError => "tool_execution_error",
            Self::DepthExceeded => "depth_exceeded",
            Self::CycleDetected => "cycle_detected",
            Self::Timeout => "timeout",
            Self::Aborted => "aborted",
            Self::StoreError => "store_error",
            Self::WorkflowStageFailed => "workflow_stage_failed",
        };
        f.write_str(s)
    }
}

/// Shared error type used across all Agent Runtime Core crates.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("model error: {0}")]
    Model(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid arguments for tool {tool}: {message}")]
    ToolArgInvalid { tool: String, message: String },

    #[error("tool {tool} execution failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("nesting depth exceeded: attempted depth {attempted}, max {max}")]
    DepthExceeded { attempted: u32, max: u32 },

    #[error("cycle detected: runnable '{runnable_id}' already present in call chain")]
    CycleDetected { runnable_id: String },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("workflow stage '{stage}' failed: {source}")]
    WorkflowStageFailed {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Model(_) => ErrorKind::ModelError,
            Self::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Self::ToolArgInvalid { .. } => ErrorKind::ToolArgInvalid,
            Self::ToolExecution { .. } => ErrorKind::ToolExecutionError,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Aborted(_) => ErrorKind::Aborted,
            Self::Store(_) => ErrorKind::StoreError,
            Self::WorkflowStageFailed { .. } => ErrorKind::WorkflowStageFailed,
            Self::Other(_) => ErrorKind::ModelError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
