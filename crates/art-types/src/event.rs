//! The Event taxonomy streamed over a Wire, and StepDelta reconstruction.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::step::{NestingType, RunnableType, Step, TerminationReason};

/// One positionally-addressed patch to an in-flight tool call. `index` is
/// the provider's slot number, not an id: ids and names are often late-bound
/// and arrive only on the first fragment for that index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallPatch {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments_append: Option<String>,
}

/// A streaming increment to a not-yet-complete Step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDelta {
    pub content_append: Option<String>,
    pub reasoning_append: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls_patch: Vec<ToolCallPatch>,
}

impl StepDelta {
    pub fn is_empty(&self) -> bool {
        self.content_append.is_none() && self.reasoning_append.is_none() && self.tool_calls_patch.is_empty()
    }
}

/// Run-level summary metrics surfaced on completion, aggregated lazily from
/// the session rather than carried incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub step_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Completed,
    Failed,
}

/// Events emitted on a Wire. Every variant carries `run_id` so a consumer
/// can reconstruct the execution tree from a flat interleaved stream using
/// `run_id`/`parent_run_id` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    RunStarted {
        run_id: String,
        runnable_id: String,
        runnable_type: RunnableType,
        parent_run_id: Option<String>,
        depth: u32,
        nesting_type: NestingType,
        input: String,
    },
    StepDeltaEvent {
        run_id: String,
        step_id: String,
        delta: StepDelta,
    },
    StepCompleted {
        run_id: String,
        step_id: String,
        snapshot: Box<Step>,
    },
    ToolCallStarted {
        run_id: String,
        call_id: String,
        tool_name: String,
        args: String,
    },
    ToolCallCompleted {
        run_id: String,
        call_id: String,
        result: String,
        status: ToolCallStatus,
        duration_ms: u64,
    },
    RunCompleted {
        run_id: String,
        output: String,
        metrics: RunMetrics,
        termination_reason: TerminationReason,
    },
    RunFailed {
        run_id: String,
        error_kind: ErrorKind,
        message: String,
    },
    ErrorEvent {
        run_id: String,
        error_kind: ErrorKind,
        message: String,
    },
}

impl Event {
    pub fn run_id(&self) -> &str {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::StepDeltaEvent { run_id, .. }
            | Event::StepCompleted { run_id, .. }
            | Event::ToolCallStarted { run_id, .. }
            | Event::ToolCallCompleted { run_id, .. }
            | Event::RunCompleted { run_id, .. }
            | Event::RunFailed { run_id, .. }
            | Event::ErrorEvent { run_id, .. } => run_id,
        }
    }
}
