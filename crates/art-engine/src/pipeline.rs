//! StepPipeline: binds an executor to (Wire, SessionStore, ExecutionContext)
//! and exposes the small set of operations every Runnable needs to stream
//! and persist its progress.

use art_context::ExecutionContext;
use art_sessions::SessionStore;
use art_types::{
    step::new_id, Error, Event, Metrics, NestingInfo, Result, RunMetrics, Role, Step, StepDelta, StepFilter,
    TerminationReason, ToolCallRecord, ToolCallStatus,
};
use art_wire::Wire;

/// A thin coordinator, cheap to construct per run, owning no state beyond
/// clones of its context's collaborators.
pub struct StepPipeline {
    wire: Wire,
    store: std::sync::Arc<dyn SessionStore>,
    context: ExecutionContext,
}

impl StepPipeline {
    pub fn new(context: ExecutionContext) -> Self {
        Self { wire: context.wire.clone(), store: context.store.clone(), context }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn emit_run_started(&self, input: &str) {
        self.wire.write(Event::RunStarted {
            run_id: self.context.run_id.clone(),
            runnable_id: self.context.runnable_id.clone(),
            runnable_type: self.context.runnable_type,
            parent_run_id: self.context.parent_run_id.clone(),
            depth: self.context.depth,
            nesting_type: self.context.nesting_type,
            input: input.to_string(),
        });
    }

    pub fn emit_step_delta(&self, step_id: &str, delta: StepDelta) {
        if delta.is_empty() {
            return;
        }
        self.wire.write(Event::StepDeltaEvent {
            run_id: self.context.run_id.clone(),
            step_id: step_id.to_string(),
            delta,
        });
    }

    /// Persist `step` then emit `STEP_COMPLETED` with the stored snapshot.
    /// The store append happens-before the emission, satisfying the
    /// event-store coherence invariant.
    pub async fn commit_step(&self, mut step: Step) -> Result<Step> {
        step.nesting = self.context.nesting_info();
        let persisted = self.store.append(step).await?;
        self.wire.write(Event::StepCompleted {
            run_id: self.context.run_id.clone(),
            step_id: persisted.id.clone(),
            snapshot: Box::new(persisted.clone()),
        });
        Ok(persisted)
    }

    pub fn emit_tool_call_started(&self, call_id: &str, tool_name: &str, args: &str) {
        self.wire.write(Event::ToolCallStarted {
            run_id: self.context.run_id.clone(),
            call_id: call_id.to_string(),
            tool_name: tool_name.to_string(),
            args: args.to_string(),
        });
    }

    pub fn emit_tool_call_completed(&self, call_id: &str, result: &str, status: ToolCallStatus, duration_ms: u64) {
        self.wire.write(Event::ToolCallCompleted {
            run_id: self.context.run_id.clone(),
            call_id: call_id.to_string(),
            result: result.to_string(),
            status,
            duration_ms,
        });
    }

    pub fn emit_run_completed(&self, output: &str, metrics: RunMetrics, termination_reason: TerminationReason) {
        self.wire.write(Event::RunCompleted {
            run_id: self.context.run_id.clone(),
            output: output.to_string(),
            metrics,
            termination_reason,
        });
    }

    pub fn emit_run_failed(&self, error: &Error) {
        self.wire.write(Event::RunFailed {
            run_id: self.context.run_id.clone(),
            error_kind: error.kind(),
            message: error.to_string(),
        });
    }

    pub fn emit_error(&self, error: &Error) {
        self.wire.write(Event::ErrorEvent {
            run_id: self.context.run_id.clone(),
            error_kind: error.kind(),
            message: error.to_string(),
        });
    }

    /// Sum the `metrics` already recorded on each step committed under this
    /// run into a run-level summary, rather than tracking running totals
    /// through the run's loop.
    pub async fn final_metrics(&self) -> Result<RunMetrics> {
        self.final_metrics_for(StepFilter::matches_run(self.context.run_id.clone())).await
    }

    /// Like [`Self::final_metrics`], scoped by an arbitrary filter instead of
    /// this run's own id. Used by workflow executors, whose stages/branches
    /// commit steps under their own per-stage child `run_id`s rather than the
    /// workflow's, so the workflow's total is scoped by `workflow_id` instead.
    pub async fn final_metrics_for(&self, filter: StepFilter) -> Result<RunMetrics> {
        let steps = self.store.get_steps(&self.context.session_id, &filter).await?;
        let total_input_tokens = steps.iter().filter_map(|s| s.metrics.input_tokens).sum();
        let total_output_tokens = steps.iter().filter_map(|s| s.metrics.output_tokens).sum();
        let duration_ms = steps.iter().filter_map(|s| s.metrics.duration_ms).sum();
        Ok(RunMetrics { step_count: steps.len() as u64, total_input_tokens, total_output_tokens, duration_ms })
    }

    /// Build an empty Step pre-stamped with this run's identity, ready to be
    /// filled in as deltas arrive and committed once the model stream ends.
    pub fn new_pending_step(&self, role: Role) -> Step {
        Step {
            id: new_id(),
            session_id: self.context.session_id.clone(),
            run_id: self.context.run_id.clone(),
            sequence: 0,
            role,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            reasoning_content: None,
            metrics: Metrics::default(),
            nesting: NestingInfo::default(),
            created_at: chrono::Utc::now(),
        }
    }
}

pub fn depth_exceeded(attempted: u32, max: u32) -> Error {
    Error::DepthExceeded { attempted, max }
}

pub fn cycle_detected(runnable_id: &str) -> Error {
    Error::CycleDetected { runnable_id: runnable_id.to_string() }
}

pub fn tool_arg_invalid(tool: &str, message: impl Into<String>) -> Error {
    Error::ToolArgInvalid { tool: tool.to_string(), message: message.into() }
}

pub fn tool_execution_error(tool: &str, message: impl Into<String>) -> Error {
    Error::ToolExecution { tool: tool.to_string(), message: message.into() }
}

/// Build the role=tool step recording the outcome of one tool call. Used
/// both for a tool's own result and for synthesized errors (tool not found,
/// invalid arguments, execution failure) so the loop can continue and let
/// the model observe the failure rather than aborting the run.
pub fn tool_result_step(context: &ExecutionContext, call: &ToolCallRecord, content: &str) -> Step {
    Step {
        id: new_id(),
        session_id: context.session_id.clone(),
        run_id: context.run_id.clone(),
        sequence: 0,
        role: Role::Tool,
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        tool_call_id: Some(call.id.clone()),
        name: Some(call.name.clone()),
        reasoning_content: None,
        metrics: Metrics::default(),
        nesting: context.nesting_info(),
        created_at: chrono::Utc::now(),
    }
}
