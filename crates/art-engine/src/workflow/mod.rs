//! Workflow orchestration: Pipeline (sequential), Parallel (fan-out/merge),
//! and Loop (conditional re-execution), all operating as Runnables over the
//! shared session Step stream.

pub mod loop_;
pub mod parallel;
pub mod pipeline;
pub mod template;

pub use loop_::LoopWorkflow;
pub use parallel::{Branch, ParallelWorkflow};
pub use pipeline::{PipelineWorkflow, Stage};
