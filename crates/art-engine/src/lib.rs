//! The Agent Runtime Core engine: the AgentExecutor loop, the AgentAsTool
//! adapter, workflow orchestration, and the session-level operations and
//! entry points that tie them together.

pub mod agent;
pub mod agent_as_tool;
pub mod entrypoint;
pub mod pipeline;
pub mod runnable;
pub mod session_ops;
pub mod workflow;

pub use agent::{Agent, ResumePoint};
pub use agent_as_tool::AgentAsTool;
pub use entrypoint::{run, run_stream, RunOutput, RunOutputError};
pub use pipeline::StepPipeline;
pub use runnable::{Runnable, RunOutcome};
pub use workflow::{Branch, LoopWorkflow, ParallelWorkflow, PipelineWorkflow, Stage};
