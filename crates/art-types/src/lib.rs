//! Shared data model for the agent runtime core: Steps, Events, errors, and
//! config types with no behavior of their own. Every other crate in the
//! workspace depends on this one.

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod step;

pub use config::ExecutionConfig;
pub use error::{Error, ErrorKind, Result};
pub use event::{Event, RunMetrics, StepDelta, ToolCallPatch, ToolCallStatus};
pub use filter::StepFilter;
pub use step::{
    Message, Metrics, NestingInfo, NestingType, Role, RunnableType, Step, TerminationReason, ToolCallRecord,
};
