//! Runnable: the common capability implemented by every agent and workflow,
//! expressed as a tagged variant rather than a trait object hierarchy —
//! `run(input, context) -> output` and `id()` are all any caller needs.

use std::sync::Arc;

use art_context::ExecutionContext;
use art_types::{Result, RunMetrics, RunnableType, TerminationReason};

use crate::agent::{run_agent, Agent, ResumePoint};
use crate::pipeline::StepPipeline;
use crate::workflow::{LoopWorkflow, ParallelWorkflow, PipelineWorkflow};

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: String,
    pub termination_reason: TerminationReason,
    pub metrics: RunMetrics,
}

/// `Runnable = Agent | PipelineWorkflow | ParallelWorkflow | LoopWorkflow`.
/// AgentAsTool is the only polymorphism needed on top of this: it adapts
/// whichever variant it wraps into the Tool capability set.
#[derive(Clone)]
pub enum Runnable {
    Agent(Arc<Agent>),
    Pipeline(Arc<PipelineWorkflow>),
    Parallel(Arc<ParallelWorkflow>),
    Loop(Arc<LoopWorkflow>),
}

impl Runnable {
    pub fn id(&self) -> &str {
        match self {
            Runnable::Agent(a) => &a.id,
            Runnable::Pipeline(p) => &p.id,
            Runnable::Parallel(p) => &p.id,
            Runnable::Loop(l) => &l.id,
        }
    }

    pub fn runnable_type(&self) -> RunnableType {
        match self {
            Runnable::Agent(_) => RunnableType::Agent,
            Runnable::Pipeline(_) | Runnable::Parallel(_) | Runnable::Loop(_) => RunnableType::Workflow,
        }
    }

    pub fn run<'a>(
        &'a self,
        input: String,
        context: ExecutionContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RunOutcome>> + Send + 'a>> {
        Box::pin(async move {
            match self {
                Runnable::Agent(agent) => {
                    let pipeline = StepPipeline::new(context);
                    run_agent(agent, &pipeline, ResumePoint::Fresh { input }).await
                }
                Runnable::Pipeline(workflow) => workflow.run(input, context).await,
                Runnable::Parallel(workflow) => workflow.run(input, context).await,
                Runnable::Loop(workflow) => workflow.run(input, context).await,
            }
        })
    }
}
