//! LoopWorkflow: repeatedly runs a body pipeline while a condition holds,
//! exposing `{loop.iteration}` and `{loop.last.<node_id>}` to the body.

use art_context::ExecutionContext;
use art_types::{NestingType, Result, RunnableType, TerminationReason};

use crate::pipeline::StepPipeline;
use crate::runnable::RunOutcome;
use crate::workflow::pipeline::PipelineWorkflow;
use crate::workflow::template::{evaluate, TemplateState};

pub struct LoopWorkflow {
    pub id: String,
    pub body: PipelineWorkflow,
    pub condition: String,
    pub max_iterations: u32,
}

impl LoopWorkflow {
    pub fn new(id: impl Into<String>, body: PipelineWorkflow, condition: impl Into<String>, max_iterations: u32) -> Self {
        Self { id: id.into(), body, condition: condition.into(), max_iterations }
    }

    pub async fn run(&self, input: String, context: ExecutionContext) -> Result<RunOutcome> {
        let pipeline = StepPipeline::new(context.clone());
        pipeline.emit_run_started(&input);

        let mut iteration = 0u32;
        let mut last_state = TemplateState::new();
        let mut last_output = String::new();

        while iteration < self.max_iterations {
            let mut seed = TemplateState::new();
            seed.insert("loop.iteration".to_string(), iteration.to_string());
            for (node_id, output) in &last_state {
                if node_id == "input" || node_id.starts_with("loop.") {
                    continue;
                }
                seed.insert(format!("loop.last.{node_id}"), output.clone());
            }

            let body_context = context.child(RunnableType::Workflow, self.body.id.clone(), NestingType::WorkflowNode);
            let (outcome, state) = match self
                .body
                .run_with_seed_state(input.clone(), body_context, Some(iteration), seed)
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    pipeline.emit_run_failed(&err);
                    return Err(err);
                }
            };

            last_output = outcome.output;
            last_state = state;

            if !evaluate(&self.condition, &last_state) {
                break;
            }
            iteration += 1;
        }

        let metrics = pipeline.final_metrics_for(art_types::StepFilter::matches_workflow(self.body.id.clone())).await?;
        pipeline.emit_run_completed(&last_output, metrics.clone(), TerminationReason::Natural);

        Ok(RunOutcome { output: last_output, termination_reason: TerminationReason::Natural, metrics })
    }
}
