//! ParallelWorkflow: a set of branches run concurrently and merged.

use art_context::ExecutionContext;
use art_types::{Error, NestingType, Result, Role, StepFilter, TerminationReason};

use crate::pipeline::StepPipeline;
use crate::runnable::{Runnable, RunOutcome};
use crate::workflow::template::{render, TemplateState};

#[derive(Clone)]
pub struct Branch {
    pub key: String,
    pub runnable: Runnable,
    pub input_template: String,
}

pub struct ParallelWorkflow {
    pub id: String,
    pub branches: Vec<Branch>,
    pub merge_template: String,
}

impl ParallelWorkflow {
    pub fn new(id: impl Into<String>, branches: Vec<Branch>, merge_template: impl Into<String>) -> Self {
        Self { id: id.into(), branches, merge_template: merge_template.into() }
    }

    pub async fn run(&self, input: String, context: ExecutionContext) -> Result<RunOutcome> {
        let pipeline = StepPipeline::new(context.clone());
        pipeline.emit_run_started(&input);

        let mut state = TemplateState::new();
        state.insert("input".to_string(), input);

        let mut pending = Vec::new();
        for branch in &self.branches {
            if let Some(existing) = self.load_existing_output(&context, branch).await? {
                state.insert(branch.key.clone(), existing);
            } else {
                pending.push(branch);
            }
        }

        let futures = pending.iter().map(|branch| {
            let rendered_input = render(&branch.input_template, &state);
            let child = context
                .child(branch.runnable.runnable_type(), branch.runnable.id(), NestingType::WorkflowNode)
                .with_workflow_node(self.id.clone(), branch.key.clone())
                .with_branch_key(branch.key.clone());
            let runnable = branch.runnable.clone();
            let key = branch.key.clone();
            async move { (key, runnable.run(rendered_input, child).await) }
        });

        let results = futures_util::future::join_all(futures).await;

        for (key, result) in results {
            match result {
                Ok(outcome) => {
                    state.insert(key, outcome.output);
                }
                Err(err) => {
                    context.abort.fire();
                    let failure = Error::WorkflowStageFailed { stage: key, source: Box::new(err) };
                    pipeline.emit_run_failed(&failure);
                    return Err(failure);
                }
            }
        }

        let output = render(&self.merge_template, &state);
        let metrics = pipeline.final_metrics_for(StepFilter::matches_workflow(self.id.clone())).await?;
        pipeline.emit_run_completed(&output, metrics.clone(), TerminationReason::Natural);

        Ok(RunOutcome { output, termination_reason: TerminationReason::Natural, metrics })
    }

    async fn load_existing_output(&self, context: &ExecutionContext, branch: &Branch) -> Result<Option<String>> {
        let filter = StepFilter::matches_workflow(self.id.clone()).with_branch(branch.key.clone());
        let steps = context.store.get_steps(&context.session_id, &filter).await?;
        Ok(steps
            .into_iter()
            .rev()
            .find(|s| s.role == Role::Assistant && s.tool_calls.is_empty())
            .and_then(|s| s.content))
    }
}
