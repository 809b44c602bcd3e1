//! PipelineWorkflow: an ordered sequence of stages, each a Runnable,
//! resumable by presence of already-committed stage output in the session.

use art_context::ExecutionContext;
use art_types::{Error, NestingType, Result, Role, StepFilter, TerminationReason};

use crate::pipeline::StepPipeline;
use crate::runnable::{Runnable, RunOutcome};
use crate::workflow::template::{evaluate, render, TemplateState};

#[derive(Clone)]
pub struct Stage {
    pub id: String,
    pub runnable: Runnable,
    pub input_template: String,
    pub condition: Option<String>,
}

pub struct PipelineWorkflow {
    pub id: String,
    pub stages: Vec<Stage>,
}

impl PipelineWorkflow {
    pub fn new(id: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self { id: id.into(), stages }
    }

    pub async fn run(&self, input: String, context: ExecutionContext) -> Result<RunOutcome> {
        let (outcome, _state) = self.run_with_seed_state(input, context, None, TemplateState::new()).await?;
        Ok(outcome)
    }

    /// Run the pipeline with `seed` pre-populated into the stage state
    /// (used by `LoopWorkflow` to expose `{loop.iteration}` /
    /// `{loop.last.<node_id>}` to every stage template) and, when
    /// `iteration` is set, stamp it onto every step this pipeline's stages
    /// commit. Returns the final state map alongside the outcome so a loop
    /// can carry per-node outputs into its next round.
    pub async fn run_with_seed_state(
        &self,
        input: String,
        context: ExecutionContext,
        iteration: Option<u32>,
        seed: TemplateState,
    ) -> Result<(RunOutcome, TemplateState)> {
        let pipeline = StepPipeline::new(context.clone());
        pipeline.emit_run_started(&input);

        let mut state = seed;
        state.insert("input".to_string(), input);

        for stage in &self.stages {
            if let Some(existing) = self.load_existing_output(&context, stage).await? {
                state.insert(stage.id.clone(), existing);
            }
        }

        let mut last_output = String::new();

        for stage in &self.stages {
            if state.contains_key(&stage.id) {
                last_output = state[&stage.id].clone();
                continue;
            }

            if let Some(condition) = &stage.condition {
                if !evaluate(condition, &state) {
                    tracing::info!(stage = %stage.id, "workflow stage skipped: condition false");
                    continue;
                }
            }

            let rendered_input = render(&stage.input_template, &state);

            let mut child = context.child(stage.runnable.runnable_type(), stage.runnable.id(), NestingType::WorkflowNode)
                .with_workflow_node(self.id.clone(), stage.id.clone());
            if let Some(iteration) = iteration {
                child = child.with_iteration(iteration);
            }

            let outcome = match stage.runnable.run(rendered_input, child).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let failure = Error::WorkflowStageFailed { stage: stage.id.clone(), source: Box::new(e) };
                    pipeline.emit_run_failed(&failure);
                    return Err(failure);
                }
            };

            state.insert(stage.id.clone(), outcome.output.clone());
            last_output = outcome.output;
        }

        let metrics = pipeline.final_metrics_for(StepFilter::matches_workflow(self.id.clone())).await?;
        pipeline.emit_run_completed(&last_output, metrics.clone(), TerminationReason::Natural);

        Ok((RunOutcome { output: last_output, termination_reason: TerminationReason::Natural, metrics }, state))
    }

    async fn load_existing_output(&self, context: &ExecutionContext, stage: &Stage) -> Result<Option<String>> {
        let filter = StepFilter::matches_workflow(self.id.clone()).with_node(stage.id.clone());
        let steps = context.store.get_steps(&context.session_id, &filter).await?;
        Ok(steps
            .into_iter()
            .rev()
            .find(|s| s.role == Role::Assistant && s.tool_calls.is_empty())
            .and_then(|s| s.content))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use art_providers::ScriptedModelClient;
    use art_sessions::InMemorySessionStore;
    use art_types::RunnableType;
    use art_wire::Wire;

    use super::*;
    use crate::agent::Agent;
    use crate::runnable::Runnable;

    fn store() -> Arc<dyn art_sessions::SessionStore> {
        Arc::new(InMemorySessionStore::new())
    }

    fn root_context(store: Arc<dyn art_sessions::SessionStore>) -> ExecutionContext {
        ExecutionContext::root("s1", RunnableType::Workflow, "pipeline", Wire::new(), store)
    }

    fn two_stage_pipeline() -> PipelineWorkflow {
        let draft = Runnable::Agent(Arc::new(Agent::new(
            "drafter",
            "draft",
            Arc::new(ScriptedModelClient::text_only("a draft")),
        )));
        let polish = Runnable::Agent(Arc::new(Agent::new(
            "polisher",
            "polish",
            Arc::new(ScriptedModelClient::text_only("a polished draft")),
        )));
        PipelineWorkflow::new(
            "write-and-polish",
            vec![
                Stage { id: "draft".into(), runnable: draft, input_template: "{input}".into(), condition: None },
                Stage { id: "polish".into(), runnable: polish, input_template: "{draft}".into(), condition: None },
            ],
        )
    }

    #[tokio::test]
    async fn runs_every_stage_in_order_and_produces_the_last_stages_output() {
        let store = store();
        let pipeline = two_stage_pipeline();
        let outcome = pipeline.run("topic".into(), root_context(store)).await.unwrap();
        assert_eq!(outcome.output, "a polished draft");
    }

    #[tokio::test]
    async fn rerunning_on_the_same_session_is_idempotent_via_resume_by_presence() {
        let store = store();

        let pipeline = two_stage_pipeline();
        pipeline.run("topic".into(), root_context(store.clone())).await.unwrap();

        let steps_after_first_run = store.get_steps("s1", &StepFilter::default()).await.unwrap().len();

        // A second pipeline instance with the *same* stage/workflow ids,
        // replayed against the same session: every stage already has a
        // terminal output committed, so no new steps should be produced.
        let pipeline_again = two_stage_pipeline();
        let outcome = pipeline_again.run("topic".into(), root_context(store.clone())).await.unwrap();

        assert_eq!(outcome.output, "a polished draft");
        let steps_after_second_run = store.get_steps("s1", &StepFilter::default()).await.unwrap().len();
        assert_eq!(steps_after_first_run, steps_after_second_run);
    }

    #[tokio::test]
    async fn a_false_condition_skips_the_stage_entirely() {
        let store = store();
        let stage_runnable = Runnable::Agent(Arc::new(Agent::new(
            "skippable",
            "noop",
            Arc::new(ScriptedModelClient::text_only("should not run")),
        )));
        let pipeline = PipelineWorkflow::new(
            "conditional",
            vec![Stage {
                id: "maybe".into(),
                runnable: stage_runnable,
                input_template: "{input}".into(),
                condition: Some("{input} == go".into()),
            }],
        );

        let outcome = pipeline.run("stop".into(), root_context(store)).await.unwrap();
        assert_eq!(outcome.output, "");
    }
}
