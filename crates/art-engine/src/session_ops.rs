//! Session operations that drive a live Runnable: `retry` truncates then
//! resumes; `fork` is a pure copy handled entirely by `art_sessions`.

use std::sync::Arc;

use art_context::ExecutionContext;
use art_sessions::{truncate_from, ResumeKind};
use art_types::Result;
use art_wire::Wire;

pub use art_sessions::fork_at_sequence as fork;

use crate::agent::{run_agent, ResumePoint};
use crate::pipeline::StepPipeline;
use crate::runnable::{Runnable, RunOutcome};

/// `retry(session, N)`: delete all steps with `sequence >= N`, then resume
/// execution. For an agent, the kept tail determines how: a pending
/// assistant step with unresolved tool_calls gets those replayed before the
/// next model call; otherwise the model is called directly against the
/// truncated history. Workflows resume via their own resume-by-presence
/// check against the (now-truncated) session, so they are simply re-run.
pub async fn retry(
    runnable: &Runnable,
    session_id: &str,
    n: u64,
    store: Arc<dyn art_sessions::SessionStore>,
) -> Result<RunOutcome> {
    let kept_tail = truncate_from(&*store, session_id, n).await?;

    let context = ExecutionContext::root(
        session_id.to_string(),
        runnable.runnable_type(),
        runnable.id(),
        Wire::new(),
        store,
    );

    match runnable {
        Runnable::Agent(agent) => {
            let pipeline = StepPipeline::new(context);
            let resume = match art_sessions::classify_resume(&kept_tail) {
                ResumeKind::Nothing => ResumePoint::Fresh { input: String::new() },
                ResumeKind::CallModel => ResumePoint::ContinueFromHistory,
                ResumeKind::ReplayToolCalls { assistant_step, missing } => {
                    ResumePoint::ReplayToolCalls { assistant_step, missing }
                }
            };
            run_agent(agent, &pipeline, resume).await
        }
        Runnable::Pipeline(_) | Runnable::Parallel(_) | Runnable::Loop(_) => {
            runnable.run(String::new(), context).await
        }
    }
}

#[cfg(test)]
mod tests {
    use art_providers::ScriptedModelClient;
    use art_sessions::InMemorySessionStore;
    use art_tools::{Tool, ToolRegistry, ToolResult};
    use art_types::{Role, StepFilter};
    use async_trait::async_trait;

    use super::*;
    use crate::agent::{Agent, ResumePoint};
    use crate::pipeline::StepPipeline;

    struct UppercaseTool;

    #[async_trait]
    impl Tool for UppercaseTool {
        fn name(&self) -> &str {
            "uppercase"
        }
        fn description(&self) -> &str {
            "uppercases its input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(
            &self,
            args: serde_json::Value,
            _ctx: &ExecutionContext,
            _abort: &art_context::AbortSignal,
        ) -> Result<ToolResult> {
            let text = args.get("text").and_then(serde_json::Value::as_str).unwrap_or_default();
            Ok(ToolResult::success(text.to_uppercase()))
        }
    }

    fn tools_with_uppercase() -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(UppercaseTool));
        registry
    }

    #[tokio::test]
    async fn retry_replays_an_unresolved_tool_call_then_resumes() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());

        let model = ScriptedModelClient::tool_call_then_text("uppercase", "c1", r#"{"text":"hi"}"#, "first answer");
        let agent =
            Arc::new(Agent::new("assistant", "help", Arc::new(model)).with_tools(tools_with_uppercase()));
        let context = ExecutionContext::root(
            "s1",
            art_types::RunnableType::Agent,
            "assistant",
            Wire::new(),
            store.clone(),
        );
        let pipeline = StepPipeline::new(context);
        run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "shout hi".into() }).await.unwrap();

        let steps = store.get_steps("s1", &StepFilter::default()).await.unwrap();
        // user, assistant(tool_calls=[c1]), tool(result), assistant(final)
        assert_eq!(steps.len(), 4);
        let assistant_with_calls_seq = steps[1].sequence;

        // Truncate back to just before the tool result: the kept tail ends
        // with the unresolved tool call, so retry must replay it.
        let retried_model = ScriptedModelClient::text_only("second answer");
        let retried_agent = Arc::new(
            Agent::new("assistant", "help", Arc::new(retried_model)).with_tools(tools_with_uppercase()),
        );
        let runnable = Runnable::Agent(retried_agent);

        let outcome = retry(&runnable, "s1", assistant_with_calls_seq + 1, store.clone()).await.unwrap();
        assert_eq!(outcome.output, "second answer");

        let steps_after_retry = store.get_steps("s1", &StepFilter::default()).await.unwrap();
        assert_eq!(steps_after_retry.len(), 4);
        let replayed_tool_step = steps_after_retry.iter().find(|s| s.role == Role::Tool).unwrap();
        assert_eq!(replayed_tool_step.content.as_deref(), Some("HI"));
    }

    #[tokio::test]
    async fn retry_calls_the_model_directly_when_the_kept_tail_is_already_closed() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());

        let model = ScriptedModelClient::tool_call_then_text("uppercase", "c1", r#"{"text":"hi"}"#, "first answer");
        let agent =
            Arc::new(Agent::new("assistant", "help", Arc::new(model)).with_tools(tools_with_uppercase()));
        let context = ExecutionContext::root(
            "s1",
            art_types::RunnableType::Agent,
            "assistant",
            Wire::new(),
            store.clone(),
        );
        let pipeline = StepPipeline::new(context);
        run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "shout hi".into() }).await.unwrap();

        let steps = store.get_steps("s1", &StepFilter::default()).await.unwrap();
        let final_assistant_seq = steps.last().unwrap().sequence;

        // Truncate back to just before the final assistant step: the kept
        // tail ends with the closed tool result, so retry calls the model
        // directly without appending a new user step.
        let retried_model = ScriptedModelClient::text_only("revised answer");
        let retried_agent = Arc::new(
            Agent::new("assistant", "help", Arc::new(retried_model)).with_tools(tools_with_uppercase()),
        );
        let runnable = Runnable::Agent(retried_agent);

        let outcome = retry(&runnable, "s1", final_assistant_seq, store.clone()).await.unwrap();
        assert_eq!(outcome.output, "revised answer");

        let steps_after_retry = store.get_steps("s1", &StepFilter::default()).await.unwrap();
        // no extra user step was appended
        assert_eq!(steps_after_retry.iter().filter(|s| s.role == Role::User).count(), 1);
    }
}
