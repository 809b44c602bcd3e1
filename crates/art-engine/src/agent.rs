//! AgentExecutor: the LLM reason/act loop. Drives one agent-type Runnable to
//! completion by alternating model calls and tool executions until the
//! model stops requesting tools, the step bound is hit, or abort fires.

use std::collections::HashMap;
use std::sync::Arc;

use art_context::{AbortSignal, ExecutionContext};
use art_providers::{ChatParams, ModelClient, ProviderDelta, ToolSchema};
use art_sessions::build_context;
use art_tools::{resolve, ToolRegistry};
use art_types::{
    ExecutionConfig, Result, Role, Step, StepDelta, StepFilter, TerminationReason, ToolCallPatch, ToolCallRecord,
    ToolCallStatus,
};
use futures_util::StreamExt;

use crate::pipeline::{tool_arg_invalid, tool_execution_error, tool_result_step, StepPipeline};
use crate::runnable::RunOutcome;

/// A reason/act agent: a system prompt, a model, and a set of tools it may
/// call, bound by `config`.
pub struct Agent {
    pub id: String,
    pub system_prompt: String,
    pub model: Arc<dyn ModelClient>,
    pub tools: Arc<ToolRegistry>,
    pub config: ExecutionConfig,
}

impl Agent {
    pub fn new(id: impl Into<String>, system_prompt: impl Into<String>, model: Arc<dyn ModelClient>) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            model,
            tools: Arc::new(ToolRegistry::new()),
            config: ExecutionConfig::default(),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }
}

/// What the loop should do before its first model call: nothing (fresh
/// run), or first close out an assistant step's unresolved tool_calls (a
/// retry resuming an interrupted tool phase).
pub enum ResumePoint {
    Fresh { input: String },
    ReplayToolCalls { assistant_step: Box<Step>, missing: Vec<ToolCallRecord> },
    /// The kept tail already ends with a user step or closed tool results;
    /// call the model against existing history without appending anything.
    ContinueFromHistory,
}

/// Run `agent` to completion starting from `resume`. A model, store, or
/// timeout failure is fatal to this run: `RUN_FAILED` is emitted and the
/// error propagates so parent Runnables fail too (no automatic recovery at
/// this layer).
pub async fn run_agent(agent: &Agent, pipeline: &StepPipeline, resume: ResumePoint) -> Result<RunOutcome> {
    match run_agent_inner(agent, pipeline, resume).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            pipeline.emit_run_failed(&err);
            Err(err)
        }
    }
}

async fn run_agent_inner(agent: &Agent, pipeline: &StepPipeline, resume: ResumePoint) -> Result<RunOutcome> {
    let context = pipeline.context().clone();

    let input_for_event = match &resume {
        ResumePoint::Fresh { input } => input.clone(),
        ResumePoint::ReplayToolCalls { .. } | ResumePoint::ContinueFromHistory => String::new(),
    };
    pipeline.emit_run_started(&input_for_event);

    if let ResumePoint::Fresh { input } = &resume {
        let mut user_step = pipeline.new_pending_step(Role::User);
        user_step.content = Some(input.clone());
        pipeline.commit_step(user_step).await?;
    }

    if let ResumePoint::ReplayToolCalls { missing, .. } = &resume {
        if execute_tool_calls(agent, pipeline, &context, missing).await? {
            return aborted_outcome(pipeline).await;
        }
    }

    let scope_filter =
        if context.depth == 0 { StepFilter::default() } else { StepFilter::matches_run(context.run_id.clone()) };

    for _loop_idx in 0..agent.config.max_steps {
        if context.abort.is_aborted() {
            return aborted_outcome(pipeline).await;
        }

        let messages = build_context(&*context.store, &context.session_id, &scope_filter, Some(&agent.system_prompt))
            .await?;
        let tool_schemas: Vec<ToolSchema> = agent
            .tools
            .definitions()
            .into_iter()
            .map(|d| ToolSchema { name: d.name, description: d.description, parameters: d.parameters })
            .collect();

        let (assistant_step, was_aborted) =
            stream_assistant_step(agent, pipeline, messages, tool_schemas, &context.abort).await?;
        if was_aborted {
            return aborted_outcome(pipeline).await;
        }

        if assistant_step.tool_calls.is_empty() {
            let output = assistant_step.content.clone().unwrap_or_default();
            let metrics = pipeline.final_metrics().await?;
            pipeline.emit_run_completed(&output, metrics.clone(), TerminationReason::Natural);
            return Ok(RunOutcome { output, termination_reason: TerminationReason::Natural, metrics });
        }

        if execute_tool_calls(agent, pipeline, &context, &assistant_step.tool_calls).await? {
            return aborted_outcome(pipeline).await;
        }
    }

    let output = String::new();
    let metrics = pipeline.final_metrics().await?;
    pipeline.emit_run_completed(&output, metrics.clone(), TerminationReason::MaxSteps);
    Ok(RunOutcome { output, termination_reason: TerminationReason::MaxSteps, metrics })
}

async fn aborted_outcome(pipeline: &StepPipeline) -> Result<RunOutcome> {
    let metrics = pipeline.final_metrics().await?;
    pipeline.emit_run_completed("", metrics.clone(), TerminationReason::Aborted);
    Ok(RunOutcome { output: String::new(), termination_reason: TerminationReason::Aborted, metrics })
}

/// Stream one assistant turn, assembling a pending Step from `StepDelta`s as
/// they arrive and emitting each as a `STEP_DELTA`, then finalize and commit
/// it once the provider stream ends.
async fn stream_assistant_step(
    agent: &Agent,
    pipeline: &StepPipeline,
    messages: Vec<art_types::Message>,
    tool_schemas: Vec<ToolSchema>,
    abort: &AbortSignal,
) -> Result<(Step, bool)> {
    let started = std::time::Instant::now();
    let mut pending = pipeline.new_pending_step(Role::Assistant);
    let mut content = String::new();
    let mut reasoning = String::new();
    // Index-keyed slots: id/name are late-bound (often present only on the
    // fragment that introduces that index), arguments accumulate in arrival
    // order as opaque text until the step finalizes.
    let mut tc_slots: HashMap<u32, (Option<String>, Option<String>, String)> = HashMap::new();
    let mut tc_order: Vec<u32> = Vec::new();
    let mut model_name: Option<String> = None;
    let mut aborted = false;

    let mut stream = agent.model.stream(messages, tool_schemas, ChatParams::default()).await?;

    while let Some(chunk) = stream.next().await {
        if abort.is_aborted() {
            aborted = true;
            break;
        }

        let chunk: ProviderDelta = chunk?;

        let mut delta = StepDelta::default();
        if let Some(text) = &chunk.text {
            content.push_str(text);
            delta.content_append = Some(text.clone());
        }
        if let Some(r) = &chunk.reasoning {
            reasoning.push_str(r);
            delta.reasoning_append = Some(r.clone());
        }
        for frag in &chunk.tool_call_fragments {
            let slot = tc_slots.entry(frag.index).or_insert_with(|| {
                tc_order.push(frag.index);
                (None, None, String::new())
            });
            if slot.0.is_none() {
                slot.0 = frag.id.clone();
            }
            if slot.1.is_none() {
                slot.1 = frag.name.clone();
            }
            if let Some(args_fragment) = &frag.arguments_fragment {
                slot.2.push_str(args_fragment);
            }
            delta.tool_calls_patch.push(ToolCallPatch {
                index: frag.index,
                id: frag.id.clone(),
                name: frag.name.clone(),
                arguments_append: frag.arguments_fragment.clone(),
            });
        }
        if chunk.model_name.is_some() {
            model_name = chunk.model_name.clone();
        }
        if let Some(usage) = &chunk.usage {
            pending.metrics.input_tokens = usage.input_tokens;
            pending.metrics.output_tokens = usage.output_tokens;
            pending.metrics.cache_read_tokens = usage.cache_read_tokens;
            pending.metrics.cache_creation_tokens = usage.cache_creation_tokens;
        }

        pipeline.emit_step_delta(&pending.id, delta);
    }

    pending.content = if content.is_empty() { None } else { Some(content) };
    pending.reasoning_content = if reasoning.is_empty() { None } else { Some(reasoning) };
    pending.metrics.model_name = model_name.clone();
    pending.metrics.provider = Some(agent.model.provider_id().to_string());
    pending.metrics.duration_ms = Some(started.elapsed().as_millis() as u64);

    pending.tool_calls = tc_order
        .into_iter()
        .filter_map(|index| {
            let (id, name, arguments) = tc_slots.remove(&index)?;
            Some(ToolCallRecord { id: id.unwrap_or_default(), name: name.unwrap_or_default(), arguments })
        })
        .collect();

    let committed = pipeline.commit_step(pending).await?;
    Ok((committed, aborted))
}

/// Execute a set of tool calls (in parallel when configured and there are
/// at least two), persisting a role=tool Step and emitting
/// `TOOL_CALL_STARTED`/`TOOL_CALL_COMPLETED` for each. Returns whether abort
/// fired, in which case the caller stops rather than looping again — every
/// `TOOL_CALL_STARTED` already emitted here is always followed by its
/// `TOOL_CALL_COMPLETED` before this function returns, so no tool step is
/// ever left without a terminal status on the Wire.
async fn execute_tool_calls(
    agent: &Agent,
    pipeline: &StepPipeline,
    context: &ExecutionContext,
    calls: &[ToolCallRecord],
) -> Result<bool> {
    if calls.is_empty() {
        return Ok(false);
    }

    if context.abort.is_aborted() {
        return Ok(true);
    }

    let run_one = |call: ToolCallRecord| {
        let tools = agent.tools.clone();
        let context = context.clone();
        async move { run_single_tool_call(&tools, &context, call).await }
    };

    if agent.config.parallel_tool_calls && calls.len() >= 2 {
        for call in calls {
            pipeline.emit_tool_call_started(&call.id, &call.name, &call.arguments);
        }
        let outcomes: Vec<(ToolCallRecord, Step, ToolCallStatus, u64)> =
            futures_util::future::join_all(calls.iter().cloned().map(run_one)).await;
        for (call, step, status, duration_ms) in outcomes {
            let result_text = step.content.clone().unwrap_or_default();
            pipeline.commit_step(step).await?;
            pipeline.emit_tool_call_completed(&call.id, &result_text, status, duration_ms);
        }
        return Ok(false);
    }

    for call in calls.iter().cloned() {
        if context.abort.is_aborted() {
            return Ok(true);
        }
        pipeline.emit_tool_call_started(&call.id, &call.name, &call.arguments);
        let (call, step, status, duration_ms) = run_one(call).await;
        let result_text = step.content.clone().unwrap_or_default();
        pipeline.commit_step(step).await?;
        pipeline.emit_tool_call_completed(&call.id, &result_text, status, duration_ms);
    }

    Ok(false)
}

async fn run_single_tool_call(
    tools: &ToolRegistry,
    context: &ExecutionContext,
    call: ToolCallRecord,
) -> (ToolCallRecord, Step, ToolCallStatus, u64) {
    let started = std::time::Instant::now();

    let tool = match resolve(tools, &call.name) {
        Ok(tool) => tool,
        Err(_) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            let mut step = tool_result_step(context, &call, &format!("tool not found: {}", call.name));
            step.metrics.duration_ms = Some(duration_ms);
            return (call, step, ToolCallStatus::Failed, duration_ms);
        }
    };

    let args: serde_json::Value = match serde_json::from_str(&call.arguments) {
        Ok(v) => v,
        Err(e) => {
            let err = tool_arg_invalid(&call.name, e.to_string());
            let duration_ms = started.elapsed().as_millis() as u64;
            let mut step = tool_result_step(context, &call, &err.to_string());
            step.metrics.duration_ms = Some(duration_ms);
            return (call, step, ToolCallStatus::Failed, duration_ms);
        }
    };

    match tool.execute(args, context, &context.abort).await {
        Ok(result) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            let mut step = tool_result_step(context, &call, &result.content);
            step.metrics.duration_ms = Some(duration_ms);
            let status = if result.is_success { ToolCallStatus::Completed } else { ToolCallStatus::Failed };
            (call, step, status, duration_ms)
        }
        Err(e) => {
            let err = tool_execution_error(&call.name, e.to_string());
            let duration_ms = started.elapsed().as_millis() as u64;
            let mut step = tool_result_step(context, &call, &err.to_string());
            step.metrics.duration_ms = Some(duration_ms);
            (call, step, ToolCallStatus::Failed, duration_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use art_providers::{ScriptedModelClient, ToolCallFragment};
    use art_sessions::InMemorySessionStore;
    use art_tools::{Tool, ToolResult};
    use art_types::{Event, ExecutionConfig, RunnableType};
    use art_wire::Wire;
    use async_trait::async_trait;

    use super::*;
    use crate::runnable::Runnable;

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
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
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

    fn root_context(store: Arc<dyn art_sessions::SessionStore>) -> ExecutionContext {
        ExecutionContext::root("session-1", RunnableType::Agent, "assistant", Wire::new(), store)
    }

    #[tokio::test]
    async fn simple_question_answer_commits_user_and_assistant_steps() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let agent = Agent::new("assistant", "be helpful", Arc::new(ScriptedModelClient::text_only("hi there")));
        let context = root_context(store.clone());
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "hello".into() }).await.unwrap();

        assert_eq!(outcome.output, "hi there");
        assert_eq!(outcome.termination_reason, TerminationReason::Natural);

        let steps = store.get_steps("session-1", &StepFilter::default()).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].role, Role::User);
        assert_eq!(steps[1].role, Role::Assistant);
        assert!(steps[0].sequence < steps[1].sequence);
    }

    #[tokio::test]
    async fn single_tool_round_closes_the_call_before_final_answer() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let tools = Arc::new(art_tools::ToolRegistry::new());
        tools.register(Arc::new(UppercaseTool));

        let model = ScriptedModelClient::tool_call_then_text(
            "uppercase",
            "call-1",
            r#"{"text":"shout"}"#,
            "done shouting",
        );
        let agent =
            Agent::new("assistant", "be helpful", Arc::new(model)).with_tools(tools).with_config(ExecutionConfig {
                max_steps: 5,
                ..Default::default()
            });
        let context = root_context(store.clone());
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "shout please".into() }).await.unwrap();

        assert_eq!(outcome.output, "done shouting");

        let steps = store.get_steps("session-1", &StepFilter::default()).await.unwrap();
        // user, assistant(tool_calls=[call-1]), tool(result), assistant(final)
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[1].tool_calls.len(), 1);
        assert_eq!(steps[2].role, Role::Tool);
        assert_eq!(steps[2].tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(steps[2].content.as_deref(), Some("SHOUT"));
        assert_eq!(steps[3].role, Role::Assistant);
        assert!(steps[3].tool_calls.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_name_produces_a_failed_tool_step_and_the_run_continues() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let tools = Arc::new(art_tools::ToolRegistry::new());

        let model = ScriptedModelClient::tool_call_then_text("missing-tool", "call-1", "{}", "recovered");
        let agent = Agent::new("assistant", "be helpful", Arc::new(model)).with_tools(tools);
        let context = root_context(store.clone());
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "go".into() }).await.unwrap();

        assert_eq!(outcome.output, "recovered");
        let steps = store.get_steps("session-1", &StepFilter::default()).await.unwrap();
        let tool_step = steps.iter().find(|s| s.role == Role::Tool).unwrap();
        assert!(tool_step.content.as_deref().unwrap().contains("tool not found"));
    }

    #[tokio::test]
    async fn max_steps_of_one_terminates_without_a_final_model_call() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let tools = Arc::new(art_tools::ToolRegistry::new());
        tools.register(Arc::new(UppercaseTool));

        // Scripted for two turns, but max_steps=1 means only the first (a
        // tool call) is ever requested; the loop exits via MaxSteps instead
        // of making the follow-up call.
        let model = ScriptedModelClient::tool_call_then_text("uppercase", "call-1", r#"{"text":"a"}"#, "unused");
        let agent = Agent::new("assistant", "be helpful", Arc::new(model))
            .with_tools(tools)
            .with_config(ExecutionConfig { max_steps: 1, ..Default::default() });
        let context = root_context(store.clone());
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "go".into() }).await.unwrap();

        assert_eq!(outcome.termination_reason, TerminationReason::MaxSteps);
    }

    #[tokio::test]
    async fn nested_agent_via_agent_as_tool_commits_under_its_own_run_id() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let inner_agent =
            Arc::new(Agent::new("researcher", "research things", Arc::new(ScriptedModelClient::text_only("42"))));
        let inner = Runnable::Agent(inner_agent);
        let tool = Arc::new(crate::agent_as_tool::AgentAsTool::new(inner, "ask_researcher", "delegate", 5));

        let tools = Arc::new(art_tools::ToolRegistry::new());
        tools.register(tool);

        let outer_model =
            ScriptedModelClient::tool_call_then_text("ask_researcher", "call-1", r#"{"input":"what is it"}"#, "it's 42");
        let outer = Agent::new("coordinator", "coordinate", Arc::new(outer_model)).with_tools(tools);
        let context = root_context(store.clone());
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&outer, &pipeline, ResumePoint::Fresh { input: "delegate please".into() }).await.unwrap();

        assert_eq!(outcome.output, "it's 42");
        let steps = store.get_steps("session-1", &StepFilter::default()).await.unwrap();
        let tool_step = steps.iter().find(|s| s.role == Role::Tool).unwrap();
        assert_eq!(tool_step.content.as_deref(), Some("42"));
        assert_eq!(tool_step.run_id, context.run_id);

        // the nested agent's own assistant step ran under a distinct run_id
        // than the coordinator's root run.
        let nested_step = steps.iter().find(|s| s.role == Role::Assistant && s.content.as_deref() == Some("42")).unwrap();
        assert_ne!(nested_step.run_id, context.run_id);
        assert_eq!(nested_step.nesting.depth, 1);
    }

    /// A model client that fires an `AbortSignal` partway through its
    /// streamed chunks, to exercise abort observed mid-stream rather than
    /// only at the top of the loop.
    struct AbortingModelClient {
        abort: art_context::AbortSignal,
    }

    #[async_trait]
    impl ModelClient for AbortingModelClient {
        async fn stream(
            &self,
            _messages: Vec<art_types::Message>,
            _tool_schemas: Vec<ToolSchema>,
            _params: ChatParams,
        ) -> Result<futures_core::stream::BoxStream<'static, Result<ProviderDelta>>> {
            let abort = self.abort.clone();
            let chunks = vec![
                ProviderDelta { text: Some("ab".into()), ..Default::default() },
                ProviderDelta { text: Some("cd".into()), ..Default::default() },
                ProviderDelta { text: Some("ef".into()), ..Default::default() },
            ];
            let stream = futures_util::stream::iter(chunks.into_iter().enumerate()).map(move |(i, delta)| {
                if i == 1 {
                    abort.fire();
                }
                Ok(delta)
            });
            Ok(Box::pin(stream))
        }

        fn provider_id(&self) -> &str {
            "aborting"
        }
    }

    #[tokio::test]
    async fn abort_mid_stream_breaks_out_and_commits_a_partial_step() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let context = root_context(store.clone());
        let model = AbortingModelClient { abort: context.abort.clone() };
        let agent = Agent::new("assistant", "be helpful", Arc::new(model));
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "go".into() }).await.unwrap();

        assert_eq!(outcome.termination_reason, TerminationReason::Aborted);

        let steps = store.get_steps("session-1", &StepFilter::default()).await.unwrap();
        let assistant_step = steps.iter().find(|s| s.role == Role::Assistant).unwrap();
        assert_eq!(assistant_step.content.as_deref(), Some("ab"));
    }

    #[tokio::test]
    async fn parallel_tool_calls_both_complete_and_their_events_interleave() {
        let store: Arc<dyn art_sessions::SessionStore> = Arc::new(InMemorySessionStore::new());
        let tools = Arc::new(art_tools::ToolRegistry::new());
        tools.register(Arc::new(UppercaseTool));

        let model = ScriptedModelClient::new(vec![
            vec![ProviderDelta {
                tool_call_fragments: vec![
                    ToolCallFragment {
                        index: 0,
                        id: Some("call-1".into()),
                        name: Some("uppercase".into()),
                        arguments_fragment: Some(r#"{"text":"a"}"#.into()),
                    },
                    ToolCallFragment {
                        index: 1,
                        id: Some("call-2".into()),
                        name: Some("uppercase".into()),
                        arguments_fragment: Some(r#"{"text":"b"}"#.into()),
                    },
                ],
                usage: Some(art_providers::DeltaUsage::default()),
                ..Default::default()
            }],
            vec![ProviderDelta { text: Some("done".into()), ..Default::default() }],
        ]);
        let agent = Agent::new("assistant", "be helpful", Arc::new(model)).with_tools(tools).with_config(
            ExecutionConfig { max_steps: 5, parallel_tool_calls: true, ..Default::default() },
        );
        let context = root_context(store.clone());
        let mut events = Box::pin(context.wire.subscribe());
        let pipeline = StepPipeline::new(context.clone());

        let outcome = run_agent(&agent, &pipeline, ResumePoint::Fresh { input: "shout both".into() }).await.unwrap();
        assert_eq!(outcome.output, "done");

        let steps = store.get_steps("session-1", &StepFilter::default()).await.unwrap();
        let mut tool_contents: Vec<&str> =
            steps.iter().filter(|s| s.role == Role::Tool).map(|s| s.content.as_deref().unwrap()).collect();
        tool_contents.sort();
        assert_eq!(tool_contents, vec!["A", "B"]);

        let mut started = 0;
        let mut completed = 0;
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), events.next()).await
        {
            match event {
                Event::ToolCallStarted { .. } => started += 1,
                Event::ToolCallCompleted { .. } => completed += 1,
                _ => {}
            }
        }
        assert_eq!(started, 2);
        assert_eq!(completed, 2);
    }
}
