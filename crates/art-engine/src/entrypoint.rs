//! The two ways a caller drives a Runnable: `run_stream` for live event
//! consumption, `run` for a single blocking outcome.

use std::sync::Arc;

use art_context::ExecutionContext;
use art_sessions::SessionStore;
use art_types::{ErrorKind, Event, RunMetrics, TerminationReason};
use art_wire::Wire;
use futures_core::Stream;
use uuid::Uuid;

use crate::runnable::Runnable;

#[derive(Debug, Clone)]
pub struct RunOutputError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub response: String,
    pub run_id: String,
    pub metrics: RunMetrics,
    pub termination_reason: TerminationReason,
    pub error: Option<RunOutputError>,
}

/// Create a Wire, construct the root `ExecutionContext`, and drive
/// `runnable` to completion in a background task while returning a stream
/// bound to the Wire. The Wire is closed in a guaranteed-release scope when
/// the root run terminates, regardless of outcome.
pub fn run_stream(
    runnable: Runnable,
    input: String,
    session_id: Option<String>,
    user_id: Option<String>,
    store: Arc<dyn SessionStore>,
) -> (String, impl Stream<Item = Event> + Send + 'static) {
    let wire = Wire::new();
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let context = ExecutionContext::root(session_id, runnable.runnable_type(), runnable.id(), wire.clone(), store);
    let run_id = context.run_id.clone();

    if let Some(user_id) = user_id {
        tracing::info!(run_id = %run_id, user_id = %user_id, "run started");
    }

    let stream = wire.subscribe();
    let wire_for_task = wire;

    let run_id_for_task = run_id.clone();
    tokio::spawn(async move {
        let result = runnable.run(input, context).await;
        if let Err(err) = &result {
            tracing::warn!(run_id = %run_id_for_task, error = %err, "run failed");
        }
        wire_for_task.close();
    });

    (run_id, stream)
}

/// Wrap `run_stream`, consuming events internally, and return the final
/// outcome. Events are still produced and discarded — callers wanting to
/// observe them should use `run_stream` directly.
pub async fn run(
    runnable: Runnable,
    input: String,
    session_id: Option<String>,
    store: Arc<dyn SessionStore>,
) -> RunOutput {
    use tokio_stream::StreamExt;

    let (run_id, stream) = run_stream(runnable, input, session_id, None, store);
    tokio::pin!(stream);

    let mut response = String::new();
    let mut metrics = RunMetrics::default();
    let mut termination_reason = TerminationReason::Natural;
    let mut error = None;

    while let Some(event) = stream.next().await {
        match event {
            Event::RunCompleted { output, metrics: m, termination_reason: reason, run_id: event_run_id }
                if event_run_id == run_id =>
            {
                response = output;
                metrics = m;
                termination_reason = reason;
            }
            Event::RunFailed { error_kind, message, run_id: event_run_id } if event_run_id == run_id => {
                termination_reason = TerminationReason::Failed;
                error = Some(RunOutputError { kind: error_kind, message });
            }
            _ => {}
        }
    }

    RunOutput { response, run_id, metrics, termination_reason, error }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use art_providers::ScriptedModelClient;
    use art_sessions::InMemorySessionStore;

    use super::*;
    use crate::agent::Agent;

    #[tokio::test]
    async fn run_collects_the_final_outcome_from_the_event_stream() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let agent = Arc::new(Agent::new("assistant", "help", Arc::new(ScriptedModelClient::text_only("done"))));
        let runnable = Runnable::Agent(agent);

        let output = run(runnable, "hello".into(), Some("s1".into()), store).await;

        assert_eq!(output.response, "done");
        assert_eq!(output.termination_reason, TerminationReason::Natural);
        assert!(output.error.is_none());
    }

    #[tokio::test]
    async fn run_stream_yields_a_run_started_event_first() {
        use tokio_stream::StreamExt;

        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let agent = Arc::new(Agent::new("assistant", "help", Arc::new(ScriptedModelClient::text_only("hi"))));
        let runnable = Runnable::Agent(agent);

        let (run_id, stream) = run_stream(runnable, "hello".into(), None, None, store);
        tokio::pin!(stream);

        let first = stream.next().await.unwrap();
        match first {
            Event::RunStarted { run_id: event_run_id, .. } => assert_eq!(event_run_id, run_id),
            other => panic!("expected RunStarted, got {other:?}"),
        }
    }
}
