//! Session operations: context reconstruction, retry, and fork are pure
//! operations over the flat step sequence. This module implements the parts
//! that don't require driving a live Runnable (deletion, copy-prefix,
//! classification of how a retry must resume); the engine crate supplies the
//! re-execution itself.

use art_types::{step::new_id, Result, Role, Step, StepFilter, ToolCallRecord};
use uuid::Uuid;

use crate::store::SessionStore;

/// What must happen to resume execution after truncating a session's tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeKind {
    /// The kept tail ends with a user step or tool results: call the model.
    CallModel,
    /// The kept tail ends with an assistant step that had tool_calls with no
    /// (or only partial) matching tool results: re-execute the missing
    /// tool_calls, then call the model.
    ReplayToolCalls { assistant_step: Box<Step>, missing: Vec<ToolCallRecord> },
    /// Nothing is left to resume from (e.g. an empty session).
    Nothing,
}

/// Delete all steps with `sequence >= n` and return the kept tail, ordered.
pub async fn truncate_from(store: &dyn SessionStore, session_id: &str, n: u64) -> Result<Vec<Step>> {
    store.delete_from(session_id, n).await?;
    store.get_steps(session_id, &StepFilter::default()).await
}

/// Classify how `kept_tail` (the steps surviving a truncation, sorted by
/// sequence) should be resumed, per the retry resume rule: an assistant step
/// whose tool_calls are not fully closed by matching tool steps must have
/// its missing tool_calls re-executed before the model is called again.
pub fn classify_resume(kept_tail: &[Step]) -> ResumeKind {
    let Some(last) = kept_tail.last() else {
        return ResumeKind::Nothing;
    };

    if last.role != Role::Assistant || last.tool_calls.is_empty() {
        return ResumeKind::CallModel;
    }

    let closed: std::collections::HashSet<&str> = kept_tail
        .iter()
        .filter(|s| s.role == Role::Tool)
        .filter_map(|s| s.tool_call_id.as_deref())
        .collect();

    let missing: Vec<ToolCallRecord> =
        last.tool_calls.iter().filter(|tc| !closed.contains(tc.id.as_str())).cloned().collect();

    if missing.is_empty() {
        ResumeKind::CallModel
    } else {
        ResumeKind::ReplayToolCalls { assistant_step: Box::new(last.clone()), missing }
    }
}

/// Allocate a fresh session id, copy all steps with `sequence <= n` from
/// `source_session_id` into it with `session_id` rewritten (and a fresh
/// step `id`), preserving sequence numbers. The source session is untouched.
pub async fn fork_at_sequence(store: &dyn SessionStore, source_session_id: &str, n: u64) -> Result<String> {
    let new_session_id = Uuid::new_v4().to_string();
    let steps = store.get_steps(source_session_id, &StepFilter::default()).await?;
    let copied: Vec<Step> = steps
        .into_iter()
        .filter(|s| s.sequence <= n)
        .map(|mut s| {
            s.id = new_id();
            s.session_id = new_session_id.clone();
            s
        })
        .collect();
    store.bulk_insert(copied).await?;
    Ok(new_session_id)
}
