//! SessionStore: the interface over the durable, flat, ordered log of Steps.
//!
//! Concrete persistence (MongoDB, a file-backed log, etc.) is out of scope
//! for the core; this crate defines the contract plus one in-memory
//! reference implementation sufficient to drive the engine and tests.

use std::collections::HashMap;

use art_types::{Error, Result, Step, StepFilter};
use async_trait::async_trait;
use parking_lot::RwLock;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, step: Step) -> Result<Step>;
    async fn bulk_insert(&self, steps: Vec<Step>) -> Result<()>;
    async fn get_steps(&self, session_id: &str, filter: &StepFilter) -> Result<Vec<Step>>;
    async fn get_last_step(&self, session_id: &str) -> Result<Option<Step>>;
    async fn delete_from(&self, session_id: &str, sequence: u64) -> Result<u64>;
    async fn next_sequence(&self, session_id: &str) -> Result<u64>;
}

#[derive(Default)]
struct SessionLog {
    steps: Vec<Step>,
    next_sequence: u64,
}

/// Reference `SessionStore` backed by process memory. Sequence allocation is
/// atomic per session via a counter guarded by the same lock that guards the
/// log, matching the "session-scoped lock or equivalent atomic counter"
/// requirement for implementations over external databases.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(step: &Step, filter: &StepFilter) -> bool {
    if let Some(run_id) = &filter.run_id {
        if &step.run_id != run_id {
            return false;
        }
    }
    if let Some(workflow_id) = &filter.workflow_id {
        if step.nesting.workflow_id.as_deref() != Some(workflow_id.as_str()) {
            return false;
        }
    }
    if let Some(node_id) = &filter.node_id {
        if step.nesting.node_id.as_deref() != Some(node_id.as_str()) {
            return false;
        }
    }
    if let Some(branch_key) = &filter.branch_key {
        if step.nesting.branch_key.as_deref() != Some(branch_key.as_str()) {
            return false;
        }
    }
    true
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, mut step: Step) -> Result<Step> {
        let mut sessions = self.sessions.write();
        let log = sessions.entry(step.session_id.clone()).or_default();
        if step.sequence == 0 {
            log.next_sequence += 1;
            step.sequence = log.next_sequence;
        } else {
            log.next_sequence = log.next_sequence.max(step.sequence);
        }
        log.steps.push(step.clone());
        Ok(step)
    }

    async fn bulk_insert(&self, steps: Vec<Step>) -> Result<()> {
        let mut sessions = self.sessions.write();
        for step in steps {
            let log = sessions.entry(step.session_id.clone()).or_default();
            log.next_sequence = log.next_sequence.max(step.sequence);
            log.steps.push(step);
        }
        Ok(())
    }

    async fn get_steps(&self, session_id: &str, filter: &StepFilter) -> Result<Vec<Step>> {
        let sessions = self.sessions.read();
        let mut steps = sessions
            .get(session_id)
            .map(|log| log.steps.clone())
            .unwrap_or_default();
        steps.retain(|s| matches(s, filter));
        steps.sort_by_key(|s| s.sequence);
        Ok(steps)
    }

    async fn get_last_step(&self, session_id: &str) -> Result<Option<Step>> {
        let sessions = self.sessions.read();
        Ok(sessions.get(session_id).and_then(|log| log.steps.iter().max_by_key(|s| s.sequence).cloned()))
    }

    async fn delete_from(&self, session_id: &str, sequence: u64) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let Some(log) = sessions.get_mut(session_id) else {
            return Ok(0);
        };
        let before = log.steps.len();
        log.steps.retain(|s| s.sequence < sequence);
        let removed = (before - log.steps.len()) as u64;
        tracing::info!(session_id, sequence, removed, "truncated session steps");
        Ok(removed)
    }

    async fn next_sequence(&self, session_id: &str) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let log = sessions.entry(session_id.to_string()).or_default();
        log.next_sequence += 1;
        Ok(log.next_sequence)
    }
}

pub fn store_error(message: impl Into<String>) -> Error {
    Error::Store(message.into())
}
