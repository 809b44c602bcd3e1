//! ExecutionContext: the per-run carrier of identity, parentage, depth, and
//! the shared collaborators (Wire, SessionStore, AbortSignal) every
//! Runnable needs to execute and to spawn nested children safely.

pub mod abort;

use std::sync::Arc;

use art_sessions::SessionStore;
use art_types::{step::new_id, NestingType, RunnableType};
use art_wire::Wire;

pub use abort::AbortSignal;

/// Per-run execution context. Constructed fresh for the root run by the
/// `run_stream` entry point; nested runs derive a child context via
/// [`ExecutionContext::child`], which is the only sanctioned way to obtain
/// one (it is where depth/cycle bookkeeping happens).
#[derive(Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub session_id: String,
    pub parent_run_id: Option<String>,
    pub depth: u32,
    pub runnable_type: RunnableType,
    pub runnable_id: String,
    pub nesting_type: NestingType,
    pub wire: Wire,
    pub store: Arc<dyn SessionStore>,
    pub abort: AbortSignal,
    pub call_chain: Vec<String>,
    /// Stable identity of the enclosing workflow (its config-level id, not a
    /// run_id), set on children entered as a workflow stage. Used to scope
    /// resume-by-presence lookups across separate invocations of the same
    /// workflow.
    pub workflow_id: Option<String>,
    pub node_id: Option<String>,
    pub branch_key: Option<String>,
    pub iteration: Option<u32>,
}

impl ExecutionContext {
    /// Build the root context for a new top-level run.
    pub fn root(
        session_id: impl Into<String>,
        runnable_type: RunnableType,
        runnable_id: impl Into<String>,
        wire: Wire,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            run_id: new_id(),
            session_id: session_id.into(),
            parent_run_id: None,
            depth: 0,
            runnable_type,
            runnable_id: runnable_id.into(),
            nesting_type: NestingType::None,
            wire,
            store,
            abort: AbortSignal::new(),
            call_chain: Vec::new(),
            workflow_id: None,
            node_id: None,
            branch_key: None,
            iteration: None,
        }
    }

    /// Derive a child context for a nested Runnable entered via
    /// `nesting_type`. Shares `wire`, `store`, `session_id`, and `abort`;
    /// allocates a fresh `run_id`, increments `depth`, and appends this
    /// runnable's id to the call chain used for cycle detection.
    ///
    /// Callers performing a nested entry (AgentAsTool, workflow stages) are
    /// responsible for checking depth/cycle bounds *before* calling this —
    /// `child` itself does not reject, it only records.
    pub fn child(&self, runnable_type: RunnableType, runnable_id: impl Into<String>, nesting_type: NestingType) -> Self {
        let runnable_id = runnable_id.into();
        let mut call_chain = self.call_chain.clone();
        call_chain.push(runnable_id.clone());
        Self {
            run_id: new_id(),
            session_id: self.session_id.clone(),
            parent_run_id: Some(self.run_id.clone()),
            depth: self.depth + 1,
            runnable_type,
            runnable_id,
            nesting_type,
            wire: self.wire.clone(),
            store: self.store.clone(),
            abort: self.abort.clone(),
            call_chain,
            workflow_id: None,
            node_id: None,
            branch_key: None,
            iteration: None,
        }
    }

    pub fn would_cycle(&self, runnable_id: &str) -> bool {
        self.call_chain.iter().any(|id| id == runnable_id)
    }

    /// Project this context into the nesting metadata stamped on every Step
    /// committed under it.
    pub fn nesting_info(&self) -> art_types::NestingInfo {
        art_types::NestingInfo {
            parent_run_id: self.parent_run_id.clone(),
            runnable_id: Some(self.runnable_id.clone()),
            runnable_type: Some(self.runnable_type),
            workflow_id: self.workflow_id.clone(),
            node_id: self.node_id.clone(),
            branch_key: self.branch_key.clone(),
            iteration: self.iteration,
            depth: self.depth,
        }
    }

    /// Tag this context as executing a stage of `workflow_id` identified by
    /// `node_id`. Used by workflow executors after deriving a child context
    /// for a stage/branch/loop-body runnable.
    pub fn with_workflow_node(mut self, workflow_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_branch_key(mut self, branch_key: impl Into<String>) -> Self {
        self.branch_key = Some(branch_key.into());
        self
    }

    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use art_sessions::InMemorySessionStore;

    fn ctx() -> ExecutionContext {
        ExecutionContext::root(
            "session-1",
            RunnableType::Agent,
            "root-agent",
            Wire::new(),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    #[test]
    fn child_increments_depth_and_extends_call_chain() {
        let root = ctx();
        let child = root.child(RunnableType::Agent, "researcher", NestingType::ToolCall);
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_run_id.as_deref(), Some(root.run_id.as_str()));
        assert_eq!(child.call_chain, vec!["researcher".to_string()]);
    }

    #[test]
    fn would_cycle_detects_repeated_runnable_id() {
        let root = ctx();
        let child = root.child(RunnableType::Agent, "researcher", NestingType::ToolCall);
        assert!(child.would_cycle("researcher"));
        assert!(!child.would_cycle("writer"));
    }

    #[test]
    fn child_shares_wire_store_and_abort_with_parent() {
        let root = ctx();
        root.abort.fire();
        let child = root.child(RunnableType::Agent, "researcher", NestingType::ToolCall);
        assert!(child.abort.is_aborted());
        assert_eq!(child.session_id, root.session_id);
    }
}
