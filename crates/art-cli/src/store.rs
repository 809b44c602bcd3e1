//! A `SessionStore` that persists to a single JSON file, loaded at startup
//! and rewritten after each mutation. The core only ships an in-memory
//! reference store; the CLI needs sessions to survive between invocations
//! for `retry`/`fork`/`sessions show` to be useful at all.

use std::collections::HashMap;
use std::path::PathBuf;

use art_sessions::SessionStore;
use art_types::{Error, Result, Step, StepFilter};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Default, Serialize, Deserialize)]
struct SessionLog {
    steps: Vec<Step>,
    next_sequence: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    sessions: HashMap<String, SessionLog>,
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

pub struct FileSessionStore {
    path: PathBuf,
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sessions = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| Error::Store(format!("reading {}: {e}", path.display())))?;
            let snapshot: Snapshot = serde_json::from_str(&raw)
                .map_err(|e| Error::Store(format!("parsing {}: {e}", path.display())))?;
            snapshot.sessions
        } else {
            HashMap::new()
        };
        Ok(Self { path, sessions: RwLock::new(sessions) })
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn persist(&self) -> Result<()> {
        let sessions = self.sessions.read();
        let snapshot = Snapshot {
            sessions: sessions
                .iter()
                .map(|(id, log)| (id.clone(), SessionLog { steps: log.steps.clone(), next_sequence: log.next_sequence }))
                .collect(),
        };
        drop(sessions);

        let raw = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Store(format!("serializing session store: {e}")))?;
        std::fs::write(&self.path, raw).map_err(|e| Error::Store(format!("writing {}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn append(&self, mut step: Step) -> Result<Step> {
        {
            let mut sessions = self.sessions.write();
            let log = sessions.entry(step.session_id.clone()).or_default();
            if step.sequence == 0 {
                log.next_sequence += 1;
                step.sequence = log.next_sequence;
            } else {
                log.next_sequence = log.next_sequence.max(step.sequence);
            }
            log.steps.push(step.clone());
        }
        self.persist()?;
        Ok(step)
    }

    async fn bulk_insert(&self, steps: Vec<Step>) -> Result<()> {
        {
            let mut sessions = self.sessions.write();
            for step in steps {
                let log = sessions.entry(step.session_id.clone()).or_default();
                log.next_sequence = log.next_sequence.max(step.sequence);
                log.steps.push(step);
            }
        }
        self.persist()
    }

    async fn get_steps(&self, session_id: &str, filter: &StepFilter) -> Result<Vec<Step>> {
        let sessions = self.sessions.read();
        let mut steps = sessions.get(session_id).map(|log| log.steps.clone()).unwrap_or_default();
        steps.retain(|s| matches(s, filter));
        steps.sort_by_key(|s| s.sequence);
        Ok(steps)
    }

    async fn get_last_step(&self, session_id: &str) -> Result<Option<Step>> {
        let sessions = self.sessions.read();
        Ok(sessions.get(session_id).and_then(|log| log.steps.iter().max_by_key(|s| s.sequence).cloned()))
    }

    async fn delete_from(&self, session_id: &str, sequence: u64) -> Result<u64> {
        let removed = {
            let mut sessions = self.sessions.write();
            let Some(log) = sessions.get_mut(session_id) else {
                return Ok(0);
            };
            let before = log.steps.len();
            log.steps.retain(|s| s.sequence < sequence);
            (before - log.steps.len()) as u64
        };
        self.persist()?;
        Ok(removed)
    }

    async fn next_sequence(&self, session_id: &str) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let log = sessions.entry(session_id.to_string()).or_default();
        log.next_sequence += 1;
        Ok(log.next_sequence)
    }
}
