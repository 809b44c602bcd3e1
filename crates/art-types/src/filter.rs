//! Query predicates used by SessionStore implementations to scope reads.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepFilter {
    pub run_id: Option<String>,
    pub workflow_id: Option<String>,
    pub node_id: Option<String>,
    pub branch_key: Option<String>,
}

impl StepFilter {
    pub fn matches_run(run_id: impl Into<String>) -> Self {
        Self { run_id: Some(run_id.into()), ..Default::default() }
    }

    pub fn matches_workflow(workflow_id: impl Into<String>) -> Self {
        Self { workflow_id: Some(workflow_id.into()), ..Default::default() }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_branch(mut self, branch_key: impl Into<String>) -> Self {
        self.branch_key = Some(branch_key.into());
        self
    }
}
