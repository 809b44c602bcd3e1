//! AgentAsTool: adapts any Runnable (agent or workflow) into a Tool,
//! enforcing the depth and cycle guards a nested entry must never elide.

use art_context::ExecutionContext;
use art_tools::{Tool, ToolResult};
use art_types::{NestingType, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::{cycle_detected, depth_exceeded};
use crate::runnable::Runnable;

pub struct AgentAsTool {
    inner: Runnable,
    tool_name: String,
    description: String,
    max_nesting_depth: u32,
}

impl AgentAsTool {
    pub fn new(inner: Runnable, tool_name: impl Into<String>, description: impl Into<String>, max_nesting_depth: u32) -> Self {
        Self { inner, tool_name: tool_name.into(), description: description.into(), max_nesting_depth }
    }
}

#[async_trait]
impl Tool for AgentAsTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "input": { "type": "string" } },
            "required": ["input"],
        })
    }

    async fn execute(&self, args: Value, context: &ExecutionContext, _abort: &art_context::AbortSignal) -> Result<ToolResult> {
        if context.depth + 1 > self.max_nesting_depth {
            return Err(depth_exceeded(context.depth + 1, self.max_nesting_depth));
        }
        if context.would_cycle(self.inner.id()) {
            return Err(cycle_detected(self.inner.id()));
        }

        let input = args.get("input").and_then(Value::as_str).unwrap_or_default().to_string();

        let child_context = context.child(self.inner.runnable_type(), self.inner.id(), NestingType::ToolCall);

        let outcome = self.inner.run(input, child_context).await?;
        Ok(ToolResult::success(outcome.output))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use art_context::AbortSignal;
    use art_providers::ScriptedModelClient;
    use art_sessions::InMemorySessionStore;
    use art_types::RunnableType;
    use art_wire::Wire;

    use super::*;
    use crate::agent::Agent;

    fn ctx(depth: u32, call_chain: Vec<String>) -> ExecutionContext {
        let mut c = ExecutionContext::root(
            "s1",
            RunnableType::Agent,
            "root",
            Wire::new(),
            Arc::new(InMemorySessionStore::new()) as Arc<dyn art_sessions::SessionStore>,
        );
        c.depth = depth;
        c.call_chain = call_chain;
        c
    }

    fn researcher_tool(max_depth: u32) -> AgentAsTool {
        let agent = Arc::new(Agent::new("researcher", "research", Arc::new(ScriptedModelClient::text_only("ok"))));
        AgentAsTool::new(Runnable::Agent(agent), "ask_researcher", "delegate", max_depth)
    }

    #[tokio::test]
    async fn rejects_entry_past_max_nesting_depth() {
        let tool = researcher_tool(1);
        let context = ctx(1, vec![]);
        let err = tool
            .execute(serde_json::json!({"input": "go"}), &context, &AbortSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), art_types::ErrorKind::DepthExceeded);
    }

    #[tokio::test]
    async fn rejects_reentry_of_a_runnable_already_in_the_call_chain() {
        let tool = researcher_tool(10);
        let context = ctx(1, vec!["researcher".to_string()]);
        let err = tool
            .execute(serde_json::json!({"input": "go"}), &context, &AbortSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), art_types::ErrorKind::CycleDetected);
    }

    #[tokio::test]
    async fn runs_the_nested_runnable_when_within_bounds() {
        let tool = researcher_tool(5);
        let context = ctx(0, vec![]);
        let result = tool
            .execute(serde_json::json!({"input": "go"}), &context, &AbortSignal::new())
            .await
            .unwrap();
        assert_eq!(result.content, "ok");
        assert!(result.is_success);
    }
}
