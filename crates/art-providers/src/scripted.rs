//! A deterministic `ModelClient` test double that replays a fixed script of
//! deltas per call, used across the engine's own test suite in place of a
//! live provider.

use std::sync::Mutex;

use art_types::{Error, Message, Result};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::stream;

use crate::traits::{ChatParams, DeltaUsage, ModelClient, ProviderDelta, ToolCallFragment, ToolSchema};

/// One scripted call's worth of streamed chunks.
pub type ScriptedTurn = Vec<ProviderDelta>;

/// Replays a queue of scripted turns, one per call to `stream`. Panics (in
/// test context only) if called more times than scripted turns were supplied.
pub struct ScriptedModelClient {
    turns: Mutex<std::collections::VecDeque<ScriptedTurn>>,
}

impl ScriptedModelClient {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self { turns: Mutex::new(turns.into_iter().collect()) }
    }

    /// Convenience constructor for a single plain-text response with no
    /// tool calls.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(vec![vec![ProviderDelta {
            text: Some(text.into()),
            usage: Some(DeltaUsage::default()),
            ..Default::default()
        }]])
    }

    /// Convenience constructor for a turn that emits a single tool call
    /// assembled from one fragment, followed by a text-only follow-up turn.
    pub fn tool_call_then_text(tool_name: &str, call_id: &str, arguments: &str, follow_up_text: &str) -> Self {
        Self::new(vec![
            vec![ProviderDelta {
                tool_call_fragments: vec![ToolCallFragment {
                    index: 0,
                    id: Some(call_id.to_string()),
                    name: Some(tool_name.to_string()),
                    arguments_fragment: Some(arguments.to_string()),
                }],
                usage: Some(DeltaUsage::default()),
                ..Default::default()
            }],
            vec![ProviderDelta {
                text: Some(follow_up_text.to_string()),
                usage: Some(DeltaUsage::default()),
                ..Default::default()
            }],
        ])
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn stream(
        &self,
        _messages: Vec<Message>,
        _tool_schemas: Vec<ToolSchema>,
        _params: ChatParams,
    ) -> Result<BoxStream<'static, Result<ProviderDelta>>> {
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Model("scripted model client exhausted".into()))?;
        Ok(Box::pin(stream::iter(turn.into_iter().map(Ok))))
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}
