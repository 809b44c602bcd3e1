//! The ModelClient interface: the only seam between the core engine and a
//! concrete LLM provider. Implementations adapt one provider's wire format
//! into this provider-neutral delta shape.

use art_types::{Message, Result};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use serde_json::Value;

/// A tool definition as presented to the model, independent of how the
/// engine's own tool registry represents tools internally.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A positionally-addressed fragment of a streamed tool call. Mirrors
/// `art_types::event::ToolCallPatch` but is the provider-facing vocabulary
/// before the engine folds it into a `StepDelta`.
#[derive(Debug, Clone, Default)]
pub struct ToolCallFragment {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments_fragment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeltaUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_read_tokens: Option<u64>,
    pub cache_creation_tokens: Option<u64>,
}

/// One chunk of a streamed model response.
#[derive(Debug, Clone, Default)]
pub struct ProviderDelta {
    pub text: Option<String>,
    pub reasoning: Option<String>,
    pub tool_call_fragments: Vec<ToolCallFragment>,
    /// Present only on the terminal chunk of the stream.
    pub usage: Option<DeltaUsage>,
    pub model_name: Option<String>,
}

/// Abstraction over a concrete LLM provider's streaming chat completion.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn stream(
        &self,
        messages: Vec<Message>,
        tool_schemas: Vec<ToolSchema>,
        params: ChatParams,
    ) -> Result<BoxStream<'static, Result<ProviderDelta>>>;

    fn provider_id(&self) -> &str;
}
