//! A trivial illustrative `ModelClient`: echoes the last user message back,
//! uppercased, with no tool calls. Lets `art-cli` demonstrate a full run
//! without wiring up a real vendor key.

use art_types::{Message, Result, Role};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::stream;

use crate::traits::{ChatParams, ModelClient, ProviderDelta, ToolSchema};

pub struct EchoModelClient;

#[async_trait]
impl ModelClient for EchoModelClient {
    async fn stream(
        &self,
        messages: Vec<Message>,
        _tool_schemas: Vec<ToolSchema>,
        _params: ChatParams,
    ) -> Result<BoxStream<'static, Result<ProviderDelta>>> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        let text = format!("echo: {}", last_user.to_uppercase());
        let delta = ProviderDelta { text: Some(text), model_name: Some("echo-1".into()), ..Default::default() };
        Ok(Box::pin(stream::iter(vec![Ok(delta)])))
    }

    fn provider_id(&self) -> &str {
        "echo"
    }
}
