//! Context reconstruction: projecting a session's Steps into provider-neutral
//! messages for a model call.

use art_types::{Message, Result, StepFilter};

use crate::store::SessionStore;

/// Load all steps for `session_id` (optionally scoped by `filter`), sort by
/// sequence, and project to messages. `system_prompt`, when given, is
/// prepended as a system-role message ahead of everything else.
pub async fn build_context(
    store: &dyn SessionStore,
    session_id: &str,
    filter: &StepFilter,
    system_prompt: Option<&str>,
) -> Result<Vec<Message>> {
    let steps = store.get_steps(session_id, filter).await?;
    let mut messages = Vec::with_capacity(steps.len() + 1);
    if let Some(prompt) = system_prompt {
        messages.push(Message {
            role: art_types::Role::System,
            content: Some(prompt.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        });
    }
    messages.extend(steps.iter().map(Message::from));
    Ok(messages)
}
