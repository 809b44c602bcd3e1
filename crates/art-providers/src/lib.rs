//! Provider-neutral abstraction over LLM streaming chat completion.

pub mod echo;
pub mod scripted;
pub mod traits;

pub use echo::EchoModelClient;
pub use scripted::ScriptedModelClient;
pub use traits::{ChatParams, DeltaUsage, ModelClient, ProviderDelta, ToolCallFragment, ToolSchema};
