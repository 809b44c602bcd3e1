//! The runnable driven by every subcommand: a single agent wired to the
//! illustrative echo provider and echo tool, bound by the loaded config.
//! Swapping in a real `ModelClient` is the only change needed to point
//! this CLI at a genuine provider.

use std::sync::Arc;

use art_engine::{Agent, Runnable};
use art_providers::EchoModelClient;
use art_tools::{EchoTool, ToolRegistry};

use crate::config::Config;

pub fn build_runnable(config: &Config) -> Runnable {
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(EchoTool));

    let agent = Agent::new("assistant", "You are a helpful assistant.", Arc::new(EchoModelClient))
        .with_tools(tools)
        .with_config(config.execution.clone());

    Runnable::Agent(Arc::new(agent))
}
