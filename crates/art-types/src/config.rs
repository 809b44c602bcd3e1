//! Execution configuration recognized by the core engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_max_steps() -> usize {
    25
}

fn default_max_nesting_depth() -> u32 {
    5
}

/// Configuration recognized by the core, independent of any specific
/// agent/workflow definition. Deserializable from the on-disk toml config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_steps: usize,
    pub parallel_tool_calls: bool,
    #[serde(with = "humantime_millis_opt")]
    pub timeout_per_step: Option<Duration>,
    #[serde(with = "humantime_millis_opt")]
    pub timeout_total_run: Option<Duration>,
    pub max_nesting_depth: u32,
    pub enable_termination_summary: bool,
    pub termination_summary_prompt: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            parallel_tool_calls: false,
            timeout_per_step: None,
            timeout_total_run: None,
            max_nesting_depth: default_max_nesting_depth(),
            enable_termination_summary: false,
            termination_summary_prompt: None,
        }
    }
}

/// Durations are configured in milliseconds in the toml surface; this keeps
/// the config file free of unit suffixes the rest of the stack doesn't use.
mod humantime_millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_millis()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let millis: Option<u64> = Option::deserialize(d)?;
        Ok(millis.map(Duration::from_millis))
    }
}
