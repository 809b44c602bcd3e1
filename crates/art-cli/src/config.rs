//! On-disk configuration loading, falling back to defaults rather than
//! failing hard when no config file is present.

use art_types::ExecutionConfig;
use serde::{Deserialize, Serialize};

/// The CLI's resolved configuration: execution bounds plus the session
/// store path. Deserializable from the toml surface at `ART_CONFIG`
/// (`art.toml` by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { execution: ExecutionConfig::default() }
    }
}

/// Load configuration from the path named by `ART_CONFIG` (or `art.toml` by
/// default). Missing files fall back to defaults rather than erroring;
/// malformed ones still fail loudly.
pub fn load_or_default() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("ART_CONFIG").unwrap_or_else(|_| "art.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        tracing::debug!(path = %config_path, "no config file found, using defaults");
        Config::default()
    };

    Ok((config, config_path))
}
