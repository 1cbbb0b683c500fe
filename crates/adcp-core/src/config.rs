//! Configuration management for adcp tools.
//!
//! Configuration is loaded from (in priority order):
//! 1. Command-line flags (applied by the binary after loading)
//! 2. Environment variables (`ADCP__` prefix, `__` separator,
//!    e.g. `ADCP__NEO4J__URI`)
//! 3. Config file (`adcp.toml` by default)
//! 4. Defaults

use serde::Deserialize;

use crate::aliases::DEFAULT_LANGUAGE;
use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdcpConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub control_path: ControlPathSettings,

    /// Root of the ACL dump directory holding `Relations/*.deny.csv`.
    #[serde(default)]
    pub workdir: Option<String>,

    /// Alias table language.
    #[serde(default = "default_lang")]
    pub lang: String,
}

/// Connection settings for the Neo4j store.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Tuning for control-path computations.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPathSettings {
    /// Maximum number of expansion rounds.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Per-request deadline. `None` disables it.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum number of concurrent computations in batch mode.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_lang() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_max_depth() -> usize {
    20
}

fn default_batch_concurrency() -> usize {
    4
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: String::new(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for ControlPathSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            timeout_secs: None,
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

impl Default for AdcpConfig {
    fn default() -> Self {
        Self {
            neo4j: Neo4jSettings::default(),
            control_path: ControlPathSettings::default(),
            workdir: None,
            lang: default_lang(),
        }
    }
}

impl AdcpConfig {
    /// Load configuration from an optional file and the environment.
    ///
    /// `file_prefix` is passed to `config::File::with_name`, so both
    /// `adcp` (any supported extension) and `path/to/adcp.toml` work.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("ADCP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: AdcpConfig = cfg.try_deserialize()?;
        tracing::debug!(
            uri = %loaded.neo4j.uri,
            max_depth = loaded.control_path.max_depth,
            lang = %loaded.lang,
            "Configuration loaded"
        );
        Ok(loaded)
    }
}
