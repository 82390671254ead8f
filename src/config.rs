use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Range cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    /// Number of lines fetched for the initial window and for each prefetch
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Extra lines rendered above and below the visible viewport
    #[serde(default = "default_overscan")]
    pub overscan: usize,

    /// When false, no fetch or save is ever issued
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Line count assumed before the first fetch reports the real one
    #[serde(default)]
    pub initial_total_lines: usize,
}

fn default_chunk_size() -> usize {
    200
}

fn default_overscan() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overscan: default_overscan(),
            enabled: true,
            initial_total_lines: 0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults. The result is validated.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
