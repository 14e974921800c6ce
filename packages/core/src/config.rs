//! Configuration for the object-graph mapper
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default broadcast capacity of each model's event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Settings shared by every model created from one holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Events a slow subscriber may fall behind before it starts losing them
    pub event_channel_capacity: usize,

    /// Apply pending constraints and indexes before each create
    pub auto_apply_indexes: bool,

    /// Filter used by `init_tracing` when `RUST_LOG` is not set
    pub log_filter: String,

    /// Log parameter values along with statements (may include personal data)
    pub log_statements: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            auto_apply_indexes: true,
            log_filter: "info".to_string(),
            log_statements: false,
        }
    }
}

impl MapperConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.log_filter.trim().is_empty() {
            return Err("log_filter cannot be empty".to_string());
        }

        Ok(())
    }

    /// Load a JSON config file; missing keys take their defaults
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: MapperConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        if let Err(msg) = config.validate() {
            bail!("Invalid config in {}: {}", path.display(), msg);
        }
        Ok(config)
    }
}
