//! Session store backend selection.

use serde::{Deserialize, Serialize};

/// Which backend holds collaborative session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps. Single-process deployments and tests.
    #[default]
    Memory,
    /// PostgreSQL with row-level locking. Required for multi-process deployments.
    Postgres,
}

/// Session store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StoreBackend,
}

/// Redis connection used by the cross-process broadcast relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL. Empty disables the relay.
    #[serde(default)]
    pub url: String,
}

impl RedisConfig {
    /// Whether a relay URL was configured.
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}
