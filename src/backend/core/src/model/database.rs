//! `DatabaseConfig` — a named, pooled connection target.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Set by the `ConfigSource` from the map key the entry was loaded
    /// under, not read from the entry body itself.
    #[serde(skip_deserializing, default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub pool: PoolSettings,
}

fn default_driver() -> String {
    "postgresql".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_max_lifetime_ms")]
    pub max_lifetime_ms: u64,
    #[serde(default = "default_leak_detection_ms")]
    pub leak_detection_ms: u64,
    #[serde(default = "default_test_query")]
    pub test_query: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            min_idle: default_min_idle(),
            connection_timeout_ms: default_connection_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_lifetime_ms: default_max_lifetime_ms(),
            leak_detection_ms: default_leak_detection_ms(),
            test_query: default_test_query(),
        }
    }
}

fn default_max_size() -> u32 {
    10
}
fn default_min_idle() -> u32 {
    1
}
fn default_connection_timeout_ms() -> u64 {
    30_000
}
fn default_idle_timeout_ms() -> u64 {
    600_000
}
fn default_max_lifetime_ms() -> u64 {
    1_800_000
}
fn default_leak_detection_ms() -> u64 {
    0
}
fn default_test_query() -> String {
    "SELECT 1".to_string()
}
