//! Process configuration.
//!
//! Layered the way the teacher's configuration loader is: environment
//! variables (prefix `GATEWAY`, `__`-separated for nesting) over an optional
//! config file, both deserialized into this struct tree via `serde`
//! defaults.

use serde::Deserialize;

/// Top-level process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Selects and parameterizes the active `ConfigSource`.
    #[serde(default)]
    pub gateway: SourceConfig,

    /// Connection used by `DbLoader`/`MigrationService` to reach the
    /// metadata tables. Unused when `gateway.source = "yaml"`.
    #[serde(default)]
    pub metadata_database: MetadataDatabaseConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `config.source`, `config.directories` and the glob patterns that drive
/// `FileLoader`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source")]
    pub source: ConfigSourceKind,

    #[serde(default = "default_directories")]
    pub directories: Vec<String>,

    #[serde(default = "default_database_patterns")]
    pub database_patterns: Vec<String>,

    #[serde(default = "default_query_patterns")]
    pub query_patterns: Vec<String>,

    #[serde(default = "default_endpoint_patterns")]
    pub endpoint_patterns: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            directories: default_directories(),
            database_patterns: default_database_patterns(),
            query_patterns: default_query_patterns(),
            endpoint_patterns: default_endpoint_patterns(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSourceKind {
    Yaml,
    Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataDatabaseConfig {
    #[serde(default = "default_metadata_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for MetadataDatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_metadata_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    #[serde(default = "default_health_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
            ttl_secs: default_health_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Queries slower than this are counted in a pool's `slow_queries`
    /// metric, the way the teacher's `SlowQueryConfig` does.
    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
        }
    }
}

fn default_slow_query_threshold_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_source() -> ConfigSourceKind {
    ConfigSourceKind::Yaml
}
fn default_directories() -> Vec<String> {
    vec!["config".to_string()]
}
fn default_database_patterns() -> Vec<String> {
    vec!["*-database.yml".to_string(), "*-databases.yml".to_string()]
}
fn default_query_patterns() -> Vec<String> {
    vec!["*-query.yml".to_string(), "*-queries.yml".to_string()]
}
fn default_endpoint_patterns() -> Vec<String> {
    vec!["*-endpoint.yml".to_string(), "*-endpoints.yml".to_string()]
}
fn default_metadata_url() -> String {
    "postgres://localhost/sqlgate_metadata".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_probe_interval_ms() -> u64 {
    10_000
}
fn default_health_ttl_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_json_logging() -> bool {
    false
}

impl GatewayConfig {
    /// Load from environment only.
    pub fn load() -> anyhow::Result<Self> {
        let built = config::Config::builder()
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"))
            .build()?;
        Ok(built.try_deserialize()?)
    }

    /// Load from a specific file, overridable by environment.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let built = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"))
            .build()?;
        Ok(built.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_yaml_source() {
        let source = SourceConfig::default();
        assert_eq!(source.source, ConfigSourceKind::Yaml);
        assert_eq!(source.directories, vec!["config".to_string()]);
    }

    #[test]
    fn health_defaults_match_registry_lifecycle_ttl() {
        let health = HealthConfig::default();
        assert_eq!(health.ttl_secs, 30);
    }
}
