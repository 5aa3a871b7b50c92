//! `ConfigSource` — two interchangeable loaders producing the same three
//! maps the Registry is built from.

pub mod db_loader;
pub mod file_loader;

pub use db_loader::DbLoader;
pub use file_loader::FileLoader;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{DatabaseConfig, EndpointConfig, QueryConfig};

/// The three maps every `ConfigSource` implementation produces, keyed by
/// each entry's own `name` field.
#[derive(Debug, Clone, Default)]
pub struct RawConfigSet {
    pub databases: HashMap<String, DatabaseConfig>,
    pub queries: HashMap<String, QueryConfig>,
    pub endpoints: HashMap<String, EndpointConfig>,
}

impl RawConfigSet {
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.databases.len(), self.queries.len(), self.endpoints.len())
    }
}

/// Capability set shared by `FileLoader` and `DbLoader`. Expressed as a
/// trait, not a class hierarchy — config types are plain value records and
/// the two loaders are two implementations of the same interface.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load_databases(&self) -> Result<HashMap<String, DatabaseConfig>>;
    async fn load_queries(&self) -> Result<HashMap<String, QueryConfig>>;
    async fn load_endpoints(&self) -> Result<HashMap<String, EndpointConfig>>;

    /// Convenience: load all three maps.
    async fn load_all(&self) -> Result<RawConfigSet> {
        Ok(RawConfigSet {
            databases: self.load_databases().await?,
            queries: self.load_queries().await?,
            endpoints: self.load_endpoints().await?,
        })
    }
}

/// Whether an upsert created a new entry or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// The write side used by `MigrationService::migrate`. A separate trait
/// from `ConfigSource` because a source read from, e.g., a YAML snapshot
/// bundled into a container image, may have no sensible write target.
#[async_trait]
pub trait ConfigSink: Send + Sync {
    async fn upsert_database(&self, cfg: &DatabaseConfig) -> Result<UpsertOutcome>;
    async fn upsert_query(&self, cfg: &QueryConfig) -> Result<UpsertOutcome>;
    async fn upsert_endpoint(&self, cfg: &EndpointConfig) -> Result<UpsertOutcome>;
}
