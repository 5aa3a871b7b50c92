//! Per-database connection pools, created lazily and tracked as
//! available/unavailable independently of the registry's static config.
//!
//! Mirrors the teacher's `db::Database::new` (`PgPoolOptions` builder), but
//! keyed by database name instead of a single global pool, with single-flight
//! creation so concurrent first-requests for the same database share one
//! connection attempt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use crate::error::{GatewayError, Result};
use crate::model::DatabaseConfig;
use crate::registry::Registry;

struct PoolEntry {
    pool: PgPool,
    available: AtomicBool,
    failure_reason: RwLock<Option<String>>,
    total_queries: AtomicU64,
    slow_queries: AtomicU64,
}

/// Read-only connection pool metrics, mirroring the teacher's
/// `ConnectionPoolMetrics` (pool size/utilization from `sqlx::PgPool`
/// itself, query counters tracked alongside it).
#[derive(Debug, Clone, Serialize)]
pub struct PoolMetrics {
    pub pool_size: u32,
    pub idle_connections: u32,
    pub total_queries: u64,
    pub slow_queries: u64,
}

pub struct PoolManager {
    registry: Arc<Registry>,
    entries: DashMap<String, Arc<OnceCell<Arc<PoolEntry>>>>,
}

impl PoolManager {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            entries: DashMap::new(),
        }
    }

    /// Database names the registry knows about, whether or not a pool has
    /// been created for them yet.
    pub fn configured_names(&self) -> Vec<String> {
        self.registry.databases().keys().cloned().collect()
    }

    /// Get (creating on first use) the pool for `name`. Concurrent callers
    /// racing on an unpooled name share a single connection attempt.
    pub async fn acquire(&self, name: &str) -> Result<PgPool> {
        let entry = self.get_or_create(name).await?;
        Ok(entry.pool.clone())
    }

    async fn get_or_create(&self, name: &str) -> Result<Arc<PoolEntry>> {
        let db = self
            .registry
            .database(name)
            .ok_or_else(|| GatewayError::configuration(format!("unknown database: {name}")))?
            .clone();
        let cell = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let entry = cell
            .get_or_try_init(|| async { Self::connect(&db).await.map(Arc::new) })
            .await?;
        Ok(entry.clone())
    }

    async fn connect(db: &DatabaseConfig) -> Result<PoolEntry> {
        let pool = PgPoolOptions::new()
            .max_connections(db.pool.max_size)
            .min_connections(db.pool.min_idle)
            .acquire_timeout(Duration::from_millis(db.pool.connection_timeout_ms))
            .idle_timeout(Duration::from_millis(db.pool.idle_timeout_ms))
            .max_lifetime(Duration::from_millis(db.pool.max_lifetime_ms))
            .connect(&db.url)
            .await
            .map_err(|e| {
                GatewayError::service_unavailable(format!(
                    "database {} connection failed",
                    db.name
                ))
                .with_source(e)
            })?;
        Ok(PoolEntry {
            pool,
            available: AtomicBool::new(true),
            failure_reason: RwLock::new(None),
            total_queries: AtomicU64::new(0),
            slow_queries: AtomicU64::new(0),
        })
    }

    /// Whether the pool for `name` is currently usable. `false` for a
    /// database that has never been acquired, same as one that failed.
    pub fn is_available(&self, name: &str) -> bool {
        self.live_entry(name)
            .map(|e| e.available.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn failure_reason(&self, name: &str) -> Option<String> {
        self.live_entry(name)
            .and_then(|e| e.failure_reason.read().clone())
    }

    /// Recorded by the health monitor after a failed probe. Does not tear
    /// down the pool — a future probe may find it healthy again.
    pub fn mark_down(&self, name: &str, reason: impl Into<String>) {
        if let Some(entry) = self.live_entry(name) {
            entry.available.store(false, Ordering::Relaxed);
            *entry.failure_reason.write() = Some(reason.into());
        }
    }

    pub fn mark_up(&self, name: &str) {
        if let Some(entry) = self.live_entry(name) {
            entry.available.store(true, Ordering::Relaxed);
            *entry.failure_reason.write() = None;
        }
    }

    fn live_entry(&self, name: &str) -> Option<Arc<PoolEntry>> {
        self.entries.get(name).and_then(|cell| cell.get().cloned())
    }

    /// Records one query execution against `name`'s counters, flagging it
    /// slow if `duration` exceeds `slow_threshold_ms`. A no-op for a
    /// database whose pool was never created, which can't happen in
    /// practice since running a query already required `acquire`.
    pub fn record_query(&self, name: &str, duration: Duration, slow_threshold_ms: u64) {
        let Some(entry) = self.live_entry(name) else {
            return;
        };
        entry.total_queries.fetch_add(1, Ordering::Relaxed);
        if duration.as_millis() as u64 > slow_threshold_ms {
            entry.slow_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A point-in-time metrics snapshot for `name`, or `None` if no pool
    /// has been created for it yet.
    pub fn metrics(&self, name: &str) -> Option<PoolMetrics> {
        let entry = self.live_entry(name)?;
        Some(PoolMetrics {
            pool_size: entry.pool.size(),
            idle_connections: entry.pool.num_idle() as u32,
            total_queries: entry.total_queries.load(Ordering::Relaxed),
            slow_queries: entry.slow_queries.load(Ordering::Relaxed),
        })
    }

    pub async fn close(&self, name: &str) {
        if let Some((_, cell)) = self.entries.remove(name) {
            if let Some(entry) = cell.get() {
                entry.pool.close().await;
            }
        }
    }

    pub async fn close_all(&self) {
        let names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for name in names {
            self.close(&name).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawConfigSet;

    fn registry_with_no_databases() -> Arc<Registry> {
        Arc::new(Registry::load(RawConfigSet::default()).unwrap())
    }

    #[tokio::test]
    async fn acquiring_unknown_database_fails_without_connecting() {
        let manager = PoolManager::new(registry_with_no_databases());
        let err = manager.acquire("missing").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ConfigurationError);
    }

    #[test]
    fn availability_queries_on_unpooled_name_return_safe_defaults() {
        let manager = PoolManager::new(registry_with_no_databases());
        assert!(!manager.is_available("never-acquired"));
        assert_eq!(manager.failure_reason("never-acquired"), None);
    }

    #[test]
    fn configured_names_reflects_registry() {
        let manager = PoolManager::new(registry_with_no_databases());
        assert!(manager.configured_names().is_empty());
    }
}
