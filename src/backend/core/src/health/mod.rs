//! Per-pool health probing with a TTL cache, aggregated into one overall
//! status.
//!
//! The aggregation rule is the teacher's `HealthStatus::combine` pattern
//! (worst-of-two), adapted to three pool-level states instead of the
//! teacher's richer per-component health model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::HealthConfig;
use crate::pool::PoolManager;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

impl HealthStatus {
    /// Worst of two statuses. `Up` is the identity; any mix that isn't
    /// uniformly `Up` or uniformly `Down` degrades.
    pub fn combine(self, other: Self) -> Self {
        use HealthStatus::*;
        match (self, other) {
            (Up, Up) => Up,
            (Down, Down) => Down,
            _ => Degraded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall: HealthStatus,
    pub pools: Vec<PoolHealth>,
}

struct CachedProbe {
    status: HealthStatus,
    checked_at: Instant,
    checked_at_utc: DateTime<Utc>,
    detail: Option<String>,
}

pub struct HealthMonitor {
    registry: Arc<Registry>,
    pool_manager: Arc<PoolManager>,
    ttl: Duration,
    cache: DashMap<String, CachedProbe>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>, pool_manager: Arc<PoolManager>, config: &HealthConfig) -> Self {
        Self {
            registry,
            pool_manager,
            ttl: Duration::from_secs(config.ttl_secs),
            cache: DashMap::new(),
        }
    }

    /// Probe `name`, reusing a cached result if it is within the TTL.
    pub async fn probe(&self, name: &str) -> HealthStatus {
        if let Some(cached) = self.cache.get(name) {
            if cached.checked_at.elapsed() < self.ttl {
                return cached.status;
            }
        }
        let (status, detail) = self.run_probe(name).await;
        self.cache.insert(
            name.to_string(),
            CachedProbe {
                status,
                checked_at: Instant::now(),
                checked_at_utc: Utc::now(),
                detail,
            },
        );
        status
    }

    async fn run_probe(&self, name: &str) -> (HealthStatus, Option<String>) {
        let Some(db) = self.registry.database(name) else {
            return (HealthStatus::Down, Some("not configured".to_string()));
        };
        let pool = match self.pool_manager.acquire(name).await {
            Ok(pool) => pool,
            Err(e) => return (HealthStatus::Down, Some(e.message().to_string())),
        };
        match sqlx::query(&db.pool.test_query).execute(&pool).await {
            Ok(_) => {
                self.pool_manager.mark_up(name);
                (HealthStatus::Up, None)
            }
            Err(e) => {
                self.pool_manager.mark_down(name, e.to_string());
                (HealthStatus::Down, Some(e.to_string()))
            }
        }
    }

    /// Probe every configured database. Intended to run on the
    /// `probeIntervalMs` cadence from a background task.
    pub async fn refresh_all(&self) {
        for name in self.registry.databases().keys() {
            self.probe(name).await;
        }
    }

    /// The UTC time `name` was last probed, cached or otherwise, without
    /// forcing a fresh probe. `None` if it has never been checked.
    pub fn last_probed_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.cache.get(name).map(|c| c.checked_at_utc)
    }

    /// A point-in-time report built from cached probes, probing any
    /// database that has never been checked.
    pub async fn report(&self) -> HealthReport {
        let mut pools = Vec::new();
        let mut overall = HealthStatus::Up;
        for name in self.registry.databases().keys() {
            self.probe(name).await;
            let cached = self.cache.get(name);
            let (status, last_checked, detail) = match cached {
                Some(c) => (c.status, Some(c.checked_at_utc), c.detail.clone()),
                None => (HealthStatus::Down, None, Some("not yet probed".to_string())),
            };
            overall = overall.combine(status);
            pools.push(PoolHealth {
                name: name.clone(),
                status,
                last_checked,
                detail,
            });
        }
        if pools.is_empty() {
            overall = HealthStatus::Up;
        }
        HealthReport { overall, pools }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_is_up_only_when_both_up() {
        assert_eq!(HealthStatus::Up.combine(HealthStatus::Up), HealthStatus::Up);
    }

    #[test]
    fn combine_is_down_only_when_both_down() {
        assert_eq!(
            HealthStatus::Down.combine(HealthStatus::Down),
            HealthStatus::Down
        );
    }

    #[test]
    fn combine_degrades_on_any_mix() {
        assert_eq!(
            HealthStatus::Up.combine(HealthStatus::Down),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Down.combine(HealthStatus::Up),
            HealthStatus::Degraded
        );
    }

    #[tokio::test]
    async fn report_over_no_databases_is_up() {
        let registry = Arc::new(Registry::load(crate::source::RawConfigSet::default()).unwrap());
        let pool_manager = Arc::new(PoolManager::new(registry.clone()));
        let config = HealthConfig::default();
        let monitor = HealthMonitor::new(registry, pool_manager, &config);
        let report = monitor.report().await;
        assert_eq!(report.overall, HealthStatus::Up);
        assert!(report.pools.is_empty());
    }
}
