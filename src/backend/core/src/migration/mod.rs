//! Copies config between two `ConfigSource`/`ConfigSink` pairs, diffs two
//! sources, and exports one source as YAML. Not transactional across the
//! three kinds — a failure migrating queries doesn't roll back databases
//! already migrated — but each entry's upsert is atomic.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{GatewayError, Result};
use crate::source::{ConfigSink, ConfigSource, UpsertOutcome};

#[derive(Debug, Clone, Default, Serialize)]
pub struct KindReport {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl KindReport {
    fn record(&mut self, name: &str, outcome: Result<UpsertOutcome>) {
        match outcome {
            Ok(UpsertOutcome::Created) => self.created += 1,
            Ok(UpsertOutcome::Updated) => self.updated += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(format!("{name}: {}", e.message()));
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub databases: KindReport,
    pub queries: KindReport,
    pub endpoints: KindReport,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KindDiff {
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub in_both: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub databases: KindDiff,
    pub queries: KindDiff,
    pub endpoints: KindDiff,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedYaml {
    pub databases: String,
    pub queries: String,
    pub endpoints: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub label: String,
    pub database_count: usize,
    pub query_count: usize,
    pub endpoint_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub sources: Vec<SourceStatus>,
    pub current_source: String,
}

pub struct MigrationService;

impl MigrationService {
    pub async fn migrate(
        src: &dyn ConfigSource,
        dst: &dyn ConfigSink,
    ) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let raw = src.load_all().await?;

        let mut databases = KindReport::default();
        for cfg in raw.databases.values() {
            let outcome = dst.upsert_database(cfg).await;
            databases.record(&cfg.name, outcome);
        }

        let mut queries = KindReport::default();
        for cfg in raw.queries.values() {
            let outcome = dst.upsert_query(cfg).await;
            queries.record(&cfg.name, outcome);
        }

        let mut endpoints = KindReport::default();
        for cfg in raw.endpoints.values() {
            let outcome = dst.upsert_endpoint(cfg).await;
            endpoints.record(&cfg.name, outcome);
        }

        Ok(MigrationReport {
            databases,
            queries,
            endpoints,
            started_at,
            completed_at: Utc::now(),
        })
    }

    pub async fn export(src: &dyn ConfigSource) -> Result<ExportedYaml> {
        let raw = src.load_all().await?;
        Ok(ExportedYaml {
            databases: wrap_yaml("databases", &raw.databases)?,
            queries: wrap_yaml("queries", &raw.queries)?,
            endpoints: wrap_yaml("endpoints", &raw.endpoints)?,
        })
    }

    pub async fn compare(a: &dyn ConfigSource, b: &dyn ConfigSource) -> Result<ComparisonReport> {
        let raw_a = a.load_all().await?;
        let raw_b = b.load_all().await?;
        Ok(ComparisonReport {
            databases: diff_names(&raw_a.databases, &raw_b.databases),
            queries: diff_names(&raw_a.queries, &raw_b.queries),
            endpoints: diff_names(&raw_a.endpoints, &raw_b.endpoints),
        })
    }

    pub async fn status(
        sources: &[(&str, &dyn ConfigSource)],
        current_source: &str,
    ) -> Result<StatusReport> {
        let mut reported = Vec::with_capacity(sources.len());
        for (label, source) in sources {
            let raw = source.load_all().await?;
            let (database_count, query_count, endpoint_count) = raw.counts();
            reported.push(SourceStatus {
                label: label.to_string(),
                database_count,
                query_count,
                endpoint_count,
            });
        }
        Ok(StatusReport {
            sources: reported,
            current_source: current_source.to_string(),
        })
    }
}

fn wrap_yaml<T: Serialize>(key: &str, map: &HashMap<String, T>) -> Result<String> {
    let mut root = HashMap::new();
    root.insert(key.to_string(), map);
    serde_yaml::to_string(&root)
        .map_err(|e| GatewayError::internal(format!("serializing {key}")).with_source(e))
}

fn diff_names<T>(a: &HashMap<String, T>, b: &HashMap<String, T>) -> KindDiff {
    let a_keys: HashSet<&String> = a.keys().collect();
    let b_keys: HashSet<&String> = b.keys().collect();
    let mut only_in_a: Vec<String> = a_keys.difference(&b_keys).map(|s| s.to_string()).collect();
    let mut only_in_b: Vec<String> = b_keys.difference(&a_keys).map(|s| s.to_string()).collect();
    let mut in_both: Vec<String> = a_keys.intersection(&b_keys).map(|s| s.to_string()).collect();
    only_in_a.sort();
    only_in_b.sort();
    in_both.sort();
    KindDiff {
        only_in_a,
        only_in_b,
        in_both,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DatabaseConfig;

    fn database(name: &str) -> DatabaseConfig {
        DatabaseConfig {
            name: name.into(),
            description: String::new(),
            url: "postgres://localhost/x".into(),
            username: None,
            password: None,
            driver: "postgresql".into(),
            pool: Default::default(),
        }
    }

    #[test]
    fn diff_names_partitions_correctly() {
        let mut a = HashMap::new();
        a.insert("d1".to_string(), database("d1"));
        a.insert("shared".to_string(), database("shared"));
        let mut b = HashMap::new();
        b.insert("d2".to_string(), database("d2"));
        b.insert("shared".to_string(), database("shared"));

        let diff = diff_names(&a, &b);
        assert_eq!(diff.only_in_a, vec!["d1".to_string()]);
        assert_eq!(diff.only_in_b, vec!["d2".to_string()]);
        assert_eq!(diff.in_both, vec!["shared".to_string()]);
    }

    #[test]
    fn kind_report_tracks_failures_with_message() {
        let mut report = KindReport::default();
        report.record("d1", Ok(UpsertOutcome::Created));
        report.record("d2", Ok(UpsertOutcome::Updated));
        report.record("d3", Err(GatewayError::internal("boom")));
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, vec!["d3: boom".to_string()]);
    }
}
