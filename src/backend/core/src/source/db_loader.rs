//! `ConfigSource` backed by the metadata tables `config_databases`,
//! `config_queries`, `config_endpoints`.
//!
//! Mirrors the teacher's `Database` struct's query/project pattern
//! (`sqlx::query_as` into a row struct, then a conversion into the domain
//! type), generalized so the nested pagination/parameter structures come
//! from JSON columns instead of being hardcoded per query.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::error::{GatewayError, Result};
use crate::model::{
    database::PoolSettings, endpoint::PaginationConfig, DatabaseConfig, EndpointConfig,
    EndpointParameter, QueryConfig, QueryParameter,
};

use super::{ConfigSink, ConfigSource, UpsertOutcome};

pub struct DbLoader {
    pool: PgPool,
}

impl DbLoader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the metadata-store migrations (`config_databases`,
    /// `config_queries`, `config_endpoints`). These are the gateway's own
    /// bookkeeping tables, not the target databases the registry serves
    /// queries against — migrating those is explicitly out of scope.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::internal("metadata store migration failed").with_source(e))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct DatabaseRow {
    name: String,
    driver: String,
    url: String,
    username: Option<String>,
    password: Option<String>,
    max_pool_size: Option<i32>,
    min_idle: Option<i32>,
    connection_timeout_ms: Option<i64>,
    idle_timeout_ms: Option<i64>,
    max_lifetime_ms: Option<i64>,
    leak_detection_ms: Option<i64>,
    test_query: Option<String>,
}

impl From<DatabaseRow> for DatabaseConfig {
    fn from(row: DatabaseRow) -> Self {
        let defaults = PoolSettings::default();
        DatabaseConfig {
            name: row.name,
            description: String::new(),
            url: row.url,
            username: row.username,
            password: row.password,
            driver: row.driver,
            pool: PoolSettings {
                max_size: row.max_pool_size.map(|v| v as u32).unwrap_or(defaults.max_size),
                min_idle: row.min_idle.map(|v| v as u32).unwrap_or(defaults.min_idle),
                connection_timeout_ms: row
                    .connection_timeout_ms
                    .map(|v| v as u64)
                    .unwrap_or(defaults.connection_timeout_ms),
                idle_timeout_ms: row
                    .idle_timeout_ms
                    .map(|v| v as u64)
                    .unwrap_or(defaults.idle_timeout_ms),
                max_lifetime_ms: row
                    .max_lifetime_ms
                    .map(|v| v as u64)
                    .unwrap_or(defaults.max_lifetime_ms),
                leak_detection_ms: row
                    .leak_detection_ms
                    .map(|v| v as u64)
                    .unwrap_or(defaults.leak_detection_ms),
                test_query: row.test_query.unwrap_or(defaults.test_query),
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct QueryRow {
    name: String,
    database_name: String,
    sql_query: String,
    description: Option<String>,
    parameters_json: Option<serde_json::Value>,
}

impl From<QueryRow> for QueryConfig {
    fn from(row: QueryRow) -> Self {
        let parameters = row
            .parameters_json
            .and_then(|v| match serde_json::from_value::<Vec<QueryParameter>>(v) {
                Ok(params) => Some(params),
                Err(e) => {
                    tracing::warn!(query = %row.name, error = %e, "incomplete row: parameters_json did not parse, using empty parameter list");
                    None
                }
            })
            .unwrap_or_else(|| {
                tracing::warn!(query = %row.name, "incomplete row: parameters_json is null, assuming no parameters");
                Vec::new()
            });

        QueryConfig {
            name: row.name,
            description: row.description.unwrap_or_default(),
            sql: row.sql_query,
            database: row.database_name,
            parameters,
        }
    }
}

#[derive(Debug, FromRow)]
struct EndpointRow {
    name: String,
    path: String,
    method: String,
    query_name: String,
    count_query_name: Option<String>,
    description: Option<String>,
    pagination_json: Option<serde_json::Value>,
    parameters_json: Option<serde_json::Value>,
}

impl From<EndpointRow> for EndpointConfig {
    fn from(row: EndpointRow) -> Self {
        let pagination = row.pagination_json.and_then(|v| {
            serde_json::from_value::<PaginationConfig>(v)
                .map_err(|e| {
                    tracing::warn!(endpoint = %row.name, error = %e, "incomplete row: pagination_json did not parse, disabling pagination");
                })
                .ok()
        });

        let parameters = row
            .parameters_json
            .and_then(|v| serde_json::from_value::<Vec<EndpointParameter>>(v).ok())
            .unwrap_or_default();

        EndpointConfig {
            name: row.name,
            path: row.path,
            method: row.method,
            description: row.description.unwrap_or_default(),
            query: row.query_name,
            count_query: row.count_query_name,
            pagination,
            parameters,
        }
    }
}

#[async_trait]
impl ConfigSource for DbLoader {
    async fn load_databases(&self) -> Result<HashMap<String, DatabaseConfig>> {
        let rows: Vec<DatabaseRow> = sqlx::query_as(
            "SELECT name, driver, url, username, password, max_pool_size, min_idle, \
             connection_timeout_ms, idle_timeout_ms, max_lifetime_ms, leak_detection_ms, test_query \
             FROM config_databases",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.name.clone(), r.into()))
            .collect())
    }

    async fn load_queries(&self) -> Result<HashMap<String, QueryConfig>> {
        let rows: Vec<QueryRow> = sqlx::query_as(
            "SELECT name, database_name, sql_query, description, parameters_json FROM config_queries",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.name.clone(), r.into()))
            .collect())
    }

    async fn load_endpoints(&self) -> Result<HashMap<String, EndpointConfig>> {
        let rows: Vec<EndpointRow> = sqlx::query_as(
            "SELECT name, path, method, query_name, count_query_name, description, \
             pagination_json, parameters_json FROM config_endpoints",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.name.clone(), r.into()))
            .collect())
    }
}

/// `xmax = 0` is true only for the row version just inserted by this
/// statement, which is how Postgres tells an `ON CONFLICT DO UPDATE` apart
/// from a plain insert without a second round-trip.
fn outcome_from_inserted(inserted: bool) -> UpsertOutcome {
    if inserted {
        UpsertOutcome::Created
    } else {
        UpsertOutcome::Updated
    }
}

#[async_trait]
impl ConfigSink for DbLoader {
    async fn upsert_database(&self, cfg: &DatabaseConfig) -> Result<UpsertOutcome> {
        let row: (bool,) = sqlx::query_as(
            "INSERT INTO config_databases \
             (name, driver, url, username, password, max_pool_size, min_idle, \
              connection_timeout_ms, idle_timeout_ms, max_lifetime_ms, leak_detection_ms, test_query, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now()) \
             ON CONFLICT (name) DO UPDATE SET \
                driver = EXCLUDED.driver, url = EXCLUDED.url, username = EXCLUDED.username, \
                password = EXCLUDED.password, max_pool_size = EXCLUDED.max_pool_size, \
                min_idle = EXCLUDED.min_idle, connection_timeout_ms = EXCLUDED.connection_timeout_ms, \
                idle_timeout_ms = EXCLUDED.idle_timeout_ms, max_lifetime_ms = EXCLUDED.max_lifetime_ms, \
                leak_detection_ms = EXCLUDED.leak_detection_ms, test_query = EXCLUDED.test_query, \
                updated_at = now() \
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(&cfg.name)
        .bind(&cfg.driver)
        .bind(&cfg.url)
        .bind(&cfg.username)
        .bind(&cfg.password)
        .bind(cfg.pool.max_size as i32)
        .bind(cfg.pool.min_idle as i32)
        .bind(cfg.pool.connection_timeout_ms as i64)
        .bind(cfg.pool.idle_timeout_ms as i64)
        .bind(cfg.pool.max_lifetime_ms as i64)
        .bind(cfg.pool.leak_detection_ms as i64)
        .bind(&cfg.pool.test_query)
        .fetch_one(&self.pool)
        .await?;
        Ok(outcome_from_inserted(row.0))
    }

    async fn upsert_query(&self, cfg: &QueryConfig) -> Result<UpsertOutcome> {
        let parameters_json = serde_json::to_value(&cfg.parameters)
            .map_err(|e| GatewayError::internal("failed to serialize query parameters").with_source(e))?;
        let row: (bool,) = sqlx::query_as(
            "INSERT INTO config_queries (name, database_name, sql_query, description, parameters_json, updated_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             ON CONFLICT (name) DO UPDATE SET \
                database_name = EXCLUDED.database_name, sql_query = EXCLUDED.sql_query, \
                description = EXCLUDED.description, parameters_json = EXCLUDED.parameters_json, \
                updated_at = now() \
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(&cfg.name)
        .bind(&cfg.database)
        .bind(&cfg.sql)
        .bind(&cfg.description)
        .bind(parameters_json)
        .fetch_one(&self.pool)
        .await?;
        Ok(outcome_from_inserted(row.0))
    }

    async fn upsert_endpoint(&self, cfg: &EndpointConfig) -> Result<UpsertOutcome> {
        let pagination_json = cfg
            .pagination
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| GatewayError::internal("failed to serialize pagination").with_source(e))?;
        let parameters_json = serde_json::to_value(&cfg.parameters)
            .map_err(|e| GatewayError::internal("failed to serialize endpoint parameters").with_source(e))?;
        let row: (bool,) = sqlx::query_as(
            "INSERT INTO config_endpoints \
             (name, path, method, query_name, count_query_name, description, pagination_json, parameters_json, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) \
             ON CONFLICT (name) DO UPDATE SET \
                path = EXCLUDED.path, method = EXCLUDED.method, query_name = EXCLUDED.query_name, \
                count_query_name = EXCLUDED.count_query_name, description = EXCLUDED.description, \
                pagination_json = EXCLUDED.pagination_json, parameters_json = EXCLUDED.parameters_json, \
                updated_at = now() \
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(&cfg.name)
        .bind(&cfg.path)
        .bind(&cfg.method)
        .bind(&cfg.query)
        .bind(&cfg.count_query)
        .bind(&cfg.description)
        .bind(pagination_json)
        .bind(parameters_json)
        .fetch_one(&self.pool)
        .await?;
        Ok(outcome_from_inserted(row.0))
    }
}
