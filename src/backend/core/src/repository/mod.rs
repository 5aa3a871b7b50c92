//! Executes declared queries against their bound database and projects
//! rows into column-order-preserving [`Record`]s.
//!
//! The teacher's `db::Database` methods bind a request's fields to a
//! fixed, compile-time-known struct (`TaskRow`, `AgentRow`, ...) via
//! `sqlx::query_as`. Here the target schema is whatever the configured SQL
//! happens to return, so projection has to happen at the row level instead:
//! bind positionally from [`TypedValue`], then walk `PgRow::columns()` and
//! decode each cell by its reported Postgres type.

use bigdecimal::BigDecimal;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, Column, PgPool, Row, TypeInfo};
use std::time::Instant;

use crate::error::{GatewayError, Result};
use crate::model::{BoundParameter, QueryConfig, Record, TypedValue};
use crate::pool::PoolManager;
use std::sync::Arc;

pub struct Repository {
    pool_manager: Arc<PoolManager>,
    slow_query_threshold_ms: u64,
}

impl Repository {
    pub fn new(pool_manager: Arc<PoolManager>, slow_query_threshold_ms: u64) -> Self {
        Self {
            pool_manager,
            slow_query_threshold_ms,
        }
    }

    pub async fn execute_query(
        &self,
        query: &QueryConfig,
        bound: &[BoundParameter],
    ) -> Result<Vec<Record>> {
        let pool = self.pool_manager.acquire(&query.database).await?;
        let rows = self
            .run(&pool, &query.database, &query.name, &query.sql, bound)
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Runs a count query and returns its single scalar column as `i64`.
    /// Used for the `totalElements` figure when pagination is enabled.
    /// An empty result isn't an error: it returns 0, with a warning logged,
    /// same as the caller treating the page as the last one.
    pub async fn execute_count_query(
        &self,
        query: &QueryConfig,
        bound: &[BoundParameter],
    ) -> Result<i64> {
        let pool = self.pool_manager.acquire(&query.database).await?;
        let rows = self
            .run(&pool, &query.database, &query.name, &query.sql, bound)
            .await?;
        let Some(row) = rows.first() else {
            tracing::warn!(query = %query.name, "count query returned no rows, treating totalElements as 0");
            return Ok(0);
        };
        row.try_get::<i64, _>(0)
            .or_else(|_| row.try_get::<i32, _>(0).map(i64::from))
            .map_err(|e| {
                GatewayError::internal(format!(
                    "count query {} did not return a number",
                    query.name
                ))
                .with_source(e)
            })
    }

    async fn run(
        &self,
        pool: &PgPool,
        database: &str,
        query_name: &str,
        sql: &str,
        bound: &[BoundParameter],
    ) -> Result<Vec<PgRow>> {
        let mut query = sqlx::query(sql);
        for param in bound {
            query = bind_typed_value(query, &param.typed_value);
        }
        let started = Instant::now();
        let rows = query.fetch_all(pool).await.map_err(|e| {
            GatewayError::internal(format!("query {query_name} failed")).with_source(e)
        })?;
        self.pool_manager
            .record_query(database, started.elapsed(), self.slow_query_threshold_ms);
        Ok(rows)
    }
}

fn bind_typed_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &'q TypedValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        TypedValue::String(s) => query.bind(s),
        TypedValue::Integer(i) => query.bind(i),
        TypedValue::Long(l) => query.bind(l),
        TypedValue::Decimal(d) => query.bind(d),
        TypedValue::Boolean(b) => query.bind(b),
        TypedValue::Timestamp(t) => query.bind(t),
        TypedValue::Null => query.bind(None::<String>),
    }
}

fn row_to_record(row: &PgRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        record.push(name, value);
    }
    Ok(record)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<JsonValue> {
    let decode_err = |e: sqlx::Error| {
        GatewayError::internal(format!("failed to decode column of type {type_name}")).with_source(e)
    };

    let value = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map_err(decode_err)?
            .map(JsonValue::from),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map_err(decode_err)?
            .map(JsonValue::from),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map_err(decode_err)?
            .map(JsonValue::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map_err(decode_err)?
            .map(|v| v as f64)
            .map(JsonValue::from),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map_err(decode_err)?
            .map(JsonValue::from),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(idx)
            .map_err(decode_err)?
            .map(|d| JsonValue::String(d.to_string())),
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map_err(decode_err)?
            .map(JsonValue::from),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map_err(decode_err)?
            .map(|v| JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<Utc>>, _>(idx)
            .map_err(decode_err)?
            .map(|v| JsonValue::String(v.to_rfc3339())),
        "JSON" | "JSONB" => row
            .try_get::<Option<JsonValue>, _>(idx)
            .map_err(decode_err)?,
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map_err(decode_err)?
            .map(|v| JsonValue::String(v.to_string())),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map_err(decode_err)?
            .map(JsonValue::String),
    };
    Ok(value.unwrap_or(JsonValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_typed_value_compiles_for_every_variant() {
        // Exercised through `Repository::run` in integration tests against a
        // live database; this only guards against a variant being dropped
        // from the match silently compiling.
        fn assert_exhaustive(v: &TypedValue) {
            match v {
                TypedValue::String(_)
                | TypedValue::Integer(_)
                | TypedValue::Long(_)
                | TypedValue::Decimal(_)
                | TypedValue::Boolean(_)
                | TypedValue::Timestamp(_)
                | TypedValue::Null => {}
            }
        }
        assert_exhaustive(&TypedValue::Null);
    }
}
