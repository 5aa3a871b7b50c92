//! Management API: read-only introspection of the live registry plus the
//! one mutating operation the gateway exposes on itself, `/config/reload`.
//!
//! Routes are grouped the way the teacher's `api::v1::routes` module groups
//! its resource routers, one function per concern, composed in
//! [`crate::api::build_router`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::error::{GatewayError, Result as GatewayResult};
use crate::health::HealthReport;
use crate::registry::Registry;
use crate::source::ConfigSource;
use crate::stats::EndpointStats;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/config/databases", get(list_databases))
        .route("/config/queries", get(list_queries))
        .route("/config/endpoints", get(list_endpoints))
        .route("/config/metadata", get(metadata))
        .route("/config/paths", get(paths))
        .route("/config/contents", get(contents))
        .route("/config/relationships/:kind/:name", get(relationships))
        .route("/config/reload", post(reload))
        .route("/health", get(health))
        .route("/statistics", get(statistics))
        .route("/dashboard", get(dashboard))
}

async fn list_databases(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.registry.current();
    Json(serde_json::json!({
        "count": registry.databases().len(),
        "databases": registry.databases(),
    }))
}

async fn list_queries(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.registry.current();
    Json(serde_json::json!({
        "count": registry.queries().len(),
        "queries": registry.queries(),
    }))
}

async fn list_endpoints(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.registry.current();
    Json(serde_json::json!({
        "count": registry.endpoints().len(),
        "endpoints": registry.endpoints(),
    }))
}

#[derive(Serialize)]
struct MetadataResponse {
    database_count: usize,
    query_count: usize,
    endpoint_count: usize,
    validation_errors: Vec<String>,
    validation_warnings: Vec<String>,
}

async fn metadata(State(state): State<AppState>) -> Json<MetadataResponse> {
    let registry = state.registry.current();
    let (database_count, query_count, endpoint_count) = registry.counts();
    Json(MetadataResponse {
        database_count,
        query_count,
        endpoint_count,
        validation_errors: registry.validation().errors.clone(),
        validation_warnings: registry.validation().warnings.clone(),
    })
}

async fn paths(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    let registry = state.registry.current();
    let mut out: Vec<_> = registry
        .endpoints()
        .values()
        .map(|e| serde_json::json!({"name": e.name, "method": e.method, "path": e.path}))
        .collect();
    out.sort_by(|a, b| a["path"].as_str().cmp(&b["path"].as_str()));
    Json(out)
}

async fn contents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.registry.current();
    Json(serde_json::json!({
        "databases": registry.databases(),
        "queries": registry.queries(),
        "endpoints": registry.endpoints(),
    }))
}

#[derive(Serialize)]
struct RelationshipsResponse {
    kind: String,
    name: String,
    related: Vec<String>,
}

async fn relationships(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> GatewayResult<Json<RelationshipsResponse>> {
    let registry = state.registry.current();
    let related = match kind.as_str() {
        "database" => registry.queries_for_database(&name).into_iter().collect(),
        "query" => registry.endpoints_for_query(&name).into_iter().collect(),
        other => {
            return Err(GatewayError::bad_request(format!(
                "unknown relationship kind: {other} (expected database or query)"
            )))
        }
    };
    let mut related: Vec<String> = related;
    related.sort();
    Ok(Json(RelationshipsResponse { kind, name, related }))
}

/// Re-reads the active `ConfigSource`, validates the result, and swaps it
/// into the shared registry. Affects every subsequent dispatch through
/// existing routes immediately; a brand-new endpoint name still needs a
/// process restart to get an axum route registered for it.
async fn reload(State(state): State<AppState>) -> GatewayResult<Json<MetadataResponse>> {
    let raw = state.config_source.load_all().await?;
    let registry = Registry::load(raw)?;
    let (database_count, query_count, endpoint_count) = registry.counts();
    let response = MetadataResponse {
        database_count,
        query_count,
        endpoint_count,
        validation_errors: registry.validation().errors.clone(),
        validation_warnings: registry.validation().warnings.clone(),
    };
    state.registry.swap(registry);
    tracing::info!("registry reloaded");
    Ok(Json(response))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report: HealthReport = state.health_monitor.report().await;
    let status = if report.overall == crate::health::HealthStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

/// A database's pool counters alongside the last time it was probed,
/// mirroring the teacher's `ConnectionPoolMetrics` scaled down to what this
/// gateway tracks.
#[derive(Serialize)]
struct PoolStatistics {
    database: String,
    pool_size: u32,
    idle_connections: u32,
    total_queries: u64,
    slow_queries: u64,
    last_probed_at: Option<DateTime<Utc>>,
}

fn pool_statistics(state: &AppState) -> Vec<PoolStatistics> {
    let registry = state.registry.current();
    let mut names: Vec<String> = registry.databases().keys().cloned().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let metrics = state.pool_manager.metrics(&name);
            PoolStatistics {
                pool_size: metrics.as_ref().map(|m| m.pool_size).unwrap_or(0),
                idle_connections: metrics.as_ref().map(|m| m.idle_connections).unwrap_or(0),
                total_queries: metrics.as_ref().map(|m| m.total_queries).unwrap_or(0),
                slow_queries: metrics.as_ref().map(|m| m.slow_queries).unwrap_or(0),
                last_probed_at: state.health_monitor.last_probed_at(&name),
                database: name,
            }
        })
        .collect()
}

#[derive(Serialize)]
struct StatisticsResponse {
    endpoints: Vec<EndpointStats>,
    pools: Vec<PoolStatistics>,
}

async fn statistics(State(state): State<AppState>) -> Json<StatisticsResponse> {
    Json(StatisticsResponse {
        endpoints: state.stats.snapshot(),
        pools: pool_statistics(&state),
    })
}

#[derive(Serialize)]
struct DashboardResponse {
    metadata: MetadataResponse,
    health: HealthReport,
    statistics: StatisticsResponse,
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    let registry = state.registry.current();
    let (database_count, query_count, endpoint_count) = registry.counts();
    let metadata = MetadataResponse {
        database_count,
        query_count,
        endpoint_count,
        validation_errors: registry.validation().errors.clone(),
        validation_warnings: registry.validation().warnings.clone(),
    };
    let health = state.health_monitor.report().await;
    let statistics = StatisticsResponse {
        endpoints: state.stats.snapshot(),
        pools: pool_statistics(&state),
    };
    Json(DashboardResponse {
        metadata,
        health,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationships_rejects_unknown_kind() {
        // Exercised indirectly through `relationships`; the bad_request path
        // is covered by `Dispatcher`/`Registry` unit tests for the same
        // error shape, so this just pins the error code contract.
        let err = GatewayError::bad_request("unknown relationship kind: x (expected database or query)");
        assert_eq!(err.code(), crate::error::ErrorCode::BadRequest);
    }
}
