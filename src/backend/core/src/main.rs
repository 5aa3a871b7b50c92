//! Gateway server entry point.
//!
//! Startup sequence: load process config, initialize logging, load and
//! validate the registry from the configured source, build the pool
//! manager/health monitor/repository/dispatcher, serve. A registry
//! validation failure aborts startup with a non-zero exit code instead of
//! serving a half-configured gateway.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use gateway_core::api::{self, AppState};
use gateway_core::config::{ConfigSourceKind, GatewayConfig};
use gateway_core::dispatcher::Dispatcher;
use gateway_core::health::HealthMonitor;
use gateway_core::pool::PoolManager;
use gateway_core::registry::{Registry, SharedRegistry};
use gateway_core::repository::Repository;
use gateway_core::source::{ConfigSource, DbLoader, FileLoader};
use gateway_core::stats::RequestStats;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::load().unwrap_or_else(|e| {
        eprintln!("warning: could not load config: {e}. using defaults.");
        toml_free_defaults()
    });

    gateway_core::telemetry::init_from_config(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting gateway");

    let config_source: Arc<dyn ConfigSource> = match config.gateway.source {
        ConfigSourceKind::Yaml => Arc::new(FileLoader::new(
            config.gateway.directories.iter().map(PathBuf::from).collect(),
            config.gateway.database_patterns.clone(),
            config.gateway.query_patterns.clone(),
            config.gateway.endpoint_patterns.clone(),
        )),
        ConfigSourceKind::Database => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.metadata_database.max_connections)
                .min_connections(config.metadata_database.min_connections)
                .connect(&config.metadata_database.url)
                .await?;
            let loader = DbLoader::new(pool);
            loader.run_migrations().await?;
            Arc::new(loader)
        }
    };

    let raw = config_source.load_all().await?;
    let registry = match Registry::load(raw) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e.message(), "registry failed to validate, aborting startup");
            std::process::exit(1);
        }
    };
    let (databases, queries, endpoints) = registry.counts();
    tracing::info!(databases, queries, endpoints, "registry loaded");

    let shared_registry = Arc::new(SharedRegistry::new(registry));
    // `PoolManager`/`HealthMonitor` take a snapshot at construction time;
    // a `/config/reload` updates query/endpoint resolution immediately but
    // doesn't change pool connection parameters until restart.
    let registry_snapshot = shared_registry.current();

    let pool_manager = Arc::new(PoolManager::new(registry_snapshot.clone()));
    let health_monitor = Arc::new(HealthMonitor::new(
        registry_snapshot,
        pool_manager.clone(),
        &config.health,
    ));
    let repository = Arc::new(Repository::new(
        pool_manager.clone(),
        config.metrics.slow_query_threshold_ms,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        shared_registry.clone(),
        pool_manager.clone(),
        repository,
    ));
    let stats = Arc::new(RequestStats::new());

    tokio::spawn(probe_loop(health_monitor.clone(), config.health.probe_interval_ms));

    let state = AppState {
        registry: shared_registry,
        pool_manager,
        health_monitor,
        dispatcher,
        stats,
        config_source,
    };

    let app = api::build_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    ));
    tracing::info!(address = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Keeps `PoolManager.is_available` current between requests by probing
/// every configured database on `probe_interval_ms`, independent of the
/// on-demand probing `/health`/`/statistics` also trigger.
async fn probe_loop(health_monitor: Arc<HealthMonitor>, probe_interval_ms: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(probe_interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        health_monitor.refresh_all().await;
    }
}

fn toml_free_defaults() -> GatewayConfig {
    // `config::Config::builder()` with no sources still deserializes into
    // every field's `#[serde(default)]`, so an empty environment layer is a
    // legitimate way to get the all-defaults config.
    config::Config::builder()
        .build()
        .and_then(|c| c.try_deserialize())
        .expect("GatewayConfig must deserialize from an empty source via field defaults")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
