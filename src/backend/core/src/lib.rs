#![allow(clippy::result_large_err)]
//! # Gateway Core
//!
//! Configuration-driven API gateway: three declarative registries
//! (databases, parameterized SQL queries, HTTP GET endpoints) compiled into
//! a [`registry::Registry`], served by a dynamically assembled axum
//! [`Router`](axum::Router).
//!
//! ## Architecture
//!
//! - **Config**: process configuration (`config`) and the declarative
//!   registries it selects a [`source::ConfigSource`] for (`registry`)
//! - **Connectivity**: per-database connection pools (`pool`) and health
//!   probing over them (`health`)
//! - **Request path**: parameter binding and query execution (`repository`),
//!   per-request orchestration (`dispatcher`), and route registration
//!   (`router`)
//! - **Operations**: request counters (`stats`), config migration between
//!   sources (`migration`), and the introspection/reload surface
//!   (`management`)
//! - **Ambient stack**: error taxonomy (`error`) and structured logging
//!   (`telemetry`)

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod management;
pub mod migration;
pub mod model;
pub mod pool;
pub mod registry;
pub mod repository;
pub mod router;
pub mod source;
pub mod stats;
pub mod telemetry;

pub use error::{ErrorCode, GatewayError, Result};

/// Re-export of the types most call sites need.
pub mod prelude {
    pub use crate::api::{build_router, AppState};
    pub use crate::config::GatewayConfig;
    pub use crate::dispatcher::Dispatcher;
    pub use crate::error::{ErrorCode, GatewayError, Result};
    pub use crate::health::{HealthMonitor, HealthReport, HealthStatus};
    pub use crate::migration::MigrationService;
    pub use crate::pool::PoolManager;
    pub use crate::registry::{Registry, SharedRegistry};
    pub use crate::repository::Repository;
    pub use crate::source::{ConfigSink, ConfigSource, DbLoader, FileLoader};
}
