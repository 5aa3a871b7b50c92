//! The in-memory, immutable registry of the three config maps.
//!
//! Built once at startup (or on reload); reads after that require no
//! synchronization beyond whatever the caller uses to swap the `Arc` that
//! owns it. Reverse indices are built alongside the primary maps so
//! relationship queries never rescan.

use std::collections::{HashMap, HashSet};

use crate::error::{GatewayError, Result};
use crate::model::{DatabaseConfig, EndpointConfig, QueryConfig};
use crate::source::RawConfigSet;

/// Problems found during `validate()`. Errors halt startup; warnings are
/// logged and retrievable via the Management API.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
pub struct Registry {
    databases: HashMap<String, DatabaseConfig>,
    queries: HashMap<String, QueryConfig>,
    endpoints: HashMap<String, EndpointConfig>,
    database_to_queries: HashMap<String, HashSet<String>>,
    query_to_endpoints: HashMap<String, HashSet<String>>,
    validation: ValidationReport,
}

impl Registry {
    /// Build from a loaded `RawConfigSet`, run `validate()`, and fail with
    /// `ConfigurationError` if any error was found. Warnings are retained
    /// on the returned registry.
    pub fn load(raw: RawConfigSet) -> Result<Self> {
        let registry = Self::build(raw);
        if !registry.validation.is_ok() {
            return Err(GatewayError::configuration(
                registry.validation.errors.join("; "),
            ));
        }
        for warning in &registry.validation.warnings {
            tracing::warn!(%warning, "registry validation warning");
        }
        Ok(registry)
    }

    fn build(raw: RawConfigSet) -> Self {
        let mut database_to_queries: HashMap<String, HashSet<String>> = HashMap::new();
        let mut query_to_endpoints: HashMap<String, HashSet<String>> = HashMap::new();

        for query in raw.queries.values() {
            database_to_queries
                .entry(query.database.clone())
                .or_default()
                .insert(query.name.clone());
        }
        for endpoint in raw.endpoints.values() {
            query_to_endpoints
                .entry(endpoint.query.clone())
                .or_default()
                .insert(endpoint.name.clone());
            if let Some(count_query) = &endpoint.count_query {
                query_to_endpoints
                    .entry(count_query.clone())
                    .or_default()
                    .insert(endpoint.name.clone());
            }
        }

        let mut registry = Self {
            databases: raw.databases,
            queries: raw.queries,
            endpoints: raw.endpoints,
            database_to_queries,
            query_to_endpoints,
            validation: ValidationReport::default(),
        };
        registry.validation = registry.run_validation();
        registry
    }

    fn run_validation(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Structural checks.
        for db in self.databases.values() {
            if db.url.trim().is_empty() {
                errors.push(format!("database {} has an empty url", db.name));
            }
        }
        for query in self.queries.values() {
            if query.sql.trim().is_empty() {
                errors.push(format!("query {} has empty sql", query.name));
            }
            let mut seen_names = HashSet::new();
            for param in &query.parameters {
                if !seen_names.insert(param.name.clone()) {
                    errors.push(format!(
                        "query {} declares parameter {} more than once",
                        query.name, param.name
                    ));
                }
            }
            if query.placeholder_count() != query.parameters.len() {
                errors.push(format!(
                    "query {} declares {} parameters but sql has {} placeholders",
                    query.name,
                    query.parameters.len(),
                    query.placeholder_count()
                ));
            }
        }

        // Referential integrity.
        for query in self.queries.values() {
            if !self.databases.contains_key(&query.database) {
                errors.push(format!(
                    "query {} references non-existent database: {}",
                    query.name, query.database
                ));
            }
        }
        for endpoint in self.endpoints.values() {
            if !self.queries.contains_key(&endpoint.query) {
                errors.push(format!(
                    "{} references non-existent query: {}",
                    endpoint.name, endpoint.query
                ));
            }
            if let Some(count_query) = &endpoint.count_query {
                if !self.queries.contains_key(count_query) {
                    errors.push(format!(
                        "{} references non-existent count query: {}",
                        endpoint.name, count_query
                    ));
                }
            }
        }

        // Pagination coherence.
        for endpoint in self.endpoints.values() {
            let Some(pagination) = &endpoint.pagination else {
                continue;
            };
            if !pagination.enabled {
                continue;
            }
            if pagination.max_size == 0 {
                errors.push(format!("{}: pagination.maxSize must be > 0", endpoint.name));
            }
            if pagination.default_size == 0 {
                errors.push(format!(
                    "{}: pagination.defaultSize must be > 0",
                    endpoint.name
                ));
            }
            if pagination.default_size > pagination.max_size {
                errors.push(format!(
                    "{}: pagination.defaultSize must be <= maxSize",
                    endpoint.name
                ));
            }
            if endpoint.count_query.is_none() {
                warnings.push(format!(
                    "{}: pagination enabled without a countQuery; totalElements will equal data.length",
                    endpoint.name
                ));
            }
            if let Some(query) = self.queries.get(&endpoint.query) {
                let trailing_ok = query.parameters.len() >= 2
                    && query.parameters[query.parameters.len() - 2].name == "limit"
                    && query.parameters[query.parameters.len() - 1].name == "offset";
                if !trailing_ok {
                    errors.push(format!(
                        "{}: paginated endpoint's query {} must declare trailing parameters limit, offset",
                        endpoint.name, endpoint.query
                    ));
                }
            }
        }

        // Endpoint (method, path) uniqueness.
        let mut seen_routes = HashSet::new();
        for endpoint in self.endpoints.values() {
            let route = (endpoint.method.clone(), endpoint.path.clone());
            if !seen_routes.insert(route) {
                errors.push(format!(
                    "duplicate route {} {}",
                    endpoint.method, endpoint.path
                ));
            }
        }

        ValidationReport { errors, warnings }
    }

    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseConfig> {
        self.databases.get(name)
    }

    pub fn query(&self, name: &str) -> Option<&QueryConfig> {
        self.queries.get(name)
    }

    pub fn endpoint(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoints.get(name)
    }

    pub fn databases(&self) -> &HashMap<String, DatabaseConfig> {
        &self.databases
    }

    pub fn queries(&self) -> &HashMap<String, QueryConfig> {
        &self.queries
    }

    pub fn endpoints(&self) -> &HashMap<String, EndpointConfig> {
        &self.endpoints
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.databases.len(), self.queries.len(), self.endpoints.len())
    }

    /// `databaseName -> {queryNames}` reverse index.
    pub fn queries_for_database(&self, database: &str) -> HashSet<String> {
        self.database_to_queries.get(database).cloned().unwrap_or_default()
    }

    /// `queryName -> {endpointNames}` reverse index.
    pub fn endpoints_for_query(&self, query: &str) -> HashSet<String> {
        self.query_to_endpoints.get(query).cloned().unwrap_or_default()
    }
}

/// A reloadable handle on the current registry. Swapping in a new
/// [`Registry`] is atomic for any reader holding a snapshot via
/// [`SharedRegistry::current`] — routes registered against endpoint names
/// at startup keep working, but a reload that introduces brand-new
/// endpoint names doesn't register new axum routes for them until restart.
pub struct SharedRegistry(parking_lot::RwLock<std::sync::Arc<Registry>>);

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self(parking_lot::RwLock::new(std::sync::Arc::new(registry)))
    }

    pub fn current(&self) -> std::sync::Arc<Registry> {
        self.0.read().clone()
    }

    pub fn swap(&self, registry: Registry) {
        *self.0.write() = std::sync::Arc::new(registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointConfig, PaginationConfig, QueryConfig, QueryParameter};
    use crate::model::ParamType;

    fn raw_happy_path() -> RawConfigSet {
        let mut raw = RawConfigSet::default();
        raw.databases.insert(
            "d1".into(),
            DatabaseConfig {
                name: "d1".into(),
                description: String::new(),
                url: "postgres://localhost/d1".into(),
                username: None,
                password: None,
                driver: "postgresql".into(),
                pool: Default::default(),
            },
        );
        raw.queries.insert(
            "q1".into(),
            QueryConfig {
                name: "q1".into(),
                description: String::new(),
                sql: "SELECT 1".into(),
                database: "d1".into(),
                parameters: vec![],
            },
        );
        raw.endpoints.insert(
            "e1".into(),
            EndpointConfig {
                name: "e1".into(),
                path: "/x".into(),
                method: "GET".into(),
                description: String::new(),
                query: "q1".into(),
                count_query: None,
                pagination: None,
                parameters: vec![],
            },
        );
        raw
    }

    #[test]
    fn scenario_1_registry_load_happy_path() {
        let registry = Registry::load(raw_happy_path()).unwrap();
        assert_eq!(registry.counts(), (1, 1, 1));
        assert!(registry.validation().is_ok());
    }

    #[test]
    fn scenario_2_referential_integrity_failure() {
        let mut raw = raw_happy_path();
        raw.endpoints.get_mut("e1").unwrap().query = "missing".into();
        let err = Registry::load(raw).unwrap_err();
        assert!(err.message().contains("e1 references non-existent query: missing"));
    }

    #[test]
    fn reverse_indices_answer_relationship_queries() {
        let registry = Registry::load(raw_happy_path()).unwrap();
        assert!(registry.queries_for_database("d1").contains("q1"));
        assert!(registry.endpoints_for_query("q1").contains("e1"));
    }

    #[test]
    fn pagination_without_count_query_is_a_warning_not_an_error() {
        let mut raw = raw_happy_path();
        raw.queries.get_mut("q1").unwrap().parameters = vec![
            QueryParameter {
                name: "limit".into(),
                param_type: ParamType::Integer,
                required: true,
            },
            QueryParameter {
                name: "offset".into(),
                param_type: ParamType::Integer,
                required: true,
            },
        ];
        raw.queries.get_mut("q1").unwrap().sql = "SELECT 1 LIMIT $1 OFFSET $2".into();
        raw.endpoints.get_mut("e1").unwrap().pagination = Some(PaginationConfig {
            enabled: true,
            default_size: 20,
            max_size: 100,
        });
        let registry = Registry::load(raw).unwrap();
        assert!(registry.validation().is_ok());
        assert_eq!(registry.validation().warnings.len(), 1);
    }

    #[test]
    fn pagination_coherence_rejects_default_size_over_max() {
        let mut raw = raw_happy_path();
        raw.endpoints.get_mut("e1").unwrap().pagination = Some(PaginationConfig {
            enabled: true,
            default_size: 1000,
            max_size: 100,
        });
        raw.queries.get_mut("q1").unwrap().parameters = vec![
            QueryParameter { name: "limit".into(), param_type: ParamType::Integer, required: true },
            QueryParameter { name: "offset".into(), param_type: ParamType::Integer, required: true },
        ];
        raw.queries.get_mut("q1").unwrap().sql = "SELECT 1 LIMIT $1 OFFSET $2".into();
        assert!(Registry::load(raw).is_err());
    }

    #[test]
    fn duplicate_routes_are_rejected() {
        let mut raw = raw_happy_path();
        raw.endpoints.insert(
            "e2".into(),
            EndpointConfig {
                name: "e2".into(),
                path: "/x".into(),
                method: "GET".into(),
                description: String::new(),
                query: "q1".into(),
                count_query: None,
                pagination: None,
                parameters: vec![],
            },
        );
        assert!(Registry::load(raw).is_err());
    }
}
