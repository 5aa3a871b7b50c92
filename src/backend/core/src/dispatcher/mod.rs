//! Per-request orchestration: look up the endpoint, resolve pagination,
//! coerce and bind parameters, execute, shape the response.
//!
//! This is the one place request-to-parameter coercion happens; everything
//! downstream (Repository) works only with already-bound, already-typed
//! values.

use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::model::{
    BoundParameter, GatewayResponse, PageInfo, QueryConfig, RequestParameters, TypedValue,
};
use crate::pool::PoolManager;
use crate::registry::SharedRegistry;
use crate::repository::Repository;

pub struct Dispatcher {
    registry: Arc<SharedRegistry>,
    pool_manager: Arc<PoolManager>,
    repository: Arc<Repository>,
}

struct PaginationWindow {
    page: u64,
    size: u64,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SharedRegistry>,
        pool_manager: Arc<PoolManager>,
        repository: Arc<Repository>,
    ) -> Self {
        Self {
            registry,
            pool_manager,
            repository,
        }
    }

    pub async fn dispatch(
        &self,
        endpoint_name: &str,
        mut params: RequestParameters,
    ) -> Result<GatewayResponse> {
        // Snapshot once so a reload mid-dispatch can't mix an endpoint from
        // one registry generation with a query from another.
        let registry = self.registry.current();
        let endpoint = registry
            .endpoint(endpoint_name)
            .ok_or_else(|| GatewayError::not_found(format!("endpoint unknown: {endpoint_name}")))?;
        let query = registry.query(&endpoint.query).ok_or_else(|| {
            GatewayError::internal(format!(
                "endpoint {endpoint_name} references unresolvable query {}",
                endpoint.query
            ))
        })?;

        if !self.pool_manager.is_available(&query.database) {
            let reason = self
                .pool_manager
                .failure_reason(&query.database)
                .unwrap_or_else(|| "no connection has succeeded yet".to_string());
            return Err(GatewayError::service_unavailable(format!(
                "database {} unavailable: {reason}",
                query.database
            )));
        }

        let window = match &endpoint.pagination {
            Some(pagination) if pagination.enabled => {
                Some(self.resolve_pagination_window(&params, pagination, endpoint_name)?)
            }
            _ => None,
        };
        if let Some(window) = &window {
            params.insert("limit", window.size.to_string());
            params.insert("offset", (window.page * window.size).to_string());
        }

        let bound = build_bound_parameters(query, &params)?;
        let rows = self.repository.execute_query(query, &bound).await?;

        let Some(window) = window else {
            return match rows.len() {
                0 => Err(GatewayError::not_found("No data found")),
                1 => Ok(GatewayResponse::single(rows.into_iter().next().unwrap())),
                _ => Ok(GatewayResponse::list(rows)),
            };
        };

        let total_elements = match &endpoint.count_query {
            Some(count_query_name) => {
                let count_query = registry.query(count_query_name).ok_or_else(|| {
                    GatewayError::internal(format!(
                        "endpoint {endpoint_name} references unresolvable count query {count_query_name}"
                    ))
                })?;
                let count_bound = build_bound_parameters(count_query, &params)?;
                self.repository
                    .execute_count_query(count_query, &count_bound)
                    .await?
            }
            None => rows.len() as i64,
        };

        let total_pages = if window.size == 0 {
            0
        } else {
            (total_elements as f64 / window.size as f64).ceil() as u64
        };
        let page_info = PageInfo {
            page: window.page,
            size: window.size,
            total_elements: total_elements.max(0) as u64,
            total_pages,
            first: window.page == 0,
            last: window.page + 1 >= total_pages,
        };
        Ok(GatewayResponse::paged(rows, page_info))
    }

    fn resolve_pagination_window(
        &self,
        params: &RequestParameters,
        pagination: &crate::model::PaginationConfig,
        endpoint_name: &str,
    ) -> Result<PaginationWindow> {
        let page: u64 = match params.get("page") {
            Some(raw) => raw
                .parse()
                .map_err(|_| GatewayError::bad_request(format!("invalid page value: {raw}")))?,
            None => 0,
        };
        let size: u64 = match params.get("size") {
            Some(raw) => raw
                .parse()
                .map_err(|_| GatewayError::bad_request(format!("invalid size value: {raw}")))?,
            None => pagination.default_size,
        };
        if size == 0 || size > pagination.max_size {
            return Err(GatewayError::bad_request(format!(
                "{endpoint_name}: size must be between 1 and {}",
                pagination.max_size
            )));
        }
        Ok(PaginationWindow { page, size })
    }
}

/// Walks `query.parameters` in declaration order, coercing each present
/// value and assigning contiguous 1-based positions (missing-and-optional
/// parameters are skipped, not given a position).
fn build_bound_parameters(
    query: &QueryConfig,
    params: &RequestParameters,
) -> Result<Vec<BoundParameter>> {
    let mut bound = Vec::with_capacity(query.parameters.len());
    let mut position = 1usize;
    for param in &query.parameters {
        match params.get(&param.name) {
            Some(raw) => {
                let typed_value = TypedValue::coerce(raw, param.param_type)?;
                bound.push(BoundParameter {
                    name: param.name.clone(),
                    typed_value,
                    param_type: param.param_type,
                    position,
                });
                position += 1;
            }
            None => {
                if param.required {
                    return Err(GatewayError::bad_request(format!(
                        "missing required parameter: {}",
                        param.name
                    )));
                }
            }
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamType, QueryParameter};

    fn query_with_params(params: Vec<QueryParameter>) -> QueryConfig {
        QueryConfig {
            name: "q1".into(),
            description: String::new(),
            sql: "SELECT 1".into(),
            database: "d1".into(),
            parameters: params,
        }
    }

    #[test]
    fn assigns_contiguous_positions_skipping_missing_optional() {
        let query = query_with_params(vec![
            QueryParameter { name: "a".into(), param_type: ParamType::String, required: true },
            QueryParameter { name: "b".into(), param_type: ParamType::Integer, required: false },
            QueryParameter { name: "c".into(), param_type: ParamType::String, required: true },
        ]);
        let mut params = RequestParameters::new();
        params.insert("a", "x");
        params.insert("c", "y");
        let bound = build_bound_parameters(&query, &params).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].position, 1);
        assert_eq!(bound[1].position, 2);
        assert_eq!(bound[1].name, "c");
    }

    #[test]
    fn missing_required_parameter_is_bad_request() {
        let query = query_with_params(vec![QueryParameter {
            name: "a".into(),
            param_type: ParamType::String,
            required: true,
        }]);
        let params = RequestParameters::new();
        let err = build_bound_parameters(&query, &params).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::BadRequest);
    }
}
