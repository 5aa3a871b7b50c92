//! Registers one axum route per configured endpoint, delegating to the
//! Dispatcher by name.
//!
//! Grounded in the teacher's `api::build_router` (axum `Router` assembled
//! from a loop registering handlers), generalized from a fixed handler set
//! to one closure per `EndpointConfig`, each capturing its own name.

use std::collections::HashMap;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::AppState;
use crate::error::Result as GatewayResult;
use crate::model::{GatewayResponse, RequestParameters};

/// Build the dynamic dispatch router: one route per `EndpointConfig`, read
/// from the registry as of build time. A reload that only changes existing
/// endpoints' queries/pagination is picked up live through `Dispatcher`; a
/// reload that adds a brand-new endpoint name needs a restart to get a route.
/// Endpoints declared with a method other than GET are skipped — write
/// endpoints are out of scope — but that doesn't abort startup, it just
/// leaves the endpoint unreachable.
pub fn build(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    let snapshot = state.registry.current();
    for endpoint in snapshot.endpoints().values() {
        if !endpoint.method.eq_ignore_ascii_case("GET") {
            tracing::warn!(
                endpoint = %endpoint.name,
                method = %endpoint.method,
                "skipping endpoint with unsupported method"
            );
            continue;
        }
        let name = endpoint.name.clone();
        let handler = move |state: State<AppState>, path: Path<HashMap<String, String>>, query: Query<HashMap<String, String>>| {
            let name = name.clone();
            async move { respond(state, name, path, query).await }
        };
        router = router.route(&endpoint.path, get(handler));
    }
    router
}

async fn respond(
    State(state): State<AppState>,
    endpoint_name: String,
    Path(path_params): Path<HashMap<String, String>>,
    Query(query_params): Query<HashMap<String, String>>,
) -> GatewayResult<Json<GatewayResponse>> {
    // Merge every path var and query string field into the working map
    // unconditionally, including `page`/`size` and names the endpoint
    // doesn't declare a parameter for — `Dispatcher` is what filters this
    // down to the query's own declared parameters. Body fields would merge
    // here too, but this gateway only registers GET routes, so there's
    // never a body to extract.
    let mut params = RequestParameters::new();
    params.extend(path_params);
    params.extend(query_params);

    let started = Instant::now();
    let result = state.dispatcher.dispatch(&endpoint_name, params).await;
    state
        .stats
        .record(&endpoint_name, started.elapsed(), result.is_ok());
    Ok(Json(result?))
}
