//! Typed configuration value objects and the request/response vocabulary
//! built on top of them.

pub mod database;
pub mod endpoint;
pub mod query;
pub mod record;
pub mod response;
pub mod value;

pub use database::{DatabaseConfig, PoolSettings};
pub use endpoint::{EndpointConfig, EndpointParameter, PaginationConfig, ParameterSource};
pub use query::{QueryConfig, QueryParameter};
pub use record::Record;
pub use response::{GatewayResponse, PageInfo};
pub use value::{ParamType, TypedValue};

use std::collections::HashMap;

/// Request parameters captured from path vars, query string and body
/// fields, before coercion to any declared [`ParamType`].
#[derive(Debug, Clone, Default)]
pub struct RequestParameters(HashMap<String, String>);

impl RequestParameters {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = (String, String)>) {
        self.0.extend(other);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }
}

/// A [`QueryParameter`] bound to a coerced value at a 1-based position.
#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub name: String,
    pub typed_value: TypedValue,
    pub param_type: ParamType,
    pub position: usize,
}
