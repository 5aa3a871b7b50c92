//! `EndpointConfig` — one HTTP route bound to a query.

use serde::{Deserialize, Serialize};

use super::value::ParamType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(skip_deserializing, default)]
    pub name: String,
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub description: String,
    pub query: String,
    #[serde(default)]
    pub count_query: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub parameters: Vec<EndpointParameter>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_pagination_enabled")]
    pub enabled: bool,
    #[serde(default = "default_page_size")]
    pub default_size: u64,
    #[serde(default = "default_max_size")]
    pub max_size: u64,
}

fn default_pagination_enabled() -> bool {
    true
}
fn default_page_size() -> u64 {
    20
}
fn default_max_size() -> u64 {
    500
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterSource {
    Path,
    Query,
    BodyField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointParameter {
    pub name: String,
    pub source: ParameterSource,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
}
