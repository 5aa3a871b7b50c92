//! The HTTP response envelope: `{type, data, pagination?, timestamp}`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::Record;

#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum GatewayResponse {
    #[serde(rename = "SINGLE")]
    Single {
        data: Record,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "LIST")]
    List {
        data: Vec<Record>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "PAGED")]
    Paged {
        data: Vec<Record>,
        pagination: PageInfo,
        timestamp: DateTime<Utc>,
    },
}

impl GatewayResponse {
    pub fn single(data: Record) -> Self {
        Self::Single {
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn list(data: Vec<Record>) -> Self {
        Self::List {
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn paged(data: Vec<Record>, pagination: PageInfo) -> Self {
        Self::Paged {
            data,
            pagination,
            timestamp: Utc::now(),
        }
    }
}
