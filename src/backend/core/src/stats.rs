//! In-process per-endpoint request counters for the Management API's
//! statistics endpoint. Deliberately not Prometheus: ambient observability
//! here is "what the dashboard endpoint can show", not an exported metrics
//! surface — scraping/exporting metrics is out of scope.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

#[derive(Default)]
struct Counter {
    requests: AtomicU64,
    total_latency_ms: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub requests: u64,
    pub errors: u64,
    pub average_latency_ms: f64,
}

#[derive(Default)]
pub struct RequestStats {
    by_endpoint: DashMap<String, Counter>,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, endpoint: &str, latency: Duration, succeeded: bool) {
        let counter = self.by_endpoint.entry(endpoint.to_string()).or_default();
        counter.requests.fetch_add(1, Ordering::Relaxed);
        counter
            .total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        if !succeeded {
            counter.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Vec<EndpointStats> {
        let mut out: Vec<EndpointStats> = self
            .by_endpoint
            .iter()
            .map(|entry| {
                let requests = entry.requests.load(Ordering::Relaxed);
                let total_latency_ms = entry.total_latency_ms.load(Ordering::Relaxed);
                let average_latency_ms = if requests == 0 {
                    0.0
                } else {
                    total_latency_ms as f64 / requests as f64
                };
                EndpointStats {
                    endpoint: entry.key().clone(),
                    requests,
                    errors: entry.errors.load(Ordering::Relaxed),
                    average_latency_ms,
                }
            })
            .collect();
        out.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_latency_across_recorded_requests() {
        let stats = RequestStats::new();
        stats.record("e1", Duration::from_millis(10), true);
        stats.record("e1", Duration::from_millis(20), true);
        stats.record("e1", Duration::from_millis(30), false);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].requests, 3);
        assert_eq!(snapshot[0].errors, 1);
        assert_eq!(snapshot[0].average_latency_ms, 20.0);
    }
}
