//! Structured logging initialization.
//!
//! The teacher carries a full logging/tracing/metrics stack; this gateway
//! keeps the logging half only (JSON/pretty structured logs via
//! `tracing-subscriber`) and drops the OpenTelemetry tracing exporter and the
//! Prometheus metrics registry — request counters live in [`crate::stats`]
//! instead, surfaced through the Management API rather than scraped.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig, RedactionConfig, RedactionPattern};

use crate::config::ObservabilityConfig;

/// Initialize structured logging from process configuration. Call once at
/// startup, before anything else logs.
pub fn init_from_config(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let logging = LoggingConfig {
        level: config.log_level.clone(),
        format: if config.json_logging {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        ..LoggingConfig::default()
    };
    init_logging(&logging, "production")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observability_config_maps_json_flag_to_format() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            json_logging: true,
        };
        let logging = LoggingConfig {
            level: config.log_level.clone(),
            format: if config.json_logging {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            ..LoggingConfig::default()
        };
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
    }
}
