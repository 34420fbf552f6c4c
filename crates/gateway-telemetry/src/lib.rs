//! # Gateway Telemetry
//!
//! Observability bootstrap for the ledger gateway.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with env-filter, pretty or JSON output
//! - **Metrics**: Prometheus registry shared by the gateway components
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::for_component("data-aggregator");
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `ledger-gateway` | Service name in logs |
//! | `LG_LOG_LEVEL` | `info` | Log level filter |
//! | `LG_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `LG_NETWORK` | `localnet` | Network name, logged at startup |
//!
//! Metrics are not served by this crate: the host process exposes the text
//! returned by `encode_metrics` on whatever endpoint it runs.

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, StructuredLogger};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, WORKER_ERRORS,
    WORKER_LOOP_DURATION, WORKER_LOOP_OUTCOMES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Initialize metrics first so startup logs can already be counted
    let metrics_handle = register_metrics()?;

    let logger = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logger: logger,
        _metrics: metrics_handle,
        config,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logger: StructuredLogger,
    _metrics: MetricsHandle,
    config: TelemetryConfig,
}

impl TelemetryGuard {
    /// The configuration telemetry was initialized with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_telemetry_once() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        // Metrics may already be registered by the metrics tests in this binary
        match init_telemetry(config) {
            Ok(guard) => assert_eq!(guard.config().service_name, "ledger-gateway"),
            Err(TelemetryError::MetricsInit(_)) | Err(TelemetryError::LoggingInit(_)) => {}
            Err(e) => panic!("unexpected telemetry error: {e}"),
        }
    }
}
