//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `info,lg_01_ledger_confirmation=debug`
    pub log_level: String,

    /// Whether to enable console output (for development)
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Network identifier (mainnet, stokenet, localnet), attached to the
    /// startup log line
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ledger-gateway".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "localnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: ledger-gateway)
    /// - `LG_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `LG_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `LG_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `LG_NETWORK`: Network name (default: localnet)
    ///
    /// Metrics are exposed through `encode_metrics`; serving them is left to
    /// the host process.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "ledger-gateway".to_string()),

            log_level: lookup("LG_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            console_output: lookup("LG_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: lookup("LG_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            network: lookup("LG_NETWORK").unwrap_or_else(|| "localnet".to_string()),
        }
    }

    /// Create configuration for a named gateway component.
    pub fn for_component(component: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("ledger-gateway-{}", component);
        config
    }
}
