//! Structured logging.
//!
//! Logs are emitted through `tracing`; in containers they are formatted as
//! JSON with consistent fields so a log shipper can parse them:
//! - `timestamp`: ISO 8601 timestamp
//! - `level`: Log level (trace, debug, info, warn, error)
//! - `component`: Gateway component (ledger_confirmation, node_worker, ...)
//! - `node`: Node name, for per-node events
//! - `state_version`: Ledger position, for ledger events

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Structured logger handle
pub struct StructuredLogger {
    json: bool,
}

impl StructuredLogger {
    /// Whether log lines are formatted as JSON.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Build the env filter from the configured level, preferring `RUST_LOG`.
pub(crate) fn build_env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Install the global `tracing` subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<StructuredLogger, TelemetryError> {
    let env_filter = build_env_filter(config)?;

    if !config.console_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        return Ok(StructuredLogger { json: false });
    }

    if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        network = %config.network,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(StructuredLogger {
        json: config.json_logs,
    })
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    // Info level with component
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with component
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with component
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with component
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a per-node event with standard fields.
#[macro_export]
macro_rules! log_node_event {
    ($level:ident, $component:expr, $msg:expr, $node:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            node = %$node,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a ledger-position event with standard fields.
#[macro_export]
macro_rules! log_ledger_event {
    ($level:ident, $component:expr, $msg:expr, $state_version:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            state_version = $state_version,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        let config = TelemetryConfig {
            log_level: "info,lg_01_ledger_confirmation=debug".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_macros_expand() {
        log_event!(info, "ledger_confirmation", "tick finished", committed = 3);
        log_node_event!(warn, "ledger_confirmation", "node out of date", "node-1");
        log_ledger_event!(debug, "ledger_confirmation", "position accepted", 42u64);
    }
}
