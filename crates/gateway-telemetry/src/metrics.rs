//! Prometheus metrics shared by the gateway components.
//!
//! All metrics follow the naming convention: `ng_<area>_<metric>_<unit>`
//!
//! Component crates register their own collectors with the default
//! Prometheus registry; `encode_metrics` exposes both.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Global worker loop iterations, labelled by worker and outcome
    pub static ref WORKER_LOOP_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("ng_workers_global_loop_outcome_count", "Global worker loop iterations by outcome"),
        &["worker", "outcome"]
    ).expect("metric creation failed");

    /// Global worker errors, labelled by worker and error kind
    pub static ref WORKER_ERRORS: CounterVec = CounterVec::new(
        Opts::new("ng_workers_global_error_count", "Errors in global workers"),
        &["worker", "error"]
    ).expect("metric creation failed");

    /// Global worker loop duration
    pub static ref WORKER_LOOP_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ng_workers_global_loop_duration_seconds",
            "Time spent in one global worker loop iteration"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid bucket layout"))
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register the shared gateway metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(WORKER_LOOP_OUTCOMES.clone()),
        Box::new(WORKER_ERRORS.clone()),
        Box::new(WORKER_LOOP_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics (gateway registry and default registry) as Prometheus
/// text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut metric_families = REGISTRY.gather();
    metric_families.extend(prometheus::gather());

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // May fail if already registered by another test, which is fine
        let _ = register_metrics();
    }

    #[test]
    fn test_outcome_counter_increment() {
        WORKER_LOOP_OUTCOMES
            .with_label_values(&["ledger_confirmation", "committed"])
            .inc();
        assert!(
            WORKER_LOOP_OUTCOMES
                .with_label_values(&["ledger_confirmation", "committed"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_histogram_timer() {
        let before = WORKER_LOOP_DURATION.get_sample_count();
        {
            let _timer = HistogramTimer::new(&WORKER_LOOP_DURATION);
        }
        assert!(WORKER_LOOP_DURATION.get_sample_count() > before);
    }

    #[test]
    fn test_encode_metrics() {
        let _ = register_metrics();
        WORKER_ERRORS
            .with_label_values(&["ledger_confirmation", "persistence"])
            .inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("ng_workers_global_error_count"));
    }
}
