//! Confirmation Worker
//!
//! Drives `handle_ledger_extension_if_quorum` on a fixed interval until
//! cancelled. A failed tick is logged and counted, then the next tick
//! retries from the committed tip: buffers are untouched by failures.

use gateway_telemetry::{HistogramTimer, WORKER_ERRORS, WORKER_LOOP_DURATION, WORKER_LOOP_OUTCOMES};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ConfirmationError, ConfirmationResult};
use crate::ports::inbound::{LedgerConfirmationApi, TickOutcome};

const WORKER_NAME: &str = "ledger_confirmation";

/// Counters accumulated over a worker run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub ticks: u64,
    pub commits: u64,
    pub transactions_committed: u64,
    pub failed_ticks: u64,
}

/// Periodic confirmation loop.
pub struct ConfirmationWorker<A: LedgerConfirmationApi> {
    api: Arc<A>,
    tick_interval: Duration,
}

impl<A: LedgerConfirmationApi> ConfirmationWorker<A> {
    pub fn new(api: Arc<A>, tick_interval: Duration) -> Self {
        Self {
            api,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
        }
    }

    /// Run ticks until `cancel` fires. Returns what the run did.
    pub async fn run(&self, cancel: CancellationToken) -> WorkerStats {
        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "[lg-01] Confirmation worker started"
        );

        let mut stats = WorkerStats::default();
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            stats.ticks += 1;
            match self.tick_once(&cancel).await {
                Ok(TickOutcome::Committed(summary)) => {
                    stats.commits += 1;
                    stats.transactions_committed += summary.transactions_committed();
                }
                Ok(_) => {}
                Err(ConfirmationError::Cancelled) => break,
                Err(_) => stats.failed_ticks += 1,
            }
        }

        info!(
            ticks = stats.ticks,
            commits = stats.commits,
            transactions_committed = stats.transactions_committed,
            "[lg-01] Confirmation worker stopped"
        );
        stats
    }

    /// Run a single tick, recording its outcome.
    pub async fn tick_once(&self, cancel: &CancellationToken) -> ConfirmationResult<TickOutcome> {
        let _timer = HistogramTimer::new(&WORKER_LOOP_DURATION);
        let result = self.api.handle_ledger_extension_if_quorum(cancel).await;

        match &result {
            Ok(outcome) => {
                WORKER_LOOP_OUTCOMES
                    .with_label_values(&[WORKER_NAME, outcome.label()])
                    .inc();
                debug!(outcome = outcome.label(), "Confirmation tick finished");
            }
            Err(ConfirmationError::Cancelled) => {
                debug!("Confirmation tick cancelled");
            }
            Err(e) => {
                WORKER_ERRORS
                    .with_label_values(&[WORKER_NAME, e.kind()])
                    .inc();
                if e.is_consistency_failure() {
                    error!(error = %e, "Quorum extension rejected, retrying next tick");
                } else {
                    warn!(error = %e, "Confirmation tick failed, retrying next tick");
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryLedgerExtender, StaticConfigProvider};
    use crate::config::{GatewayConfig, NodeRecord};
    use crate::domain::TrustWeight;
    use crate::service::LedgerConfirmationService;

    fn service(nodes: Vec<NodeRecord>) -> Arc<LedgerConfirmationService<InMemoryLedgerExtender, StaticConfigProvider>> {
        Arc::new(LedgerConfirmationService::new(
            Arc::new(InMemoryLedgerExtender::new()),
            Arc::new(StaticConfigProvider::new(GatewayConfig::with_nodes(nodes))),
            Vec::new(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_stops_on_cancel() {
        let worker = ConfirmationWorker::new(service(Vec::new()), Duration::from_millis(200));
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert!(stats.ticks >= 5);
        assert_eq!(stats.commits, 0);
        assert_eq!(stats.failed_ticks, 0);
    }

    #[tokio::test]
    async fn test_tick_once_reports_outcome() {
        let worker = ConfirmationWorker::new(service(Vec::new()), Duration::from_millis(10));
        let outcome = worker.tick_once(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NoVotersConfigured));
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let worker = ConfirmationWorker::new(
            service(vec![NodeRecord::new("a", TrustWeight::whole(1))]),
            Duration::from_millis(10),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = worker.run(cancel).await;
        assert_eq!(stats, WorkerStats::default());
    }
}
