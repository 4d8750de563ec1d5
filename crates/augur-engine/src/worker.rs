//! Background worker for continuous evaluation cycles

use crate::{CycleReport, Engine, EngineError};
use augur_domain::traits::{CollaboratorError, EngineStore, KnowledgeGraph, LlmProvider, WebSearch};
use std::fmt::Display;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Background worker that runs evaluation cycles on a schedule
///
/// A tick that finds another cycle holding the lease is skipped, not queued.
///
/// # Examples
///
/// ```no_run
/// use augur_engine::{Engine, EngineConfig, EngineWorker};
/// use augur_providers::{MockGraph, MockProvider, MockSearch};
/// use augur_store::SqliteStore;
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = EngineConfig::default();
///     let store = SqliteStore::new("augur.db", config.thresholds()?)?;
///     let engine = Engine::new(
///         Arc::new(Mutex::new(store)),
///         Arc::new(MockProvider::default()),
///         Arc::new(MockGraph::new()),
///         Arc::new(MockSearch::new()),
///         config,
///     )?;
///     let worker = EngineWorker::new(Arc::new(engine), Duration::from_secs(600));
///
///     // Run until Ctrl+C
///     worker.run().await?;
///     Ok(())
/// }
/// ```
pub struct EngineWorker<S, L, G, W> {
    engine: Arc<Engine<S, L, G, W>>,
    interval: Duration,
}

impl<S, L, G, W> EngineWorker<S, L, G, W>
where
    S: EngineStore,
    S::Error: Display,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Into<CollaboratorError> + Send + 'static,
    G: KnowledgeGraph + Send + Sync + 'static,
    G::Error: Into<CollaboratorError> + Send + 'static,
    W: WebSearch + Send + Sync + 'static,
    W::Error: Into<CollaboratorError> + Send + 'static,
{
    /// Create a worker ticking every `interval`
    pub fn new(engine: Arc<Engine<S, L, G, W>>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Engine driven by this worker
    pub fn engine(&self) -> &Arc<Engine<S, L, G, W>> {
        &self.engine
    }

    /// Run cycles until a shutdown signal (Ctrl+C) is received
    ///
    /// Cycle failures are logged; the worker keeps ticking.
    pub async fn run(&self) -> Result<(), EngineError> {
        if self.interval.is_zero() {
            return Err(EngineError::Worker("interval must be positive".to_string()));
        }
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Engine worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting evaluation cycle");
                    match self.engine.run_cycle().await {
                        Ok(report) => log_report(&report),
                        Err(EngineError::CapacityExceeded { holder, expires_at }) => {
                            tracing::info!("Skipping tick: cycle {} still running (lease until {})", holder, expires_at);
                        }
                        Err(e) => tracing::error!("Cycle failed: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping engine worker");
                    break;
                }
            }
        }

        tracing::info!("Engine worker stopped. Final metrics:\n{}", self.engine.metrics().summary());
        Ok(())
    }

    /// Run a fixed number of ticks, returning the reports of completed cycles
    ///
    /// Skipped ticks produce no report; any other error stops the run.
    pub async fn run_cycles(&self, cycles: usize) -> Result<Vec<CycleReport>, EngineError> {
        if self.interval.is_zero() {
            return Err(EngineError::Worker("interval must be positive".to_string()));
        }
        let mut ticker = interval(self.interval);
        let mut reports = Vec::with_capacity(cycles);

        tracing::info!("Engine worker started for {} cycles (interval: {:?})", cycles, self.interval);

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting evaluation cycle {}/{}", cycle + 1, cycles);

            match self.engine.run_cycle().await {
                Ok(report) => {
                    log_report(&report);
                    reports.push(report);
                }
                Err(EngineError::CapacityExceeded { holder, .. }) => {
                    tracing::info!("Cycle {}/{} skipped: lease held by {}", cycle + 1, cycles, holder);
                }
                Err(e) => {
                    tracing::error!("Cycle {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Engine worker finished {} cycles. Final metrics:\n{}",
            cycles,
            self.engine.metrics().summary()
        );
        Ok(reports)
    }
}

fn log_report(report: &CycleReport) {
    tracing::info!(
        "Cycle completed: {} passes, {} updated, {} escalated, {} rejected in {:?}",
        report.passes,
        report.hypotheses_updated,
        report.escalated,
        report.rejected,
        report.elapsed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use augur_domain::{BandThresholds, Signal};
    use augur_providers::{MockGraph, MockProvider, MockSearch};
    use augur_store::SqliteStore;
    use std::sync::Mutex;

    type TestEngine = Engine<SqliteStore, MockProvider, MockGraph, MockSearch>;

    fn engine() -> Arc<TestEngine> {
        let store = SqliteStore::new(":memory:", BandThresholds::default()).unwrap();
        let engine = Engine::new(
            Arc::new(Mutex::new(store)),
            Arc::new(MockProvider::default()),
            Arc::new(MockGraph::new()),
            Arc::new(MockSearch::new()),
            EngineConfig::default(),
        )
        .unwrap();
        Arc::new(engine)
    }

    #[tokio::test]
    async fn test_run_cycles() {
        let engine = engine();
        engine
            .ingest_signal(Signal::new("org:acme", "procurement", "Tender notice", 1_700_000_000))
            .await
            .unwrap();

        let worker = EngineWorker::new(Arc::clone(&engine), Duration::from_millis(10));
        let reports = worker.run_cycles(2).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(engine.metrics().cycles, 2);
        // The first cycle drains the single hypothesis's pass budget
        assert_eq!(reports[0].passes, 4);
        assert_eq!(reports[1].passes, 0);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let worker = EngineWorker::new(engine(), Duration::ZERO);
        assert!(matches!(worker.run_cycles(1).await, Err(EngineError::Worker(_))));
    }

    #[tokio::test]
    async fn test_reset_metrics_between_runs() {
        let engine = engine();
        let worker = EngineWorker::new(Arc::clone(&engine), Duration::from_millis(10));
        worker.run_cycles(1).await.unwrap();
        assert_eq!(engine.metrics().cycles, 1);

        worker.engine().reset_metrics();
        assert_eq!(engine.metrics().cycles, 0);
    }
}
