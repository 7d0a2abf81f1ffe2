//! Abandoned match sweep worker.
//!
//! Expires matches that stayed open past the match timeout, on a fixed
//! interval independent of request traffic.

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pipeline::DemoPipeline;
use crate::{Error, Result, TRACING_TARGET_WORKER};

/// Runs [`DemoPipeline::sweep`] every `interval`.
pub struct SweepWorker {
    pipeline: Arc<DemoPipeline>,
    interval: Duration,
}

impl SweepWorker {
    pub fn new(pipeline: Arc<DemoPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Run the sweep worker until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_WORKER,
            interval_secs = self.interval.as_secs(),
            "Starting sweep worker"
        );

        let result = self.run_inner(cancel).await;

        match &result {
            Ok(()) => {
                tracing::info!(target: TRACING_TARGET_WORKER, "Sweep worker stopped");
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    error = %err,
                    "Sweep worker failed"
                );
            }
        }

        result
    }

    async fn run_inner(&self, cancel: CancellationToken) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::config("sweep interval must be positive"));
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        match self.pipeline.sweep(Timestamp::now()).await {
            Ok(report) if !report.expired.is_empty() => {
                tracing::info!(
                    target: TRACING_TARGET_WORKER,
                    expired = report.expired.len(),
                    "Expired abandoned matches"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_WORKER,
                    error = %err,
                    "Sweep failed, retrying next interval"
                );
            }
        }
    }
}
