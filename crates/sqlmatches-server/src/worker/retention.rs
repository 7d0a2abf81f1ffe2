//! Demo retention worker.

use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pipeline::DemoPipeline;
use crate::{Error, Result, TRACING_TARGET_WORKER};

/// Deletes demos older than the retention period every `interval`.
pub struct RetentionWorker {
    pipeline: Arc<DemoPipeline>,
    retention: SignedDuration,
    interval: Duration,
}

impl RetentionWorker {
    pub fn new(pipeline: Arc<DemoPipeline>, retention: SignedDuration, interval: Duration) -> Self {
        Self {
            pipeline,
            retention,
            interval,
        }
    }

    /// Run the retention worker until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_WORKER,
            retention_secs = self.retention.as_secs(),
            "Starting retention worker"
        );

        let result = self.run_inner(cancel).await;

        match &result {
            Ok(()) => {
                tracing::info!(target: TRACING_TARGET_WORKER, "Retention worker stopped");
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    error = %err,
                    "Retention worker failed"
                );
            }
        }

        result
    }

    async fn run_inner(&self, cancel: CancellationToken) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::config("retention interval must be positive"));
        }
        if self.pipeline.storage().is_none() {
            tracing::info!(
                target: TRACING_TARGET_WORKER,
                "No storage backend, retention worker idle"
            );
            cancel.cancelled().await;
            return Ok(());
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    if let Err(err) = self
                        .pipeline
                        .expire_demos(Timestamp::now(), self.retention)
                        .await
                    {
                        tracing::warn!(
                            target: TRACING_TARGET_WORKER,
                            error = %err,
                            "Retention pass failed, retrying next interval"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sqlmatches_cache::Cache;

    use super::*;
    use crate::pipeline::UploadAllowance;
    use crate::queue::PendingQueue;
    use crate::repository::MemoryMatchRepository;

    #[tokio::test]
    async fn stops_when_cancelled() -> anyhow::Result<()> {
        let pipeline = Arc::new(DemoPipeline::new(
            Arc::new(MemoryMatchRepository::new()),
            Arc::new(PendingQueue::default()),
            None,
            Cache::memory(),
            UploadAllowance::default(),
        ));
        let worker = RetentionWorker::new(
            pipeline,
            SignedDuration::from_hours(1),
            Duration::from_secs(3600),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        worker.run(cancel).await?;
        Ok(())
    }
}
