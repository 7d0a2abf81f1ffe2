use jiff::Timestamp;
use serde::Serialize;

use super::{DemoPipeline, DemoResult};
use crate::TRACING_TARGET_PIPELINE;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Matches whose pending entry expired during this run.
    pub expired: Vec<String>,
    /// Set when another sweep was still running and this one did nothing.
    pub skipped: bool,
}

impl DemoPipeline {
    /// Expires every match that has been open longer than the match timeout.
    ///
    /// Expired matches are kept: an open match becomes
    /// `expired-without-demo`, a finalized one keeps its status, and either
    /// way the demo becomes `not-applicable`. Matches with a demo in transit
    /// are left for the transfer to settle. Runs never overlap; a call made
    /// while another is in progress returns a skipped report.
    pub async fn sweep(&self, now: Timestamp) -> DemoResult<SweepReport> {
        let Ok(_running) = self.sweeping.try_lock() else {
            tracing::debug!(
                target: TRACING_TARGET_PIPELINE,
                "Sweep already running, skipping"
            );
            return Ok(SweepReport {
                expired: Vec::new(),
                skipped: true,
            });
        };

        let expired = self
            .queue
            .sweep_except(now, |match_id| self.is_in_flight(match_id));
        for match_id in &expired {
            let Some(record) = self.matches.expire_match(match_id).await? else {
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    match_id = %match_id,
                    "Swept match has no record"
                );
                continue;
            };
            self.invalidate_views(&record).await;
        }

        Ok(SweepReport {
            expired,
            skipped: false,
        })
    }
}
