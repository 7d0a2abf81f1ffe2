use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use super::{DemoPipeline, DemoResult};
use crate::TRACING_TARGET_PIPELINE;

/// Demo retention used when none is configured: twenty weeks.
pub const DEFAULT_DEMO_EXPIRY: SignedDuration = SignedDuration::from_hours(20 * 7 * 24);

/// Outcome of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    /// Matches whose demo was removed.
    pub expired: Vec<String>,
    /// Matches whose demo could not be removed and will be retried next pass.
    pub failed: Vec<String>,
}

impl DemoPipeline {
    /// Deletes demos uploaded more than `retention` before `now` and marks
    /// them `expired`.
    ///
    /// A delete that fails leaves the record untouched for the next pass.
    pub async fn expire_demos(
        &self,
        now: Timestamp,
        retention: SignedDuration,
    ) -> DemoResult<RetentionReport> {
        let mut report = RetentionReport::default();
        let Some(storage) = self.storage.as_ref() else {
            return Ok(report);
        };

        let cutoff = now.checked_sub(retention).unwrap_or(Timestamp::MIN);
        let candidates = self.matches.list_demos_uploaded_before(cutoff).await?;

        for record in candidates {
            if let Some(location) = &record.demo_location
                && let Err(err) = storage.delete(location).await
            {
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    match_id = %record.match_id,
                    error = %err,
                    "Failed to delete expired demo"
                );
                report.failed.push(record.match_id);
                continue;
            }

            let record = self
                .matches
                .update_demo(&record.match_id, record.demo().expired())
                .await?;
            self.invalidate_views(&record).await;
            report.expired.push(record.match_id);
        }

        if !report.expired.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_PIPELINE,
                expired = report.expired.len(),
                failed = report.failed.len(),
                "Expired stored demos"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use jiff::SignedDuration;

    use super::DEFAULT_DEMO_EXPIRY;
    use crate::model::DemoStatus;
    use crate::pipeline::tests::{CountingBackend, Fixture, body, community};
    use crate::repository::MatchRepository;

    #[tokio::test]
    async fn removes_demos_past_retention() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let ward = community("ward", false);
        let record = fixture.open_match("ward").await?;
        fixture
            .pipeline
            .upload(&ward, &record.match_id, 8, body(8))
            .await?;

        let now = jiff::Timestamp::now();
        let report = fixture
            .pipeline
            .expire_demos(now, DEFAULT_DEMO_EXPIRY)
            .await?;
        assert!(report.expired.is_empty());
        assert_eq!(fixture.backend.deletes.load(Ordering::SeqCst), 0);

        let later = now + DEFAULT_DEMO_EXPIRY + SignedDuration::from_secs(1);
        let report = fixture
            .pipeline
            .expire_demos(later, DEFAULT_DEMO_EXPIRY)
            .await?;
        assert_eq!(report.expired, vec![record.match_id.clone()]);
        assert_eq!(fixture.backend.deletes.load(Ordering::SeqCst), 1);

        let stored = fixture.matches.find_match(&record.match_id).await?;
        let stored = stored.ok_or_else(|| anyhow::anyhow!("missing record"))?;
        assert_eq!(stored.demo_status, DemoStatus::Expired);
        assert!(stored.demo_location.is_none());
        assert_eq!(fixture.pipeline.demo_url(&stored), None);
        Ok(())
    }
}
