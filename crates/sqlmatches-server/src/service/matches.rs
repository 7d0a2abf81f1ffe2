//! Match lifecycle operations and their cached views.

use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sqlmatches_cache::Cache;

use super::cache_key;
use crate::TRACING_TARGET_HANDLER;
use crate::model::{Community, DemoStatus, MatchRecord, MatchStatus, NewMatch};
use crate::pipeline::{DemoError, DemoPipeline, DemoResult};
use crate::queue::PendingQueue;
use crate::repository::{MatchRepository, OffsetPagination};

/// Public representation of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub match_id: String,
    pub community_id: String,
    /// Creation time rendered with the configured format.
    pub timestamp: String,
    pub status: MatchStatus,
    pub demo_status: DemoStatus,
    pub map: String,
    pub team_1_name: String,
    pub team_2_name: String,
    pub team_1_score: u32,
    pub team_2_score: u32,
    pub team_1_side: u8,
    pub team_2_side: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
}

/// Final scores reported when a match ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct FinalScores {
    pub team_1_score: u32,
    pub team_2_score: u32,
}

/// Creates, ends and reads matches, keeping cached views fresh.
#[derive(Clone)]
pub struct MatchService {
    matches: Arc<dyn MatchRepository>,
    queue: Arc<PendingQueue>,
    pipeline: Arc<DemoPipeline>,
    cache: Cache,
    timestamp_format: Arc<str>,
}

impl MatchService {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        queue: Arc<PendingQueue>,
        pipeline: Arc<DemoPipeline>,
        cache: Cache,
        timestamp_format: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            matches,
            queue,
            pipeline,
            cache,
            timestamp_format: timestamp_format.into(),
        }
    }

    /// Registers a match and opens its pending entry.
    pub async fn create(&self, community: &Community, new_match: NewMatch) -> DemoResult<MatchView> {
        let record = MatchRecord::open(&community.community_id, new_match, Timestamp::now());
        let record = self.matches.create_match(record).await?;
        self.queue.open_at(&record.match_id, record.timestamp)?;

        let key = cache_key::community_matches(&community.community_id);
        if let Err(err) = self.cache.delete(&key).await {
            warn_cache_failure(&key, &err);
        }

        tracing::info!(
            target: TRACING_TARGET_HANDLER,
            match_id = %record.match_id,
            community_id = %record.community_id,
            "Match created"
        );
        Ok(self.view(&record))
    }

    /// Records the final score of an open match.
    ///
    /// Only the scores and the match status are written, so a demo upload
    /// finishing at the same time keeps its outcome. The pending entry is
    /// left alone: the demo may arrive before or after the match ends.
    pub async fn end(
        &self,
        community: &Community,
        match_id: &str,
        scores: FinalScores,
    ) -> DemoResult<MatchView> {
        self.find(community, match_id).await?;
        let record = self
            .matches
            .end_match(match_id, scores.team_1_score, scores.team_2_score)
            .await?
            .ok_or_else(|| DemoError::MatchNotOpen(match_id.to_owned()))?;
        self.invalidate(&record).await;

        Ok(self.view(&record))
    }

    /// Returns one match, served from cache when possible.
    pub async fn get(&self, community: &Community, match_id: &str) -> DemoResult<MatchView> {
        let key = cache_key::match_view(match_id);
        if let Ok(Some(view)) = self.cache.get_json::<MatchView>(&key).await
            && view.community_id == community.community_id
        {
            return Ok(view);
        }

        let record = self.find(community, match_id).await?;
        let view = self.view(&record);
        if let Err(err) = self.cache.set_json(&key, &view).await {
            warn_cache_failure(&key, &err);
        }
        Ok(view)
    }

    /// Lists a community's matches, newest first. The first page is cached.
    pub async fn list(
        &self,
        community: &Community,
        pagination: OffsetPagination,
    ) -> DemoResult<Vec<MatchView>> {
        let key = cache_key::community_matches(&community.community_id);
        let cacheable = pagination == OffsetPagination::default();

        if cacheable && let Ok(Some(views)) = self.cache.get_json::<Vec<MatchView>>(&key).await {
            return Ok(views);
        }

        let records = self
            .matches
            .list_community_matches(&community.community_id, pagination)
            .await?;
        let views: Vec<_> = records.iter().map(|record| self.view(record)).collect();

        if cacheable && let Err(err) = self.cache.set_json(&key, &views).await {
            warn_cache_failure(&key, &err);
        }
        Ok(views)
    }

    /// Renders a record for clients.
    pub fn view(&self, record: &MatchRecord) -> MatchView {
        MatchView {
            match_id: record.match_id.clone(),
            community_id: record.community_id.clone(),
            timestamp: format_timestamp(&self.timestamp_format, record.timestamp),
            status: record.status,
            demo_status: record.demo_status,
            map: record.map.clone(),
            team_1_name: record.team_1.name.clone(),
            team_2_name: record.team_2.name.clone(),
            team_1_score: record.team_1.score,
            team_2_score: record.team_2.score,
            team_1_side: record.team_1.side,
            team_2_side: record.team_2.side,
            demo_url: self.pipeline.demo_url(record),
        }
    }

    async fn find(&self, community: &Community, match_id: &str) -> DemoResult<MatchRecord> {
        self.matches
            .find_community_match(&community.community_id, match_id)
            .await?
            .ok_or_else(|| DemoError::UnknownMatch(match_id.to_owned()))
    }

    async fn invalidate(&self, record: &MatchRecord) {
        let keys = [
            cache_key::match_view(&record.match_id),
            cache_key::community_matches(&record.community_id),
        ];
        if let Err(err) = self.cache.invalidate(&keys).await {
            warn_cache_failure(&keys[0], &err);
        }
    }
}

/// Cached views are advisory; a failed cache call only costs freshness.
fn warn_cache_failure(key: &str, err: &sqlmatches_cache::Error) {
    tracing::warn!(
        target: TRACING_TARGET_HANDLER,
        key = %key,
        error = %err,
        "Cache call failed, serving from the repository"
    );
}

fn format_timestamp(format: &str, timestamp: Timestamp) -> String {
    jiff::fmt::strtime::format(format, timestamp).unwrap_or_else(|_| timestamp.to_string())
}
