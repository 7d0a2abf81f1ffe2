//! In-process repositories.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;

use super::{
    CommunityRepository, MatchRepository, OffsetPagination, RepositoryError, RepositoryResult,
};
use crate::model::{Community, DemoState, DemoStatus, MatchRecord, MatchStatus};

/// Match repository held in memory.
#[derive(Debug, Default)]
pub struct MemoryMatchRepository {
    records: RwLock<HashMap<String, MatchRecord>>,
}

impl MemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchRepository for MemoryMatchRepository {
    async fn create_match(&self, record: MatchRecord) -> RepositoryResult<MatchRecord> {
        let mut records = self.records.write().await;
        match records.entry(record.match_id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::conflict("match", record.match_id)),
            Entry::Vacant(slot) => Ok(slot.insert(record).clone()),
        }
    }

    async fn find_match(&self, match_id: &str) -> RepositoryResult<Option<MatchRecord>> {
        Ok(self.records.read().await.get(match_id).cloned())
    }

    async fn update_demo(&self, match_id: &str, demo: DemoState) -> RepositoryResult<MatchRecord> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(match_id)
            .ok_or_else(|| RepositoryError::not_found("match", match_id))?;
        stored.set_demo(demo);
        Ok(stored.clone())
    }

    async fn end_match(
        &self,
        match_id: &str,
        team_1_score: u32,
        team_2_score: u32,
    ) -> RepositoryResult<Option<MatchRecord>> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(match_id)
            .ok_or_else(|| RepositoryError::not_found("match", match_id))?;
        if stored.status != MatchStatus::Open {
            return Ok(None);
        }

        stored.team_1.score = team_1_score;
        stored.team_2.score = team_2_score;
        stored.status = MatchStatus::Finalized;
        Ok(Some(stored.clone()))
    }

    async fn expire_match(&self, match_id: &str) -> RepositoryResult<Option<MatchRecord>> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(match_id).map(|stored| {
            stored.mark_swept();
            stored.clone()
        }))
    }

    async fn list_community_matches(
        &self,
        community_id: &str,
        pagination: OffsetPagination,
    ) -> RepositoryResult<Vec<MatchRecord>> {
        let records = self.records.read().await;
        let mut owned: Vec<_> = records
            .values()
            .filter(|record| record.is_owned_by(community_id))
            .cloned()
            .collect();

        owned.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.match_id.cmp(&b.match_id))
        });

        Ok(owned
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit)
            .collect())
    }

    async fn list_demos_uploaded_before(
        &self,
        cutoff: Timestamp,
    ) -> RepositoryResult<Vec<MatchRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| record.demo_status == DemoStatus::Uploaded)
            .filter(|record| record.demo_uploaded_at.is_some_and(|at| at < cutoff))
            .cloned()
            .collect())
    }
}

/// Community repository held in memory.
#[derive(Debug, Default)]
pub struct MemoryCommunityRepository {
    communities: RwLock<HashMap<String, Community>>,
}

impl MemoryCommunityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommunityRepository for MemoryCommunityRepository {
    async fn create_community(&self, community: Community) -> RepositoryResult<Community> {
        let mut communities = self.communities.write().await;
        match communities.entry(community.community_id.to_ascii_lowercase()) {
            Entry::Occupied(_) => Err(RepositoryError::conflict(
                "community",
                community.community_id,
            )),
            Entry::Vacant(slot) => Ok(slot.insert(community).clone()),
        }
    }

    async fn find_community(&self, community_id: &str) -> RepositoryResult<Option<Community>> {
        let communities = self.communities.read().await;
        Ok(communities.get(&community_id.to_ascii_lowercase()).cloned())
    }
}
