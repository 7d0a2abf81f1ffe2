use async_trait::async_trait;
use jiff::Timestamp;

use super::{OffsetPagination, RepositoryResult};
use crate::model::{DemoState, MatchRecord};

/// Repository for match records.
#[async_trait]
pub trait MatchRepository: Send + Sync + 'static {
    /// Stores a new match. Fails with a conflict if the id is taken.
    async fn create_match(&self, record: MatchRecord) -> RepositoryResult<MatchRecord>;

    /// Finds a match by id regardless of owner.
    async fn find_match(&self, match_id: &str) -> RepositoryResult<Option<MatchRecord>>;

    /// Finds a match by id, only if owned by `community_id`.
    async fn find_community_match(
        &self,
        community_id: &str,
        match_id: &str,
    ) -> RepositoryResult<Option<MatchRecord>> {
        Ok(self
            .find_match(match_id)
            .await?
            .filter(|record| record.is_owned_by(community_id)))
    }

    /// Overwrites the demo fields of a stored match and nothing else.
    async fn update_demo(&self, match_id: &str, demo: DemoState) -> RepositoryResult<MatchRecord>;

    /// Records the final scores and finalizes the match, only if it is still
    /// open. Returns `None` when the match exists but is no longer open.
    async fn end_match(
        &self,
        match_id: &str,
        team_1_score: u32,
        team_2_score: u32,
    ) -> RepositoryResult<Option<MatchRecord>>;

    /// Applies [`MatchRecord::mark_swept`] to the stored match. Returns
    /// `None` when no such match exists.
    async fn expire_match(&self, match_id: &str) -> RepositoryResult<Option<MatchRecord>>;

    /// Lists a community's matches, newest first.
    async fn list_community_matches(
        &self,
        community_id: &str,
        pagination: OffsetPagination,
    ) -> RepositoryResult<Vec<MatchRecord>>;

    /// Lists matches whose demo was uploaded before `cutoff`.
    async fn list_demos_uploaded_before(
        &self,
        cutoff: Timestamp,
    ) -> RepositoryResult<Vec<MatchRecord>>;
}
