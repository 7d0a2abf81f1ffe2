use async_trait::async_trait;

use super::RepositoryResult;
use crate::model::Community;

/// Repository for community records.
#[async_trait]
pub trait CommunityRepository: Send + Sync + 'static {
    /// Stores a new community. Fails with a conflict if the id is taken.
    async fn create_community(&self, community: Community) -> RepositoryResult<Community>;

    /// Finds a community by id.
    async fn find_community(&self, community_id: &str) -> RepositoryResult<Option<Community>>;
}
