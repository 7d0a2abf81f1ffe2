//! Community registration and API key authentication.

use std::sync::Arc;

use jiff::Timestamp;

use super::security::{CredentialVerifier, generate_api_key};
use crate::model::Community;
use crate::repository::{CommunityRepository, RepositoryError, RepositoryResult};
use crate::{Error, TRACING_TARGET_AUTH};

/// Outcome of registering a community.
#[derive(Debug)]
pub enum Registration {
    /// The community was created; the key is shown once and never stored.
    Created { community: Community, api_key: String },
    /// The id is not 4 to 32 ASCII alphanumeric characters.
    InvalidName,
    /// The id is already registered.
    NameTaken,
}

/// Creates communities and checks their API keys.
#[derive(Clone)]
pub struct CommunityService {
    communities: Arc<dyn CommunityRepository>,
    verifier: CredentialVerifier,
}

impl CommunityService {
    pub fn new(communities: Arc<dyn CommunityRepository>, verifier: CredentialVerifier) -> Self {
        Self {
            communities,
            verifier,
        }
    }

    /// Registers `community_id` and issues its API key.
    pub async fn register(&self, community_id: &str, premium: bool) -> crate::Result<Registration> {
        if !Community::is_valid_id(community_id) {
            return Ok(Registration::InvalidName);
        }

        let api_key = generate_api_key();
        let community = Community {
            community_id: community_id.to_owned(),
            api_key_hash: self.verifier.hash_secret(&api_key)?,
            premium,
            disabled: false,
            timestamp: Timestamp::now(),
        };

        match self.communities.create_community(community).await {
            Ok(community) => {
                tracing::info!(
                    target: TRACING_TARGET_AUTH,
                    community_id = %community.community_id,
                    premium,
                    "Community registered"
                );
                Ok(Registration::Created { community, api_key })
            }
            Err(RepositoryError::Conflict { .. }) => Ok(Registration::NameTaken),
            Err(err) => Err(Error::repository("failed to store community").with_source(err)),
        }
    }

    /// Returns the community if `api_key` belongs to it and it is enabled.
    ///
    /// Unknown communities cost the same as a wrong key.
    pub async fn authenticate(
        &self,
        community_id: &str,
        api_key: &str,
    ) -> RepositoryResult<Option<Community>> {
        let Some(community) = self.communities.find_community(community_id).await? else {
            self.verifier.verify_dummy(api_key);
            return Ok(None);
        };

        let valid = self.verifier.verify(api_key, &community.api_key_hash);
        Ok((valid && !community.disabled).then_some(community))
    }
}
