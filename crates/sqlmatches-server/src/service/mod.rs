//! Application state and dependency injection.

pub mod cache_key;
mod communities;
mod config;
mod matches;
mod security;

use std::sync::Arc;

use jiff::Timestamp;
use sqlmatches_cache::Cache;
use sqlmatches_storage::StorageBackend;

pub use crate::service::communities::{CommunityService, Registration};
pub use crate::service::config::ServiceConfig;
pub use crate::service::matches::{FinalScores, MatchService, MatchView};
pub use crate::service::security::{CredentialVerifier, HashedSecrets, generate_api_key};
use crate::TRACING_TARGET_AUTH;
use crate::pipeline::DemoPipeline;
use crate::queue::PendingQueue;
use crate::repository::{
    CommunityRepository, MatchRepository, MemoryCommunityRepository, MemoryMatchRepository,
};
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    // External services:
    pub cache: Cache,
    pub storage: Option<Arc<dyn StorageBackend>>,
    pub match_repository: Arc<dyn MatchRepository>,
    pub community_repository: Arc<dyn CommunityRepository>,

    // Internal services:
    pub queue: Arc<PendingQueue>,
    pub pipeline: Arc<DemoPipeline>,
    pub match_service: MatchService,
    pub community_service: CommunityService,
    pub credential_verifier: CredentialVerifier,
    pub secrets: HashedSecrets,
    pub started_at: Timestamp,
}

impl ServiceState {
    /// Builds application state around in-process repositories.
    pub fn new(
        service_config: ServiceConfig,
        cache: Cache,
        storage: Option<Arc<dyn StorageBackend>>,
    ) -> Result<Self> {
        Self::with_repositories(
            service_config,
            cache,
            storage,
            Arc::new(MemoryMatchRepository::new()),
            Arc::new(MemoryCommunityRepository::new()),
        )
    }

    /// Builds application state around the given repositories.
    ///
    /// The configured secrets are hashed here and the plaintext is dropped.
    pub fn with_repositories(
        mut service_config: ServiceConfig,
        cache: Cache,
        storage: Option<Arc<dyn StorageBackend>>,
        match_repository: Arc<dyn MatchRepository>,
        community_repository: Arc<dyn CommunityRepository>,
    ) -> Result<Self> {
        service_config.validate()?;

        let credential_verifier = CredentialVerifier::new()?;
        let secrets = HashedSecrets::hash(
            &credential_verifier,
            &mut service_config.root_secret,
            &mut service_config.webhook_key,
        )?;
        tracing::debug!(target: TRACING_TARGET_AUTH, "Root and webhook secrets hashed");

        let queue = Arc::new(PendingQueue::new(service_config.match_timeout()));
        let pipeline = Arc::new(DemoPipeline::new(
            match_repository.clone(),
            queue.clone(),
            storage.clone(),
            cache.clone(),
            service_config.upload_allowance(),
        ));
        let match_service = MatchService::new(
            match_repository.clone(),
            queue.clone(),
            pipeline.clone(),
            cache.clone(),
            service_config.timestamp_format.as_str(),
        );
        let community_service =
            CommunityService::new(community_repository.clone(), credential_verifier.clone());

        Ok(Self {
            cache,
            storage,
            match_repository,
            community_repository,

            queue,
            pipeline,
            match_service,
            community_service,
            credential_verifier,
            secrets,
            started_at: Timestamp::now(),
        })
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(cache: Cache);
impl_di!(storage: Option<Arc<dyn StorageBackend>>);
impl_di!(match_repository: Arc<dyn MatchRepository>);
impl_di!(community_repository: Arc<dyn CommunityRepository>);

// Internal services:
impl_di!(queue: Arc<PendingQueue>);
impl_di!(pipeline: Arc<DemoPipeline>);
impl_di!(match_service: MatchService);
impl_di!(community_service: CommunityService);
impl_di!(credential_verifier: CredentialVerifier);
impl_di!(secrets: HashedSecrets);
