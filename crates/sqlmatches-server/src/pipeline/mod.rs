//! Demo upload pipeline and the lifecycle tasks around it.
//!
//! An upload transfers the body through the active [`StorageBackend`] in a
//! task of its own and records the outcome on the match before releasing the
//! match's pending entry. A failed transfer is never retried here; the game
//! server resubmits from scratch.

mod allowance;
mod error;
mod retention;
mod sweep;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use jiff::Timestamp;
use sqlmatches_cache::Cache;
use sqlmatches_storage::{ByteStream, StorageBackend, UploadDescriptor};
use tracing::Instrument;

pub use self::allowance::{MEGABYTE, UploadAllowance};
pub use self::error::{DemoError, DemoResult};
pub use self::retention::{DEFAULT_DEMO_EXPIRY, RetentionReport};
pub use self::sweep::SweepReport;
use crate::TRACING_TARGET_PIPELINE;
use crate::model::{Community, DemoState, DemoStatus, MatchRecord};
use crate::queue::PendingQueue;
use crate::repository::MatchRepository;
use crate::service::cache_key;

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Moves demos from game servers into storage.
pub struct DemoPipeline {
    matches: Arc<dyn MatchRepository>,
    queue: Arc<PendingQueue>,
    storage: Option<Arc<dyn StorageBackend>>,
    cache: Cache,
    allowance: UploadAllowance,
    in_flight: InFlightSet,
    sweeping: tokio::sync::Mutex<()>,
}

impl DemoPipeline {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        queue: Arc<PendingQueue>,
        storage: Option<Arc<dyn StorageBackend>>,
        cache: Cache,
        allowance: UploadAllowance,
    ) -> Self {
        Self {
            matches,
            queue,
            storage,
            cache,
            allowance,
            in_flight: Arc::default(),
            sweeping: tokio::sync::Mutex::new(()),
        }
    }

    /// The active storage backend, if uploads are enabled.
    pub fn storage(&self) -> Option<&Arc<dyn StorageBackend>> {
        self.storage.as_ref()
    }

    pub fn allowance(&self) -> UploadAllowance {
        self.allowance
    }

    /// Public address of the match's demo, once uploaded.
    pub fn demo_url(&self, record: &MatchRecord) -> Option<String> {
        let storage = self.storage.as_ref()?;
        let location = record.demo_location.as_ref()?;
        (record.demo_status == DemoStatus::Uploaded).then(|| storage.resolve_url(location))
    }

    /// Uploads the demo for `match_id` on behalf of `community`.
    ///
    /// Checks happen in order and stop at the first failure: the match must
    /// belong to the community and still accept a demo, and the declared
    /// size must fit the community's allowance. A rejected size never
    /// reaches the backend.
    ///
    /// Once started, the transfer runs to completion even if the caller
    /// stops waiting, so the match always ends up `uploaded` or `failed`.
    #[tracing::instrument(
        skip(self, community, body),
        target = TRACING_TARGET_PIPELINE,
        fields(community_id = %community.community_id, size = content_length),
    )]
    pub async fn upload(
        &self,
        community: &Community,
        match_id: &str,
        content_length: u64,
        body: ByteStream,
    ) -> DemoResult<MatchRecord> {
        let storage = self.storage.as_ref().ok_or(DemoError::UploadsDisabled)?;

        let record = self.find(community, match_id).await?;
        ensure_accepts_demo(&record)?;

        let limit = self
            .allowance
            .limit(community.premium, storage.max_object_size());
        if content_length > limit {
            tracing::warn!(
                target: TRACING_TARGET_PIPELINE,
                match_id = %match_id,
                limit,
                "Demo rejected for size"
            );
            return Err(DemoError::DemoTooLarge {
                size: content_length,
                limit,
            });
        }

        let guard = InFlight::acquire(&self.in_flight, match_id)
            .ok_or_else(|| DemoError::DemoAlreadyUploaded(match_id.to_owned()))?;

        // The previous transfer may have finished between the lookup and the
        // guard; its entry is gone by now.
        if !self.queue.is_open(match_id) {
            ensure_accepts_demo(&self.find(community, match_id).await?)?;
            return Err(DemoError::UnknownMatch(match_id.to_owned()));
        }

        let descriptor = UploadDescriptor::new(
            &record.community_id,
            &record.match_id,
            content_length,
            storage.extension(),
            body,
        )
        .map_err(DemoError::UploadFailed)?;

        if let Some(cap) = storage.max_object_size() {
            tracing::debug!(
                target: TRACING_TARGET_PIPELINE,
                match_id = %match_id,
                backend = %storage.kind(),
                cap,
                "Buffering demo in memory before upload"
            );
        }

        let transfer = Transfer {
            matches: self.matches.clone(),
            queue: self.queue.clone(),
            storage: storage.clone(),
            cache: self.cache.clone(),
            record,
            _guard: guard,
        };
        tokio::spawn(transfer.run(descriptor).in_current_span())
            .await
            .map_err(DemoError::TransferInterrupted)?
    }

    /// Moves a failed demo back to pending and reopens the match so the
    /// game server can upload again.
    #[tracing::instrument(skip(self, community), target = TRACING_TARGET_PIPELINE)]
    pub async fn resubmit(&self, community: &Community, match_id: &str) -> DemoResult<MatchRecord> {
        let record = self.find(community, match_id).await?;
        if !record.demo_status.can_resubmit() {
            return Err(DemoError::InvalidTransition {
                from: record.demo_status,
            });
        }

        self.queue.open(match_id)?;
        let pending = DemoState::new(DemoStatus::Pending);
        let record = match self.matches.update_demo(match_id, pending).await {
            Ok(record) => record,
            Err(err) => {
                release_entry(&self.queue, match_id);
                return Err(err.into());
            }
        };
        self.invalidate_views(&record).await;

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            match_id = %match_id,
            "Demo reopened for resubmission"
        );
        Ok(record)
    }

    async fn find(&self, community: &Community, match_id: &str) -> DemoResult<MatchRecord> {
        self.matches
            .find_community_match(&community.community_id, match_id)
            .await?
            .ok_or_else(|| DemoError::UnknownMatch(match_id.to_owned()))
    }

    /// Whether a transfer for `match_id` is running.
    fn is_in_flight(&self, match_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(match_id)
    }

    async fn invalidate_views(&self, record: &MatchRecord) {
        invalidate_views(&self.cache, record).await;
    }
}

/// Sorts a record that cannot take a demo into the matching error.
fn ensure_accepts_demo(record: &MatchRecord) -> DemoResult<()> {
    if record.accepts_demo() {
        return Ok(());
    }

    match record.demo_status {
        DemoStatus::Uploaded | DemoStatus::Expired => {
            Err(DemoError::DemoAlreadyUploaded(record.match_id.clone()))
        }
        DemoStatus::Failed => Err(DemoError::InvalidTransition {
            from: DemoStatus::Failed,
        }),
        DemoStatus::Pending | DemoStatus::NotApplicable => {
            Err(DemoError::MatchNotOpen(record.match_id.clone()))
        }
    }
}

/// Drops the cached views of `record`. The cache is advisory: a failure
/// leaves stale views that expire on their own.
async fn invalidate_views(cache: &Cache, record: &MatchRecord) {
    let keys = [
        cache_key::match_view(&record.match_id),
        cache_key::community_matches(&record.community_id),
    ];
    if let Err(err) = cache.invalidate(&keys).await {
        tracing::warn!(
            target: TRACING_TARGET_PIPELINE,
            match_id = %record.match_id,
            error = %err,
            "Failed to invalidate cached match views"
        );
    }
}

fn release_entry(queue: &PendingQueue, match_id: &str) {
    if let Err(err) = queue.finalize(match_id) {
        tracing::warn!(
            target: TRACING_TARGET_PIPELINE,
            match_id = %match_id,
            error = %err,
            "Pending entry already released"
        );
    }
}

/// One demo transfer, owned by its own task.
struct Transfer {
    matches: Arc<dyn MatchRepository>,
    queue: Arc<PendingQueue>,
    storage: Arc<dyn StorageBackend>,
    cache: Cache,
    record: MatchRecord,
    _guard: InFlight,
}

impl Transfer {
    async fn run(self, descriptor: UploadDescriptor) -> DemoResult<MatchRecord> {
        let match_id = self.record.match_id.as_str();
        let backend = self.storage.kind();

        let (demo, outcome) = match self.storage.upload(descriptor).await {
            Ok(location) => (DemoState::uploaded(location, Timestamp::now()), Ok(())),
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_PIPELINE,
                    match_id = %match_id,
                    backend = %backend,
                    error = %err,
                    "Demo upload failed"
                );
                (
                    DemoState::new(DemoStatus::Failed),
                    Err(DemoError::from_storage(err)),
                )
            }
        };

        let record = self.matches.update_demo(match_id, demo).await?;
        release_entry(&self.queue, match_id);
        invalidate_views(&self.cache, &record).await;
        outcome?;

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            match_id = %match_id,
            backend = %backend,
            "Demo uploaded"
        );
        Ok(record)
    }
}

impl fmt::Debug for DemoPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoPipeline")
            .field("storage", &self.storage.as_ref().map(|s| s.kind()))
            .field("cache", &self.cache.backend_name())
            .field("allowance", &self.allowance)
            .finish_non_exhaustive()
    }
}

/// Marks a match as having a transfer in progress until dropped.
struct InFlight {
    set: InFlightSet,
    match_id: String,
}

impl InFlight {
    fn acquire(set: &InFlightSet, match_id: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(match_id.to_owned());

        inserted.then(|| Self {
            set: set.clone(),
            match_id: match_id.to_owned(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.match_id);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::{StreamExt, TryStreamExt, stream};
    use sqlmatches_storage::{BackendKind, StorageError, StorageResult, StoredLocation};
    use tokio::sync::Notify;

    use super::*;
    use crate::model::{MatchStatus, NewMatch, Team};
    use crate::repository::MemoryMatchRepository;

    /// Backend that counts calls and keeps uploads in memory.
    #[derive(Default)]
    pub(crate) struct CountingBackend {
        pub uploads: Arc<AtomicUsize>,
        pub deletes: AtomicUsize,
        pub fail_with: Mutex<Option<fn() -> StorageError>>,
        pub cap: Option<u64>,
        pub gate: Option<Arc<Notify>>,
        pub stored: Mutex<Vec<(String, Bytes)>>,
    }

    impl CountingBackend {
        pub fn failing(make: fn() -> StorageError) -> Self {
            Self {
                fail_with: Mutex::new(Some(make)),
                ..Self::default()
            }
        }

        pub fn uploads(&self) -> usize {
            self.uploads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StorageBackend for CountingBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        fn extension(&self) -> &str {
            ".dem"
        }

        fn max_object_size(&self) -> Option<u64> {
            self.cap
        }

        async fn upload(&self, descriptor: UploadDescriptor) -> StorageResult<StoredLocation> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(make) = *self.fail_with.lock().unwrap() {
                return Err(make());
            }

            let key = descriptor.object_key();
            let chunks: Vec<Bytes> = descriptor.into_body().try_collect().await?;
            self.stored.lock().unwrap().push((key.clone(), chunks.concat().into()));
            Ok(StoredLocation::new(key))
        }

        async fn delete(&self, _location: &StoredLocation) -> StorageResult<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn resolve_url(&self, location: &StoredLocation) -> String {
            format!("http://demos.test/{}", location.key)
        }
    }

    pub(crate) fn community(id: &str, premium: bool) -> Community {
        Community {
            community_id: id.to_owned(),
            api_key_hash: String::new(),
            premium,
            disabled: false,
            timestamp: Timestamp::UNIX_EPOCH,
        }
    }

    pub(crate) fn body(len: usize) -> ByteStream {
        let bytes = Bytes::from(vec![7u8; len]);
        stream::once(async move { Ok::<_, io::Error>(bytes) }).boxed()
    }

    pub(crate) struct Fixture {
        pub matches: Arc<MemoryMatchRepository>,
        pub queue: Arc<PendingQueue>,
        pub backend: Arc<CountingBackend>,
        pub pipeline: DemoPipeline,
    }

    impl Fixture {
        pub fn new(backend: CountingBackend) -> Self {
            let matches = Arc::new(MemoryMatchRepository::new());
            let queue = Arc::new(PendingQueue::default());
            let backend = Arc::new(backend);
            let pipeline = DemoPipeline::new(
                matches.clone(),
                queue.clone(),
                Some(backend.clone()),
                Cache::memory(),
                UploadAllowance::from_megabytes(1, 2),
            );
            Self {
                matches,
                queue,
                backend,
                pipeline,
            }
        }

        pub async fn open_match(&self, community_id: &str) -> anyhow::Result<MatchRecord> {
            let new_match = NewMatch {
                map: "de_inferno".to_owned(),
                team_1: Team::new("A", 0),
                team_2: Team::new("B", 1),
            };
            let record = MatchRecord::open(community_id, new_match, Timestamp::now());
            self.queue.open(&record.match_id)?;
            Ok(self.matches.create_match(record).await?)
        }
    }

    #[tokio::test]
    async fn upload_stores_demo_and_releases_entry() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let ward = community("ward", false);
        let record = fixture.open_match("ward").await?;

        let uploaded = fixture
            .pipeline
            .upload(&ward, &record.match_id, 10, body(10))
            .await?;

        assert_eq!(uploaded.demo_status, DemoStatus::Uploaded);
        assert_eq!(uploaded.status, MatchStatus::Open);
        assert!(!fixture.queue.is_open(&record.match_id));
        assert_eq!(
            fixture.pipeline.demo_url(&uploaded),
            Some(format!("http://demos.test/ward/{}.dem", record.match_id))
        );

        let stored = fixture.backend.stored.lock().unwrap();
        assert_eq!(stored[0].1.len(), 10);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_demo_never_reaches_backend() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let ward = community("ward", true);
        let record = fixture.open_match("ward").await?;
        let size = 2 * MEGABYTE + 1;

        let err = fixture
            .pipeline
            .upload(&ward, &record.match_id, size, body(1))
            .await;

        assert!(matches!(err, Err(DemoError::DemoTooLarge { limit, .. }) if limit == 2 * MEGABYTE));
        assert_eq!(fixture.backend.uploads(), 0);
        assert!(fixture.queue.is_open(&record.match_id));
        Ok(())
    }

    #[tokio::test]
    async fn premium_band_requires_premium() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let size = MEGABYTE + 10;

        let free = fixture.open_match("ward").await?;
        let err = fixture
            .pipeline
            .upload(&community("ward", false), &free.match_id, size, body(size as usize))
            .await;
        assert!(matches!(err, Err(DemoError::DemoTooLarge { .. })));

        let paid = fixture.open_match("ward").await?;
        let uploaded = fixture
            .pipeline
            .upload(&community("ward", true), &paid.match_id, size, body(size as usize))
            .await?;
        assert_eq!(uploaded.demo_status, DemoStatus::Uploaded);
        assert_eq!(fixture.backend.uploads(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn second_upload_is_rejected_and_state_unchanged() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let ward = community("ward", false);
        let record = fixture.open_match("ward").await?;

        let first = fixture
            .pipeline
            .upload(&ward, &record.match_id, 4, body(4))
            .await?;
        let err = fixture
            .pipeline
            .upload(&ward, &record.match_id, 4, body(4))
            .await;

        assert!(matches!(err, Err(DemoError::DemoAlreadyUploaded(_))));
        let stored = fixture.matches.find_match(&record.match_id).await?;
        assert_eq!(stored, Some(first));
        assert_eq!(fixture.backend.uploads(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_upload_is_rejected_while_first_is_in_flight() -> anyhow::Result<()> {
        let gate = Arc::new(Notify::new());
        let fixture = Arc::new(Fixture::new(CountingBackend {
            gate: Some(gate.clone()),
            ..CountingBackend::default()
        }));
        let record = fixture.open_match("ward").await?;

        let first = {
            let fixture = fixture.clone();
            let match_id = record.match_id.clone();
            tokio::spawn(async move {
                fixture
                    .pipeline
                    .upload(&community("ward", false), &match_id, 4, body(4))
                    .await
            })
        };

        while fixture.backend.uploads() == 0 {
            tokio::task::yield_now().await;
        }

        let second = fixture
            .pipeline
            .upload(&community("ward", false), &record.match_id, 4, body(4))
            .await;
        assert!(matches!(second, Err(DemoError::DemoAlreadyUploaded(_))));

        gate.notify_one();
        let first = first.await??;
        assert_eq!(first.demo_status, DemoStatus::Uploaded);
        assert_eq!(fixture.backend.uploads(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn foreign_match_is_unknown() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let record = fixture.open_match("ward").await?;

        let err = fixture
            .pipeline
            .upload(&community("other", true), &record.match_id, 4, body(4))
            .await;
        assert!(matches!(err, Err(DemoError::UnknownMatch(_))));
        assert_eq!(fixture.backend.uploads(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn backend_failure_marks_failed_and_allows_resubmit() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::failing(|| StorageError::Rejected {
            status: 400,
            code: "bad_request".to_owned(),
            message: "nope".to_owned(),
        }));
        let ward = community("ward", false);
        let record = fixture.open_match("ward").await?;

        let err = fixture
            .pipeline
            .upload(&ward, &record.match_id, 4, body(4))
            .await;
        assert!(matches!(err, Err(DemoError::UploadFailed(_))));
        assert_eq!(fixture.backend.uploads(), 1);

        let failed = fixture.matches.find_match(&record.match_id).await?;
        assert_eq!(failed.map(|r| r.demo_status), Some(DemoStatus::Failed));

        // A failed demo is not retried and cannot be uploaded until resubmitted.
        assert!(!fixture.queue.is_open(&record.match_id));
        let err = fixture
            .pipeline
            .upload(&ward, &record.match_id, 4, body(4))
            .await;
        assert!(matches!(
            err,
            Err(DemoError::InvalidTransition {
                from: DemoStatus::Failed
            })
        ));
        assert_eq!(fixture.backend.uploads(), 1);

        *fixture.backend.fail_with.lock().unwrap() = None;
        let pending = fixture.pipeline.resubmit(&ward, &record.match_id).await?;
        assert_eq!(pending.demo_status, DemoStatus::Pending);
        assert!(fixture.queue.is_open(&record.match_id));

        let uploaded = fixture
            .pipeline
            .upload(&ward, &record.match_id, 4, body(4))
            .await?;
        assert_eq!(uploaded.demo_status, DemoStatus::Uploaded);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_backend_is_reported_as_such() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::failing(|| {
            StorageError::unavailable("authorization expired twice")
        }));
        let record = fixture.open_match("ward").await?;

        let err = fixture
            .pipeline
            .upload(&community("ward", false), &record.match_id, 4, body(4))
            .await;
        assert!(matches!(err, Err(DemoError::BackendUnavailable(_))));
        Ok(())
    }

    #[tokio::test]
    async fn resubmit_requires_failed_status() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let record = fixture.open_match("ward").await?;

        let err = fixture
            .pipeline
            .resubmit(&community("ward", false), &record.match_id)
            .await;
        assert!(matches!(
            err,
            Err(DemoError::InvalidTransition {
                from: DemoStatus::Pending
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn uploads_disabled_without_backend() -> anyhow::Result<()> {
        let pipeline = DemoPipeline::new(
            Arc::new(MemoryMatchRepository::new()),
            Arc::new(PendingQueue::default()),
            None,
            Cache::memory(),
            UploadAllowance::default(),
        );

        let err = pipeline
            .upload(&community("ward", false), "m", 4, body(4))
            .await;
        assert!(matches!(err, Err(DemoError::UploadsDisabled)));
        Ok(())
    }

    #[tokio::test]
    async fn match_without_pending_entry_is_unknown() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let record = fixture.open_match("ward").await?;
        fixture.queue.finalize(&record.match_id)?;

        let err = fixture
            .pipeline
            .upload(&community("ward", false), &record.match_id, 4, body(4))
            .await;
        assert!(matches!(err, Err(DemoError::UnknownMatch(_))));
        assert_eq!(fixture.backend.uploads(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn swept_match_is_not_open_for_demos() -> anyhow::Result<()> {
        let fixture = Fixture::new(CountingBackend::default());
        let record = fixture.open_match("ward").await?;

        let later = Timestamp::now() + jiff::SignedDuration::from_hours(4);
        let report = fixture.pipeline.sweep(later).await?;
        assert_eq!(report.expired, vec![record.match_id.clone()]);

        let err = fixture
            .pipeline
            .upload(&community("ward", false), &record.match_id, 4, body(4))
            .await;
        assert!(matches!(err, Err(DemoError::MatchNotOpen(_))));
        assert_eq!(fixture.backend.uploads(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn abandoned_caller_does_not_strand_the_match() -> anyhow::Result<()> {
        let gate = Arc::new(Notify::new());
        let fixture = Arc::new(Fixture::new(CountingBackend {
            gate: Some(gate.clone()),
            ..CountingBackend::default()
        }));
        let record = fixture.open_match("ward").await?;

        let caller = {
            let fixture = fixture.clone();
            let match_id = record.match_id.clone();
            tokio::spawn(async move {
                fixture
                    .pipeline
                    .upload(&community("ward", false), &match_id, 4, body(4))
                    .await
            })
        };
        while fixture.backend.uploads() == 0 {
            tokio::task::yield_now().await;
        }

        caller.abort();
        assert!(caller.await.is_err_and(|err| err.is_cancelled()));
        assert!(fixture.queue.is_open(&record.match_id));

        // A sweep during the transfer leaves the match to the transfer.
        let later = Timestamp::now() + jiff::SignedDuration::from_hours(4);
        assert!(fixture.pipeline.sweep(later).await?.expired.is_empty());

        gate.notify_one();
        let settled = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let stored = fixture.matches.find_match(&record.match_id).await?;
                if let Some(stored) = stored
                    && stored.demo_status != DemoStatus::Pending
                    && !fixture.queue.is_open(&record.match_id)
                {
                    return anyhow::Ok(stored);
                }
                tokio::task::yield_now().await;
            }
        })
        .await??;

        assert_eq!(settled.demo_status, DemoStatus::Uploaded);
        assert_eq!(settled.status, MatchStatus::Open);
        assert!(fixture.pipeline.sweep(later).await?.expired.is_empty());

        let again = fixture
            .pipeline
            .upload(&community("ward", false), &record.match_id, 4, body(4))
            .await;
        assert!(matches!(again, Err(DemoError::DemoAlreadyUploaded(_))));
        Ok(())
    }
}
