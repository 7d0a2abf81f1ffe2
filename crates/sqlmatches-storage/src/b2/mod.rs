//! Backblaze B2 backend.
//!
//! Small demos go up in a single `b2_upload_file` call. Anything larger than
//! one part is sent as a large file, one part at a time, so at most one part
//! is held in memory. An expired authorization or a dropped connection is
//! retried exactly once after reauthorizing; a second failure surfaces as
//! [`StorageError::Unavailable`].

mod api;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::sync::RwLock;

use self::api::{ApiError, Authorization, FileInfo};
use crate::TRACING_TARGET;
use crate::backend::{BackendKind, StorageBackend};
use crate::config::B2Config;
use crate::descriptor::{PartReader, StoredLocation, UploadDescriptor};
use crate::error::{StorageError, StorageResult};

/// Timeout applied to every B2 request, including part transfers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const USER_AGENT: &str = concat!("sqlmatches/", env!("CARGO_PKG_VERSION"));

/// One account authorization. The generation identifies it so concurrent
/// callers that hit the same expiry only reauthorize once.
#[derive(Debug)]
struct Session {
    auth: Authorization,
    generation: u64,
}

/// Chunked remote storage on Backblaze B2.
pub struct B2Backend {
    http: Client,
    config: B2Config,
    session: RwLock<Arc<Session>>,
}

impl B2Backend {
    /// Authorizes against B2. Fails if the credentials are rejected or the
    /// service cannot be reached.
    pub async fn connect(config: B2Config) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StorageError::init(format!("failed to build HTTP client: {e}")))?;

        let auth = api::authorize_account(
            &http,
            &config.authorize_url,
            &config.key_id,
            &config.application_key,
        )
        .await
        .map_err(|e| StorageError::init(format!("B2 authorization failed: {e}")))?;

        tracing::info!(
            target: TRACING_TARGET,
            account_id = %auth.account_id,
            bucket_id = %config.bucket_id,
            part_size = config.part_size,
            recommended_part_size = ?auth.recommended_part_size,
            "B2 storage authorized"
        );

        Ok(Self {
            http,
            config,
            session: RwLock::new(Arc::new(Session {
                auth,
                generation: 0,
            })),
        })
    }

    async fn current_session(&self) -> Arc<Session> {
        self.session.read().await.clone()
    }

    async fn reauthorize(&self, stale: &Session) -> StorageResult<Arc<Session>> {
        let mut guard = self.session.write().await;

        if guard.generation != stale.generation {
            return Ok(guard.clone());
        }

        let auth = api::authorize_account(
            &self.http,
            &self.config.authorize_url,
            &self.config.key_id,
            &self.config.application_key,
        )
        .await
        .map_err(|e| StorageError::unavailable(format!("B2 reauthorization failed: {e}")))?;

        let session = Arc::new(Session {
            auth,
            generation: stale.generation + 1,
        });
        *guard = session.clone();

        tracing::info!(
            target: TRACING_TARGET,
            generation = session.generation,
            "B2 session reauthorized"
        );

        Ok(session)
    }

    /// Runs a call with the current session, reauthorizing and retrying once
    /// if it fails for a retryable reason.
    async fn with_session<T, F, Fut>(&self, operation: &'static str, call: F) -> StorageResult<T>
    where
        T: Send,
        F: Fn(Arc<Session>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let session = self.current_session().await;

        match call(session.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    operation,
                    error = %err,
                    "B2 call failed, reauthorizing and retrying once"
                );

                let session = self.reauthorize(&session).await?;
                call(session).await.map_err(StorageError::from)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn upload_small(&self, name: &str, bytes: Bytes) -> StorageResult<FileInfo> {
        let http = &self.http;
        let bucket_id = self.config.bucket_id.as_str();
        let sha1 = api::sha1_hex(&bytes);
        let sha1 = sha1.as_str();
        let bytes = &bytes;

        self.with_session("b2_upload_file", move |session| async move {
            let target = api::get_upload_url(http, &session.auth, bucket_id).await?;
            api::upload_file(http, &target, name, bytes.clone(), sha1).await
        })
        .await
    }

    async fn upload_large(
        &self,
        name: &str,
        reader: PartReader,
        expected: u64,
    ) -> StorageResult<FileInfo> {
        let http = &self.http;
        let bucket_id = self.config.bucket_id.as_str();

        let file_id = self
            .with_session("b2_start_large_file", move |session| async move {
                api::start_large_file(http, &session.auth, bucket_id, name).await
            })
            .await?;

        let result = match self.upload_parts(&file_id, reader, expected).await {
            Ok(part_sha1s) => {
                let file_id = file_id.as_str();
                let part_sha1s = part_sha1s.as_slice();
                self.with_session("b2_finish_large_file", move |session| async move {
                    api::finish_large_file(http, &session.auth, file_id, part_sha1s).await
                })
                .await
            }
            Err(err) => Err(err),
        };

        if result.is_err() {
            self.cancel_large_file(&file_id).await;
        }

        result
    }

    async fn part_target(&self, file_id: &str) -> StorageResult<api::UploadTarget> {
        let http = &self.http;
        self.with_session("b2_get_upload_part_url", move |session| async move {
            api::get_upload_part_url(http, &session.auth, file_id).await
        })
        .await
    }

    async fn upload_parts(
        &self,
        file_id: &str,
        mut reader: PartReader,
        expected: u64,
    ) -> StorageResult<Vec<String>> {
        let mut target = self.part_target(file_id).await?;
        let mut part_sha1s = Vec::new();

        while let Some(part) = reader.next_part().await? {
            if reader.consumed() > expected {
                return Err(StorageError::LengthMismatch {
                    expected,
                    actual: reader.consumed(),
                });
            }

            let part_number = part_sha1s.len() as u32 + 1;
            let sha1 = api::sha1_hex(&part);

            tracing::debug!(
                target: TRACING_TARGET,
                file_id,
                part_number,
                size = part.len(),
                "Uploading part"
            );

            match api::upload_part(&self.http, &target, part_number, part.clone(), &sha1).await {
                Ok(()) => {}
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        file_id,
                        part_number,
                        error = %err,
                        "Part upload failed, retrying with a new upload URL"
                    );

                    target = self.part_target(file_id).await?;
                    api::upload_part(&self.http, &target, part_number, part, &sha1).await?;
                }
                Err(err) => return Err(err.into()),
            }

            part_sha1s.push(sha1);
        }

        if reader.consumed() != expected {
            return Err(StorageError::LengthMismatch {
                expected,
                actual: reader.consumed(),
            });
        }

        Ok(part_sha1s)
    }

    async fn cancel_large_file(&self, file_id: &str) {
        let http = &self.http;
        let result = self
            .with_session("b2_cancel_large_file", move |session| async move {
                api::cancel_large_file(http, &session.auth, file_id).await
            })
            .await;

        if let Err(err) = result {
            tracing::warn!(
                target: TRACING_TARGET,
                file_id,
                error = %err,
                "Failed to cancel unfinished large file"
            );
        }
    }
}

#[async_trait]
impl StorageBackend for B2Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Chunked
    }

    fn extension(&self) -> &str {
        &self.config.extension
    }

    async fn upload(&self, descriptor: UploadDescriptor) -> StorageResult<StoredLocation> {
        let name = self.config.object_name(&descriptor.object_key());
        let expected = descriptor.content_length();
        let part_size = self.config.part_size;
        let mut reader = PartReader::new(descriptor.into_body(), part_size);

        tracing::debug!(
            target: TRACING_TARGET,
            file_name = %name,
            size = expected,
            "Uploading demo to B2"
        );

        let info = if expected <= part_size as u64 {
            let bytes = reader.next_part().await?.unwrap_or_default();
            if reader.next_part().await?.is_some() || bytes.len() as u64 != expected {
                return Err(StorageError::LengthMismatch {
                    expected,
                    actual: reader.consumed(),
                });
            }
            self.upload_small(&name, bytes).await?
        } else {
            self.upload_large(&name, reader, expected).await?
        };

        tracing::debug!(
            target: TRACING_TARGET,
            file_name = %info.file_name,
            file_id = %info.file_id,
            "B2 upload complete"
        );

        Ok(StoredLocation::new(info.file_name).with_file_id(info.file_id))
    }

    async fn delete(&self, location: &StoredLocation) -> StorageResult<()> {
        let http = &self.http;
        let name = location.key.as_str();

        let result = match location.file_id.as_deref() {
            Some(file_id) => {
                self.with_session("b2_delete_file_version", move |session| async move {
                    api::delete_file_version(http, &session.auth, name, file_id).await
                })
                .await
            }
            None => {
                let bucket_id = self.config.bucket_id.as_str();
                self.with_session("b2_hide_file", move |session| async move {
                    api::hide_file(http, &session.auth, bucket_id, name).await
                })
                .await
            }
        };

        match result {
            Err(StorageError::Rejected { ref code, .. }) if api::is_missing_code(code) => {
                tracing::debug!(target: TRACING_TARGET, file_name = name, "Demo already absent");
                Ok(())
            }
            other => other,
        }
    }

    fn resolve_url(&self, location: &StoredLocation) -> String {
        format!("{}{}", self.config.cdn_url, location.key)
    }
}

impl std::fmt::Debug for B2Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2Backend")
            .field("bucket_id", &self.config.bucket_id)
            .field("pathway", &self.config.pathway)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::extract::{DefaultBodyLimit, Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::config::DEFAULT_PART_SIZE;

    #[derive(Default)]
    struct MockState {
        base: String,
        authorizations: u32,
        expire_next: u32,
        always_expired: bool,
        reject_parts: bool,
        uploads: Vec<(String, usize)>,
        parts: Vec<(u32, usize)>,
        finished: Option<Vec<String>>,
        cancelled: u32,
        large_name: String,
        part_bodies: Vec<(u32, Bytes)>,
        objects: HashMap<String, Bytes>,
    }

    #[derive(Clone, Default)]
    struct Mock(Arc<Mutex<MockState>>);

    impl Mock {
        fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.0.lock().expect("mock state poisoned")
        }

        fn token_expired(&self) -> bool {
            let mut state = self.state();
            if state.always_expired {
                return true;
            }
            if state.expire_next > 0 {
                state.expire_next -= 1;
                return true;
            }
            false
        }
    }

    fn error(status: StatusCode, code: &str) -> Response {
        let body = json!({ "status": status.as_u16(), "code": code, "message": code });
        (status, Json(body)).into_response()
    }

    async fn authorize(State(mock): State<Mock>) -> Response {
        let mut state = mock.state();
        state.authorizations += 1;
        Json(json!({
            "accountId": "account",
            "authorizationToken": format!("token-{}", state.authorizations),
            "apiUrl": state.base,
            "downloadUrl": state.base,
        }))
        .into_response()
    }

    async fn get_upload_url(State(mock): State<Mock>) -> Response {
        if mock.token_expired() {
            return error(StatusCode::UNAUTHORIZED, "expired_auth_token");
        }
        let base = mock.state().base.clone();
        Json(json!({ "uploadUrl": format!("{base}/upload"), "authorizationToken": "upload" }))
            .into_response()
    }

    async fn upload(State(mock): State<Mock>, headers: HeaderMap, body: Bytes) -> Response {
        let name = headers
            .get("X-Bz-File-Name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let mut state = mock.state();
        state.uploads.push((name.clone(), body.len()));
        state.objects.insert(name.clone(), body);
        Json(json!({ "fileId": "file-1", "fileName": name })).into_response()
    }

    async fn start_large_file(State(mock): State<Mock>, Json(body): Json<Value>) -> Response {
        if mock.token_expired() {
            return error(StatusCode::UNAUTHORIZED, "expired_auth_token");
        }
        mock.state().large_name = body["fileName"].as_str().unwrap_or_default().to_owned();
        Json(json!({ "fileId": "large-1", "fileName": body["fileName"] })).into_response()
    }

    async fn get_upload_part_url(State(mock): State<Mock>) -> Response {
        let base = mock.state().base.clone();
        Json(json!({ "uploadUrl": format!("{base}/part"), "authorizationToken": "part" }))
            .into_response()
    }

    async fn upload_part(State(mock): State<Mock>, headers: HeaderMap, body: Bytes) -> Response {
        let mut state = mock.state();
        if state.reject_parts {
            return error(StatusCode::BAD_REQUEST, "bad_request");
        }
        let number = headers
            .get("X-Bz-Part-Number")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        state.parts.push((number, body.len()));
        state.part_bodies.push((number, body));
        Json(json!({ "partNumber": number })).into_response()
    }

    async fn finish_large_file(State(mock): State<Mock>, Json(body): Json<Value>) -> Response {
        let sha1s = body["partSha1Array"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default();
        let mut state = mock.state();
        state.finished = Some(sha1s);
        state.part_bodies.sort_by_key(|(number, _)| *number);
        let assembled: Vec<u8> = state
            .part_bodies
            .iter()
            .flat_map(|(_, body)| body.iter().copied())
            .collect();
        let name = state.large_name.clone();
        state.objects.insert(name.clone(), Bytes::from(assembled));
        Json(json!({ "fileId": "large-1", "fileName": name })).into_response()
    }

    async fn download(State(mock): State<Mock>, Path(name): Path<String>) -> Response {
        match mock.state().objects.get(&name) {
            Some(body) => body.clone().into_response(),
            None => error(StatusCode::NOT_FOUND, "not_found"),
        }
    }

    async fn cancel_large_file(State(mock): State<Mock>) -> Response {
        mock.state().cancelled += 1;
        Json(json!({ "fileId": "large-1" })).into_response()
    }

    async fn delete_file_version(Json(body): Json<Value>) -> Response {
        if body["fileId"] == "missing" {
            return error(StatusCode::BAD_REQUEST, "file_not_present");
        }
        Json(json!({ "fileId": body["fileId"], "fileName": body["fileName"] })).into_response()
    }

    async fn spawn(state: MockState) -> anyhow::Result<(Mock, B2Config)> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base = format!("http://{}", listener.local_addr()?);
        let mock = Mock(Arc::new(Mutex::new(MockState {
            base: base.clone(),
            ..state
        })));

        let router = Router::new()
            .route("/b2api/v2/b2_authorize_account", get(authorize))
            .route("/b2api/v2/b2_get_upload_url", post(get_upload_url))
            .route("/b2api/v2/b2_start_large_file", post(start_large_file))
            .route("/b2api/v2/b2_get_upload_part_url", post(get_upload_part_url))
            .route("/b2api/v2/b2_finish_large_file", post(finish_large_file))
            .route("/b2api/v2/b2_cancel_large_file", post(cancel_large_file))
            .route("/b2api/v2/b2_delete_file_version", post(delete_file_version))
            .route("/upload", post(upload))
            .route("/part", post(upload_part))
            .route("/cdn/{*name}", get(download))
            .layer(DefaultBodyLimit::disable())
            .with_state(mock.clone());

        tokio::spawn(async move { axum::serve(listener, router).await });

        let cdn = format!("{base}/cdn");
        let mut config = B2Config::new("key", "secret", "bucket", "/demos/", &cdn);
        config.authorize_url = format!("{base}/b2api/v2/b2_authorize_account");
        Ok((mock, config))
    }

    fn descriptor(size: usize) -> anyhow::Result<UploadDescriptor> {
        Ok(UploadDescriptor::from_bytes(
            "c1",
            "m1",
            ".dem.bz2",
            Bytes::from(vec![7u8; size]),
        )?)
    }

    #[tokio::test]
    async fn small_upload_uses_single_call() -> anyhow::Result<()> {
        let (mock, config) = spawn(MockState::default()).await?;
        let backend = B2Backend::connect(config).await?;

        let location = backend.upload(descriptor(1024)?).await?;

        assert_eq!(location.key, "demos/c1/m1.dem.bz2");
        assert_eq!(location.file_id.as_deref(), Some("file-1"));
        let base = mock.state().base.clone();
        assert_eq!(
            backend.resolve_url(&location),
            format!("{base}/cdn/demos/c1/m1.dem.bz2")
        );
        assert_eq!(mock.state().uploads, vec![("demos/c1/m1.dem.bz2".to_owned(), 1024)]);
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_reauthorizes_once() -> anyhow::Result<()> {
        let (mock, config) = spawn(MockState {
            expire_next: 1,
            ..Default::default()
        })
        .await?;
        let backend = B2Backend::connect(config).await?;

        backend.upload(descriptor(16)?).await?;

        assert_eq!(mock.state().authorizations, 2);
        assert_eq!(mock.state().uploads.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_expiry_is_unavailable() -> anyhow::Result<()> {
        let (mock, config) = spawn(MockState {
            always_expired: true,
            ..Default::default()
        })
        .await?;
        let backend = B2Backend::connect(config).await?;

        let err = backend.upload(descriptor(16)?).await.unwrap_err();

        assert!(err.is_unavailable());
        assert_eq!(mock.state().authorizations, 2);
        assert!(mock.state().uploads.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn large_upload_sends_parts_in_order() -> anyhow::Result<()> {
        let (mock, config) = spawn(MockState::default()).await?;
        let backend = B2Backend::connect(config).await?;
        let size = DEFAULT_PART_SIZE * 2 + 10;

        let location = backend.upload(descriptor(size)?).await?;

        let state = mock.state();
        assert_eq!(
            state.parts,
            vec![(1, DEFAULT_PART_SIZE), (2, DEFAULT_PART_SIZE), (3, 10)]
        );
        assert_eq!(state.finished.as_ref().map(Vec::len), Some(3));
        assert_eq!(state.cancelled, 0);
        assert_eq!(location.file_id.as_deref(), Some("large-1"));
        Ok(())
    }

    #[tokio::test]
    async fn resolved_url_serves_the_uploaded_bytes() -> anyhow::Result<()> {
        let (_mock, config) = spawn(MockState::default()).await?;
        let backend = B2Backend::connect(config).await?;
        let client = reqwest::Client::new();

        for size in [1024, DEFAULT_PART_SIZE + 333] {
            let payload: Vec<u8> = (0..=250u8).cycle().take(size).collect();
            let descriptor =
                UploadDescriptor::from_bytes("c1", "m1", ".dem.bz2", payload.clone())?;
            let location = backend.upload(descriptor).await?;

            let response = client.get(backend.resolve_url(&location)).send().await?;
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            assert_eq!(response.bytes().await?.as_ref(), payload.as_slice());
        }
        Ok(())
    }

    #[tokio::test]
    async fn rejected_part_cancels_large_file() -> anyhow::Result<()> {
        let (mock, config) = spawn(MockState {
            reject_parts: true,
            ..Default::default()
        })
        .await?;
        let backend = B2Backend::connect(config).await?;

        let err = backend
            .upload(descriptor(DEFAULT_PART_SIZE + 1)?)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Rejected { status: 400, .. }));
        assert_eq!(mock.state().cancelled, 1);
        assert!(mock.state().finished.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn deleting_missing_file_succeeds() -> anyhow::Result<()> {
        let (_mock, config) = spawn(MockState::default()).await?;
        let backend = B2Backend::connect(config).await?;

        let missing = StoredLocation::new("demos/c1/gone.dem.bz2").with_file_id("missing");
        backend.delete(&missing).await?;

        let present = StoredLocation::new("demos/c1/m1.dem.bz2").with_file_id("file-1");
        backend.delete(&present).await?;
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_service_fails_to_connect() {
        let mut config = B2Config::new("key", "secret", "bucket", "", "https://cdn.test");
        config.authorize_url = "http://127.0.0.1:1/b2api/v2/b2_authorize_account".to_owned();

        let err = B2Backend::connect(config).await.unwrap_err();
        assert!(matches!(err, StorageError::Init(_)));
    }
}
