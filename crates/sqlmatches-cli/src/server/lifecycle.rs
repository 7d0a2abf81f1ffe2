//! Server lifecycle management.
//!
//! Brings up the cache and storage collaborators, starts the background
//! workers, serves HTTP until a shutdown signal arrives and then tears
//! everything down in reverse order.

use std::time::{Duration, Instant};

use anyhow::Context;
use axum::Router;
use sqlmatches_cache::{Cache, negotiate};
use sqlmatches_server::handler::{api_routes, upload_routes};
use sqlmatches_server::middleware::RouterExt;
use sqlmatches_server::service::{ServiceConfig, ServiceState};
use sqlmatches_server::worker::{RetentionWorker, SweepWorker};
use sqlmatches_storage::connect;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, ServerConfig, StorageArgs};
use crate::server::http_server::serve_http;
use crate::server::shutdown::wait_for_signal;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Runs the server until it is asked to stop.
///
/// # Errors
///
/// Fails when the storage backend cannot be brought up, the service state
/// cannot be built, or the listener cannot bind.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let Cli {
        server,
        service,
        cache,
        storage,
    } = cli;

    let cache = negotiate(&cache).await;

    let sweep_interval = service.sweep_interval();
    let retention_interval = service.retention_interval();
    let demo_expires = service.demo_expires();

    let state = match build_state(service, storage, &cache).await {
        Ok(state) => state,
        Err(err) => {
            close_cache(&cache).await;
            return Err(err);
        }
    };

    let cancel = CancellationToken::new();
    let workers = [
        {
            let worker = SweepWorker::new(state.pipeline.clone(), sweep_interval);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        },
        {
            let worker =
                RetentionWorker::new(state.pipeline.clone(), demo_expires, retention_interval);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        },
    ];

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        cache = state.cache.backend_name(),
        storage = state.storage.as_ref().map_or("none", |s| s.kind().as_str()),
        "Services initialized"
    );

    let router = create_router(state, &server);
    let result = serve_http(router, &server, async {
        wait_for_signal().await;
    })
    .await;

    cancel.cancel();
    stop_workers(workers, server.shutdown_timeout()).await;
    close_cache(&cache).await;

    let uptime = start_time.elapsed();
    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                code = err.error_code(),
                uptime_secs = uptime.as_secs(),
                "Fatal error"
            );
            if let Some(suggestion) = err.suggestion() {
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    suggestion = suggestion,
                    "Recovery suggestion"
                );
            }
            Err(err.into())
        }
    }
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Observability (outermost): request tracing with credentials redacted
/// 2. Error handling: catches panics and enforces the deadline, which is
///    the upload timeout for demo uploads and the request timeout otherwise
/// 3. Routes (innermost): auth gates and handlers
fn create_router(state: ServiceState, server: &ServerConfig) -> Router {
    let api = api_routes(state.clone()).with_error_handling_layer(server.request_timeout());
    let uploads = upload_routes(state.clone()).with_error_handling_layer(server.upload_timeout());

    api.merge(uploads)
        .with_state(state)
        .with_observability_layer()
}

/// Connects the storage backend and assembles the shared service state.
async fn build_state(
    service: ServiceConfig,
    storage: StorageArgs,
    cache: &Cache,
) -> anyhow::Result<ServiceState> {
    let storage_config = storage.to_config()?;
    let storage = connect(storage_config)
        .await
        .context("failed to initialize demo storage")?;

    ServiceState::new(service, cache.clone(), storage).context("failed to create service state")
}

async fn stop_workers(workers: [JoinHandle<sqlmatches_server::Result<()>>; 2], timeout: Duration) {
    for handle in workers {
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = %err,
                    "Background worker failed"
                );
            }
            Ok(Err(err)) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = %err,
                    "Background worker panicked"
                );
            }
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    timeout_secs = timeout.as_secs(),
                    "Background worker did not stop in time"
                );
            }
        }
    }
}

async fn close_cache(cache: &Cache) {
    if let Err(err) = cache.close().await {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %err,
            "Failed to close cache"
        );
    }
}
