#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod repository;
pub mod service;
pub mod worker;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};

/// Tracing target for pending-match queue operations.
pub const TRACING_TARGET_QUEUE: &str = "sqlmatches_server::queue";

/// Tracing target for the demo upload pipeline.
pub const TRACING_TARGET_PIPELINE: &str = "sqlmatches_server::pipeline";

/// Tracing target for credential checks and the auth gate.
pub const TRACING_TARGET_AUTH: &str = "sqlmatches_server::auth";

/// Tracing target for background workers.
pub const TRACING_TARGET_WORKER: &str = "sqlmatches_server::worker";

/// Tracing target for request handlers.
pub const TRACING_TARGET_HANDLER: &str = "sqlmatches_server::handler";
