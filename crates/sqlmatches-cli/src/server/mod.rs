//! HTTP server startup, background workers and graceful shutdown.

mod error;
mod http_server;
mod lifecycle;
mod shutdown;

pub use self::error::{Result, ServerError};
pub use self::lifecycle::run;
