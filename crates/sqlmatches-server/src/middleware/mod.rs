//! Middleware for `axum::Router` and HTTP request processing.

mod auth;
mod error_handling;
mod extensions;

pub use auth::{RouterAuthExt, require_community, require_root, require_webhook};
pub use extensions::RouterExt;
