//! Request extractors.
//!
//! The auth gate in [`crate::middleware`] stores an [`AuthScope`] in the
//! request extensions; the extractors here read it back in handlers.

mod auth_scope;

pub use auth_scope::{AuthScope, CommunityAuth, RootAuth, WebhookAuth};
