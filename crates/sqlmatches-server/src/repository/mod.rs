//! Persistence contracts for matches and communities.
//!
//! The relational store lives outside this crate; handlers and the pipeline
//! only see these traits. [`MemoryMatchRepository`] and
//! [`MemoryCommunityRepository`] back development runs and tests.

mod community;
mod error;
mod matches;
mod memory;
mod pagination;

pub use community::CommunityRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use matches::MatchRepository;
pub use memory::{MemoryCommunityRepository, MemoryMatchRepository};
pub use pagination::{MAX_LIMIT, OffsetPagination};
