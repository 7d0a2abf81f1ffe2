//! Request bodies and query parameters.

mod communities;
mod matches;
mod pagination;

pub use communities::CreateCommunity;
pub use matches::{CreateMatch, EndMatch};
pub use pagination::Pagination;
