//! Response types for HTTP handlers.

mod communities;
mod error_response;
mod monitors;

pub use communities::CreatedCommunity;
pub use error_response::ErrorResponse;
pub use monitors::HealthStatus;
pub use crate::pipeline::SweepReport;
pub use crate::service::MatchView;
