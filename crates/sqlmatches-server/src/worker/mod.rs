//! Periodic background tasks.

mod retention;
mod sweep;

pub use retention::RetentionWorker;
pub use sweep::SweepWorker;
