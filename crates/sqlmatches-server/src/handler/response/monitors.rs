use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// Active cache backend: `nats` or `memory`.
    pub cache: &'static str,
    /// Active storage backend kind, or `none` when uploads are disabled.
    pub storage: &'static str,
    /// Matches waiting for a demo.
    pub pending_matches: usize,
    pub uptime_secs: i64,
}
