use serde::Serialize;

/// A newly registered community and its API key.
///
/// This is the only time the key is returned.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedCommunity {
    pub community_id: String,
    pub api_key: String,
    pub premium: bool,
}
