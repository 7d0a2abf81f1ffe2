use serde::Deserialize;

/// Body of `POST /api/communities`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommunity {
    pub community_id: String,
    #[serde(default)]
    pub premium: bool,
}
