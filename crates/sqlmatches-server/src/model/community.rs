use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Community identifiers: 4 to 32 ASCII alphanumeric characters.
pub type CommunityId = String;

/// A tenant that owns matches and authenticates with an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub community_id: CommunityId,
    /// Argon2 PHC string of the API key. The key itself is never stored.
    pub api_key_hash: String,
    /// Premium communities may upload demos up to the maximum size.
    pub premium: bool,
    pub disabled: bool,
    pub timestamp: Timestamp,
}

impl Community {
    /// Shortest accepted community id.
    pub const MIN_ID_LEN: usize = 4;
    /// Longest accepted community id.
    pub const MAX_ID_LEN: usize = 32;

    /// Whether `id` is a well-formed community id.
    pub fn is_valid_id(id: &str) -> bool {
        (Self::MIN_ID_LEN..=Self::MAX_ID_LEN).contains(&id.len())
            && id.chars().all(|c| c.is_ascii_alphanumeric())
    }
}
