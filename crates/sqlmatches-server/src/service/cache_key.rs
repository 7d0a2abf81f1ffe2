//! Keys of cached views.

/// Key of a single match view.
pub fn match_view(match_id: &str) -> String {
    format!("match.{match_id}")
}

/// Key of the first page of a community's match listing.
pub fn community_matches(community_id: &str) -> String {
    format!("community.{}.matches", community_id.to_ascii_lowercase())
}
