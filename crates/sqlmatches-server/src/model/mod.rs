//! Match and community records.

mod community;
mod match_record;
mod status;

pub use community::{Community, CommunityId};
pub use match_record::{DemoState, MatchRecord, NewMatch, Team};
pub use status::{DemoStatus, MatchStatus};
