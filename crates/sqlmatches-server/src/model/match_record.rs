use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sqlmatches_storage::StoredLocation;
use uuid::Uuid;

use super::{DemoStatus, MatchStatus};

/// One side of a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub score: u32,
    pub side: u8,
}

impl Team {
    pub fn new(name: impl Into<String>, side: u8) -> Self {
        Self {
            name: name.into(),
            score: 0,
            side,
        }
    }
}

/// Parameters for registering a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub map: String,
    pub team_1: Team,
    pub team_2: Team,
}

/// A recorded game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub community_id: String,
    pub timestamp: Timestamp,
    pub status: MatchStatus,
    pub demo_status: DemoStatus,
    pub map: String,
    pub team_1: Team,
    pub team_2: Team,
    pub demo_location: Option<StoredLocation>,
    pub demo_uploaded_at: Option<Timestamp>,
}

impl MatchRecord {
    /// Creates an open match with a fresh id and a pending demo.
    pub fn open(community_id: impl Into<String>, new_match: NewMatch, now: Timestamp) -> Self {
        Self {
            match_id: Uuid::new_v4().simple().to_string(),
            community_id: community_id.into(),
            timestamp: now,
            status: MatchStatus::Open,
            demo_status: DemoStatus::Pending,
            map: new_match.map,
            team_1: new_match.team_1,
            team_2: new_match.team_2,
            demo_location: None,
            demo_uploaded_at: None,
        }
    }

    /// Whether the match belongs to `community_id`.
    #[inline]
    pub fn is_owned_by(&self, community_id: &str) -> bool {
        self.community_id == community_id
    }

    /// Whether the match can still take a demo, status-wise.
    #[inline]
    pub fn accepts_demo(&self) -> bool {
        self.status != MatchStatus::ExpiredWithoutDemo && self.demo_status.accepts_upload()
    }

    /// The demo half of the record.
    pub fn demo(&self) -> DemoState {
        DemoState {
            status: self.demo_status,
            location: self.demo_location.clone(),
            uploaded_at: self.demo_uploaded_at,
        }
    }

    /// Replaces the demo half of the record. Match status and scores are
    /// left alone.
    pub fn set_demo(&mut self, demo: DemoState) {
        self.demo_status = demo.status;
        self.demo_location = demo.location;
        self.demo_uploaded_at = demo.uploaded_at;
    }

    /// Marks the match abandoned by the sweep. Finalized matches keep their
    /// status; only the demo is given up on.
    pub fn mark_swept(&mut self) {
        if self.status == MatchStatus::Open {
            self.status = MatchStatus::ExpiredWithoutDemo;
        }
        if self.demo_status == DemoStatus::Pending {
            self.demo_status = DemoStatus::NotApplicable;
        }
    }
}

/// Demo fields of a match, written independently of the match itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoState {
    pub status: DemoStatus,
    pub location: Option<StoredLocation>,
    pub uploaded_at: Option<Timestamp>,
}

impl DemoState {
    /// A state without a stored object.
    pub fn new(status: DemoStatus) -> Self {
        Self {
            status,
            location: None,
            uploaded_at: None,
        }
    }

    /// A demo stored at `location` as of `now`.
    pub fn uploaded(location: StoredLocation, now: Timestamp) -> Self {
        Self {
            status: DemoStatus::Uploaded,
            location: Some(location),
            uploaded_at: Some(now),
        }
    }

    /// The same demo after retention removed its object.
    #[must_use]
    pub fn expired(self) -> Self {
        Self {
            status: DemoStatus::Expired,
            location: None,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_match() -> NewMatch {
        NewMatch {
            map: "de_mirage".to_owned(),
            team_1: Team::new("Blue", 0),
            team_2: Team::new("Red", 1),
        }
    }

    #[test]
    fn open_match_accepts_demo() {
        let record = MatchRecord::open("ward", new_match(), Timestamp::UNIX_EPOCH);

        assert_eq!(record.status, MatchStatus::Open);
        assert_eq!(record.demo_status, DemoStatus::Pending);
        assert_eq!(record.match_id.len(), 32);
        assert!(record.accepts_demo());
        assert!(record.is_owned_by("ward"));
    }

    #[test]
    fn uploaded_demo_leaves_match_status_alone() {
        let mut record = MatchRecord::open("ward", new_match(), Timestamp::UNIX_EPOCH);
        record.team_1.score = 16;
        let location = StoredLocation::new("ward/m.dem.bz2");
        record.set_demo(DemoState::uploaded(location.clone(), Timestamp::UNIX_EPOCH));

        assert_eq!(record.status, MatchStatus::Open);
        assert_eq!(record.team_1.score, 16);
        assert_eq!(record.demo_status, DemoStatus::Uploaded);
        assert_eq!(record.demo_location, Some(location));
        assert!(!record.accepts_demo());

        record.set_demo(record.demo().expired());
        assert_eq!(record.demo_status, DemoStatus::Expired);
        assert!(record.demo_location.is_none());
        assert_eq!(record.demo_uploaded_at, Some(Timestamp::UNIX_EPOCH));
    }

    #[test]
    fn sweep_keeps_finalized_status() {
        let mut open = MatchRecord::open("ward", new_match(), Timestamp::UNIX_EPOCH);
        open.mark_swept();
        assert_eq!(open.status, MatchStatus::ExpiredWithoutDemo);
        assert_eq!(open.demo_status, DemoStatus::NotApplicable);

        let mut finalized = MatchRecord::open("ward", new_match(), Timestamp::UNIX_EPOCH);
        finalized.status = MatchStatus::Finalized;
        finalized.mark_swept();
        assert_eq!(finalized.status, MatchStatus::Finalized);
        assert_eq!(finalized.demo_status, DemoStatus::NotApplicable);
    }
}
