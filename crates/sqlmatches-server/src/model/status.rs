use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Lifecycle of a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MatchStatus {
    /// The game server is still reporting.
    Open,
    /// The game server reported the final score.
    Finalized,
    /// The match timed out before it was finalized or a demo arrived.
    ExpiredWithoutDemo,
}

/// Lifecycle of a match's demo.
///
/// `Pending` moves to `Uploaded` at most once. A `Failed` upload can be
/// moved back to `Pending` by an explicit resubmission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DemoStatus {
    /// Waiting for the game server to upload.
    Pending,
    /// Stored and addressable.
    Uploaded,
    /// The last transfer failed.
    Failed,
    /// No demo will be accepted.
    NotApplicable,
    /// Removed by the retention policy.
    Expired,
}

impl DemoStatus {
    /// Whether a demo may be uploaded in this state.
    #[inline]
    pub const fn accepts_upload(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the demo can be resubmitted from this state.
    #[inline]
    pub const fn can_resubmit(self) -> bool {
        matches!(self, Self::Failed)
    }
}
