use serde::Deserialize;

use crate::handler::{ErrorKind, Result};
use crate::model::{NewMatch, Team};
use crate::service::FinalScores;

/// Longest accepted team name or map identifier.
const MAX_NAME_LEN: usize = 64;

/// Body of `POST /api/matches`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMatch {
    pub map: String,
    pub team_1_name: String,
    pub team_2_name: String,
    #[serde(default)]
    pub team_1_side: u8,
    #[serde(default = "default_team_2_side")]
    pub team_2_side: u8,
}

fn default_team_2_side() -> u8 {
    1
}

impl CreateMatch {
    /// Validates the body and converts it into match parameters.
    pub fn into_new_match(self) -> Result<NewMatch> {
        for (field, value) in [
            ("map", &self.map),
            ("team_1_name", &self.team_1_name),
            ("team_2_name", &self.team_2_name),
        ] {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.len() > MAX_NAME_LEN {
                return Err(ErrorKind::BadRequest
                    .with_message(format!("{field} must be 1 to {MAX_NAME_LEN} characters"))
                    .with_resource("match"));
            }
        }

        Ok(NewMatch {
            map: self.map.trim().to_owned(),
            team_1: Team::new(self.team_1_name.trim(), self.team_1_side),
            team_2: Team::new(self.team_2_name.trim(), self.team_2_side),
        })
    }
}

/// Body of `POST /api/matches/{match_id}/end`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EndMatch {
    pub team_1_score: u32,
    pub team_2_score: u32,
}

impl From<EndMatch> for FinalScores {
    fn from(end: EndMatch) -> Self {
        Self {
            team_1_score: end.team_1_score,
            team_2_score: end.team_2_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_validates_names() -> anyhow::Result<()> {
        let body = CreateMatch {
            map: " de_vertigo ".to_owned(),
            team_1_name: "Blue".to_owned(),
            team_2_name: "Red".to_owned(),
            team_1_side: 0,
            team_2_side: 1,
        };
        let new_match = body.into_new_match()?;
        assert_eq!(new_match.map, "de_vertigo");

        let body = CreateMatch {
            map: "de_vertigo".to_owned(),
            team_1_name: "   ".to_owned(),
            team_2_name: "Red".to_owned(),
            team_1_side: 0,
            team_2_side: 1,
        };
        let err = body.into_new_match().err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::BadRequest));
        Ok(())
    }
}
