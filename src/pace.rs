//! Expected possession counts from duration ratings.

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::probs::SliceExt;
use crate::rating::{PlayerRatingProfile, INITIAL_RATING};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceConfig {
    /// Possessions per segment for a team with neutral duration ratings.
    pub target: f64,
    /// Segments per game.
    pub segments: f64,
}
impl PaceConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.target > 0.0) {
            bail!("pace target must be positive");
        }
        if !(self.segments > 0.0) {
            bail!("segments per game must be positive");
        }
        Ok(())
    }
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            target: 14.02,
            segments: 5.0,
        }
    }
}

/// Per-segment possessions for a team whose mean offensive and defensive duration ratings are given.
/// Longer-than-neutral possessions reduce the count.
pub fn scaled_pace(offense: f64, defense: f64, target: f64) -> f64 {
    let combined = (offense + defense) / 2.0;
    if combined > 0.0 {
        target * (INITIAL_RATING / combined)
    } else {
        target
    }
}

/// Mean offensive and defensive duration ratings over a roster.
pub fn team_durations<'a>(players: impl IntoIterator<Item = &'a PlayerRatingProfile>) -> (f64, f64) {
    let (offense, defense): (Vec<_>, Vec<_>) = players
        .into_iter()
        .map(|profile| (profile.offense[Metric::Duration], profile.defense[Metric::Duration]))
        .unzip();
    if offense.is_empty() {
        (INITIAL_RATING, INITIAL_RATING)
    } else {
        (offense.mean(), defense.mean())
    }
}

/// Possessions per team for a full game between two teams, after the external adjustment.
pub fn matchup_possessions(
    home: (f64, f64),
    away: (f64, f64),
    adjustment: f64,
    config: &PaceConfig,
) -> f64 {
    let home = scaled_pace(home.0, home.1, config.target);
    let away = scaled_pace(away.0, away.1, config.target);
    f64::max(0.0, (home + away) / 2.0 * config.segments + adjustment)
}
