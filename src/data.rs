//! Possession-level input data produced by the upstream segmentation pipeline.

use std::cmp::Ordering;

use anyhow::bail;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Fixed usage credit of an average player: one of five on court.
pub const AVERAGE_USAGE_SHARE: f64 = 0.2;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize,
)]
pub enum Role {
    /// The player's team held the ball.
    For,
    /// The opponent held the ball.
    Against,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Phase {
    Regular,
    Playoffs,
}

/// Team-level counts on a single possession.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counts {
    pub fta: f64,
    pub ftm: f64,
    pub two_attempts: f64,
    pub two_made: f64,
    pub three_attempts: f64,
    pub three_made: f64,
    pub turnovers: f64,
    pub off_rebounds: f64,
    pub def_rebounds: f64,
    pub assists: f64,
    /// Possession length in seconds.
    pub duration: f64,
}
impl Counts {
    pub fn two_missed(&self) -> f64 {
        f64::max(0.0, self.two_attempts - self.two_made)
    }

    pub fn three_missed(&self) -> f64 {
        f64::max(0.0, self.three_attempts - self.three_made)
    }

    pub fn ft_missed(&self) -> f64 {
        f64::max(0.0, self.fta - self.ftm)
    }
}

/// The individual player's own actions on a possession. They drive the usage factor and the
/// player's share of apportioned box-score stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actions {
    pub fta: f64,
    pub ftm: f64,
    pub two_attempts: f64,
    pub two_made: f64,
    pub three_attempts: f64,
    pub three_made: f64,
    pub assists: f64,
    pub turnovers: f64,
    pub off_rebounds: f64,
    pub def_rebounds: f64,
    pub steals: f64,
    pub blocks: f64,
    pub fouls: f64,
}
impl Actions {
    pub fn offensive_usage(&self) -> f64 {
        self.three_attempts
            + self.two_attempts
            + self.fta * 0.44
            + self.assists * 0.7
            + self.turnovers
            + self.off_rebounds * 0.5
            + 0.1
    }

    pub fn defensive_usage(&self) -> f64 {
        self.def_rebounds * 0.5 + self.steals * 2.0 + self.blocks * 1.5 + self.fouls + 0.6
    }
}

/// One row per (player, team, game, possession, role).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossessionRecord {
    pub season: u16,
    pub game: u32,
    pub team: String,
    pub opponent: String,
    pub possession: u32,
    pub player: String,
    pub name: String,
    pub role: Role,
    pub counts: Counts,
    #[serde(default)]
    pub actions: Actions,
    /// Supplied by the pipeline; derived from [`Actions`] when absent.
    #[serde(default)]
    pub usage_factor: Option<f64>,
}
impl PossessionRecord {
    pub fn usage_factor(&self) -> f64 {
        self.usage_factor.unwrap_or_else(|| match self.role {
            Role::For => self.actions.offensive_usage(),
            Role::Against => self.actions.defensive_usage(),
        })
    }

    pub fn game_key(&self) -> GameKey {
        GameKey {
            season: self.season,
            game: self.game,
        }
    }

    pub fn possession_key(&self) -> PossessionKey {
        PossessionKey {
            season: self.season,
            game: self.game,
            team: self.team.clone(),
            role: self.role,
            possession: self.possession,
        }
    }

    /// Chronological ordering: season, then game, then possession.
    pub fn chronological(&self, other: &Self) -> Ordering {
        (self.season, self.game, self.possession).cmp(&(other.season, other.game, other.possession))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameKey {
    pub season: u16,
    pub game: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PossessionKey {
    pub season: u16,
    pub game: u32,
    pub team: String,
    pub role: Role,
    pub possession: u32,
}

/// Game metadata. Game codes increase chronologically within a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub season: u16,
    pub game: u32,
    pub home: String,
    pub away: String,
    pub phase: Phase,
    #[serde(default)]
    pub neutral: bool,
}
impl GameInfo {
    pub fn key(&self) -> GameKey {
        GameKey {
            season: self.season,
            game: self.game,
        }
    }

    pub fn venue_of(&self, team: &str) -> Venue {
        if self.neutral {
            Venue::Neutral
        } else if team == self.home {
            Venue::Home
        } else {
            Venue::Away
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub records: Vec<PossessionRecord>,
    pub games: Vec<GameInfo>,
}
impl Corpus {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.records.is_empty() {
            bail!("the corpus contains no possession records");
        }
        let games = self.game_index();
        for record in &self.records {
            let Some(game) = games.get(&record.game_key()) else {
                bail!(
                    "record for player {} references unknown game {}/{}",
                    record.player,
                    record.season,
                    record.game
                );
            };
            if record.team != game.home && record.team != game.away {
                bail!(
                    "team {} did not play in game {}/{}",
                    record.team,
                    record.season,
                    record.game
                );
            }
            if record.usage_factor.is_some_and(|usage| usage < 0.0 || !usage.is_finite()) {
                bail!("usage factor must be a non-negative number for player {}", record.player);
            }
        }
        Ok(())
    }

    pub fn game_index(&self) -> FxHashMap<GameKey, &GameInfo> {
        self.games.iter().map(|game| (game.key(), game)).collect()
    }

    pub fn latest_season(&self) -> Option<u16> {
        self.records.iter().map(|record| record.season).max()
    }

    /// Each record's usage factor divided by the sum of the usage factors of all teammates sharing that
    /// possession and role. Aligned with `records`.
    pub fn usage_shares(&self) -> Vec<f64> {
        let mut sums: FxHashMap<PossessionKey, f64> = FxHashMap::default();
        for record in &self.records {
            *sums.entry(record.possession_key()).or_default() += record.usage_factor();
        }
        self.records
            .iter()
            .map(|record| {
                let sum = sums[&record.possession_key()];
                crate::probs::ratio(record.usage_factor(), sum)
            })
            .collect()
    }

    /// One representative record per distinct team possession, in corpus order.
    pub fn distinct_possessions(&self) -> impl Iterator<Item = &PossessionRecord> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.records
            .iter()
            .filter(move |record| seen.insert(record.possession_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{game, record};
    use assert_float_eq::*;

    #[test]
    fn usage_formulas() {
        let actions = Actions {
            fta: 2.0,
            ftm: 1.0,
            two_attempts: 1.0,
            two_made: 1.0,
            three_attempts: 1.0,
            three_made: 0.0,
            assists: 1.0,
            turnovers: 0.0,
            off_rebounds: 1.0,
            def_rebounds: 2.0,
            steals: 1.0,
            blocks: 0.0,
            fouls: 1.0,
        };
        assert_float_absolute_eq!(1.0 + 1.0 + 0.88 + 0.7 + 0.5 + 0.1, actions.offensive_usage());
        assert_float_absolute_eq!(1.0 + 2.0 + 1.0 + 0.6, actions.defensive_usage());
    }

    #[test]
    fn usage_shares_split_within_possession() {
        let mut first = record("p1", "AAA", "BBB", 1, 1, Role::For);
        first.usage_factor = Some(3.0);
        let mut second = record("p2", "AAA", "BBB", 1, 1, Role::For);
        second.usage_factor = Some(1.0);
        let mut idle = record("p3", "AAA", "BBB", 1, 2, Role::For);
        idle.usage_factor = Some(0.0);
        let corpus = Corpus {
            records: vec![first, second, idle],
            games: vec![game(1, "AAA", "BBB")],
        };
        assert_eq!(vec![0.75, 0.25, 0.0], corpus.usage_shares());
        assert_eq!(2, corpus.distinct_possessions().count());
    }

    #[test]
    fn validate_rejects_unknown_game() {
        let corpus = Corpus {
            records: vec![record("p1", "AAA", "BBB", 2, 1, Role::For)],
            games: vec![game(1, "AAA", "BBB")],
        };
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn venue() {
        let info = game(1, "AAA", "BBB");
        assert_eq!(Venue::Home, info.venue_of("AAA"));
        assert_eq!(Venue::Away, info.venue_of("BBB"));
        let neutral = GameInfo { neutral: true, ..info };
        assert_eq!(Venue::Neutral, neutral.venue_of("AAA"));
    }
}
