//! Assessment of who is on each team's active roster, and how much they play.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::{Corpus, Role};
use crate::probs::SliceExt;

#[derive(Debug, Error, PartialEq)]
pub enum RosterError {
    #[error("team {0} has no active players")]
    NoActivePlayers(String),

    #[error("team {0} does not appear in the latest season")]
    UnknownTeam(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: String,
    pub name: String,
    pub team: String,
    /// Projected offensive possessions per game.
    pub possessions: f64,
    /// Appeared in the team's most recent game.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerOverride {
    Remove {
        player: String,
    },
    Update {
        player: String,
        #[serde(default)]
        possessions: Option<f64>,
        #[serde(default)]
        team: Option<String>,
    },
}
impl PlayerOverride {
    pub fn player(&self) -> &str {
        match self {
            PlayerOverride::Remove { player } => player,
            PlayerOverride::Update { player, .. } => player,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub entries: Vec<RosterEntry>,
}
impl Roster {
    /// Assesses every (player, team) pairing in the latest season. `recent_games` bounds the games
    /// averaged for the possession projection.
    pub fn assess(corpus: &Corpus, recent_games: usize) -> Self {
        let Some(season) = corpus.latest_season() else {
            return Self::default();
        };

        // distinct offensive possessions per (player, team, game)
        let mut per_game: FxHashMap<(&str, &str), FxHashMap<u32, FxHashSet<u32>>> = FxHashMap::default();
        let mut names: FxHashMap<&str, &str> = FxHashMap::default();
        let mut latest_game: FxHashMap<&str, u32> = FxHashMap::default();
        for record in corpus.records.iter().filter(|record| record.season == season) {
            let latest = latest_game.entry(record.team.as_str()).or_insert(record.game);
            *latest = (*latest).max(record.game);
            names.insert(record.player.as_str(), record.name.as_str());
            let games = per_game.entry((record.player.as_str(), record.team.as_str())).or_default();
            let possessions = games.entry(record.game).or_default();
            if record.role == Role::For {
                possessions.insert(record.possession);
            }
        }

        let mut entries: Vec<_> = per_game
            .into_iter()
            .map(|((player, team), games)| {
                let mut games: Vec<_> = games.into_iter().collect();
                games.sort_by(|(a, _), (b, _)| b.cmp(a));
                let active = games.first().map(|&(game, _)| game) == latest_game.get(team).copied();
                let counts: Vec<f64> = games
                    .iter()
                    .take(recent_games)
                    .map(|(_, possessions)| possessions.len() as f64)
                    .collect();
                RosterEntry {
                    player: player.into(),
                    name: names.get(player).copied().unwrap_or(player).into(),
                    team: team.into(),
                    possessions: counts.mean(),
                    active,
                }
            })
            .collect();
        entries.sort_by(|a, b| (&a.team, &a.player).cmp(&(&b.team, &b.player)));
        debug!("assessed {} roster entries for season {season}", entries.len());
        Self { entries }
    }

    /// Applies overrides in order, matching by player ID and then by name. An unmatched `Update`
    /// that names a team adds the player; other unmatched overrides are skipped.
    pub fn apply(&mut self, overrides: &[PlayerOverride], known: impl Fn(&str) -> Option<(String, String)>) {
        for entry in overrides {
            let target = entry.player();
            let matching: Vec<usize> = {
                let by_id: Vec<_> = (0..self.entries.len())
                    .filter(|&index| self.entries[index].player == target)
                    .collect();
                if by_id.is_empty() {
                    (0..self.entries.len())
                        .filter(|&index| self.entries[index].name == target)
                        .collect()
                } else {
                    by_id
                }
            };

            match entry {
                PlayerOverride::Remove { .. } => {
                    if matching.is_empty() {
                        warn!("cannot remove unknown player {target}");
                    }
                    let mut index = 0;
                    self.entries.retain(|_| {
                        let keep = !matching.contains(&index);
                        index += 1;
                        keep
                    });
                }
                PlayerOverride::Update {
                    possessions, team, ..
                } => {
                    if matching.is_empty() {
                        match (team, known(target)) {
                            (Some(team), Some((player, name))) => self.entries.push(RosterEntry {
                                player,
                                name,
                                team: team.clone(),
                                possessions: possessions.unwrap_or(0.0),
                                active: true,
                            }),
                            _ => warn!("cannot update unknown player {target}"),
                        }
                        continue;
                    }
                    // a player on several teams in the season collapses to the first entry
                    let keep = matching[0];
                    let mut index = 0;
                    self.entries.retain(|_| {
                        let retained = index == keep || !matching.contains(&index);
                        index += 1;
                        retained
                    });
                    let updated = &mut self.entries[keep];
                    if let Some(possessions) = possessions {
                        updated.possessions = *possessions;
                    }
                    if let Some(team) = team {
                        updated.team.clone_from(team);
                    }
                    updated.active = true;
                }
            }
        }
    }

    /// Active entries of `team`.
    pub fn active(&self, team: &str) -> Result<Vec<&RosterEntry>, RosterError> {
        if !self.entries.iter().any(|entry| entry.team == team) {
            return Err(RosterError::UnknownTeam(team.into()));
        }
        let active: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.team == team && entry.active)
            .collect();
        if active.is_empty() {
            Err(RosterError::NoActivePlayers(team.into()))
        } else {
            Ok(active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{game, record};

    fn corpus() -> Corpus {
        let mut corpus = Corpus::default();
        for game_code in 1..=4 {
            corpus.games.push(game(game_code, "AAA", "BBB"));
            let possessions = if game_code == 4 { 2 } else { 4 };
            for possession in 1..=possessions {
                corpus.records.push(record("starter", "AAA", "BBB", game_code, possession, Role::For));
                if game_code < 3 {
                    corpus.records.push(record("benched", "AAA", "BBB", game_code, possession, Role::For));
                }
                corpus.records.push(record("rival", "BBB", "AAA", game_code, possession, Role::For));
            }
        }
        corpus
    }

    fn find<'a>(roster: &'a Roster, player: &str) -> &'a RosterEntry {
        roster.entries.iter().find(|entry| entry.player == player).unwrap()
    }

    #[test]
    fn assess_recent_possessions() {
        let roster = Roster::assess(&corpus(), 3);
        let starter = find(&roster, "starter");
        assert!(starter.active);
        // games 4, 3, 2 with 2, 4, 4 possessions
        assert!((starter.possessions - 10.0 / 3.0).abs() < 1e-9);
        let benched = find(&roster, "benched");
        assert!(!benched.active);
        assert_eq!(4.0, benched.possessions);
        assert_eq!("STARTER", starter.name);
    }

    #[test]
    fn active_filters_and_errors() {
        let roster = Roster::assess(&corpus(), 3);
        assert_eq!(1, roster.active("AAA").unwrap().len());
        assert_eq!(Err(RosterError::UnknownTeam("CCC".into())), roster.active("CCC").map(|_| ()));

        let mut emptied = roster.clone();
        emptied.apply(
            &[PlayerOverride::Remove {
                player: "starter".into(),
            }],
            |_| None,
        );
        assert_eq!(
            Err(RosterError::NoActivePlayers("AAA".into())),
            emptied.active("AAA").map(|_| ())
        );
    }

    #[test]
    fn overrides() {
        let mut roster = Roster::assess(&corpus(), 3);
        roster.apply(
            &[
                PlayerOverride::Update {
                    player: "BENCHED".into(),
                    possessions: Some(12.0),
                    team: None,
                },
                PlayerOverride::Update {
                    player: "rival".into(),
                    possessions: None,
                    team: Some("AAA".into()),
                },
                PlayerOverride::Update {
                    player: "free_agent".into(),
                    possessions: Some(5.0),
                    team: Some("BBB".into()),
                },
                PlayerOverride::Update {
                    player: "nobody".into(),
                    possessions: Some(5.0),
                    team: Some("BBB".into()),
                },
            ],
            |player| (player == "free_agent").then(|| ("free_agent".into(), "Free Agent".into())),
        );
        let benched = find(&roster, "benched");
        assert!(benched.active);
        assert_eq!(12.0, benched.possessions);
        assert_eq!("AAA", find(&roster, "rival").team);
        assert_eq!(3, roster.active("AAA").unwrap().len());
        let added = roster.active("BBB").unwrap();
        assert_eq!(1, added.len());
        assert_eq!("Free Agent", added[0].name);
        assert!(roster.entries.iter().all(|entry| entry.player != "nobody"));
    }
}
