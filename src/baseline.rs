//! Rolling team baselines per role, used as the reference against which player ratings move.

use anyhow::bail;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Corpus, GameKey, Phase, Role, Venue};
use crate::metric::PerMetric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Number of most recent games in the rolling window.
    pub window: usize,
    /// Teams with this many or fewer games in the season fall back to the league average.
    pub min_games: usize,
}
impl BaselineConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.window == 0 {
            bail!("baseline window must be positive");
        }
        Ok(())
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            window: 10,
            min_games: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TeamRole {
    team: String,
    role: Role,
}

/// Per-possession averages for each team, role and game; plus per-venue summaries.
#[derive(Debug, Clone, Default)]
pub struct Baselines {
    rolling: FxHashMap<(TeamRole, GameKey), PerMetric>,
    venues: FxHashMap<(TeamRole, Venue), PerMetric>,
    league: FxHashMap<(Role, u16), PerMetric>,
}
impl Baselines {
    pub fn compute(corpus: &Corpus, config: &BaselineConfig) -> Self {
        let games = corpus.game_index();

        // per-game means over distinct regular-season possessions
        let mut sums: FxHashMap<(TeamRole, GameKey), (PerMetric, usize)> = FxHashMap::default();
        for record in corpus.distinct_possessions() {
            if games
                .get(&record.game_key())
                .is_some_and(|info| info.phase != Phase::Regular)
            {
                continue;
            }
            let key = (
                TeamRole {
                    team: record.team.clone(),
                    role: record.role,
                },
                record.game_key(),
            );
            let (sum, count) = sums.entry(key).or_default();
            sum.add_assign(&PerMetric::observe(&record.counts));
            *count += 1;
        }
        let game_means: FxHashMap<(TeamRole, GameKey), PerMetric> = sums
            .into_iter()
            .map(|(key, (mut sum, count))| {
                sum.scale(1.0 / count as f64);
                (key, sum)
            })
            .collect();

        let mut league_sums: FxHashMap<(Role, u16), (PerMetric, usize)> = FxHashMap::default();
        let mut venue_sums: FxHashMap<(TeamRole, Venue), (PerMetric, usize)> = FxHashMap::default();
        let mut schedules: FxHashMap<(TeamRole, u16), Vec<GameKey>> = FxHashMap::default();
        for ((team_role, game), mean) in &game_means {
            let (sum, count) = league_sums.entry((team_role.role, game.season)).or_default();
            sum.add_assign(mean);
            *count += 1;

            if let Some(info) = games.get(game) {
                let venue = info.venue_of(&team_role.team);
                let (sum, count) = venue_sums.entry((team_role.clone(), venue)).or_default();
                sum.add_assign(mean);
                *count += 1;
            }

            schedules
                .entry((team_role.clone(), game.season))
                .or_default()
                .push(*game);
        }
        let league: FxHashMap<(Role, u16), PerMetric> = league_sums
            .into_iter()
            .map(|(key, (sum, count))| (key, mean_of(sum, count)))
            .collect();
        let venues = venue_sums
            .into_iter()
            .map(|(key, (sum, count))| (key, mean_of(sum, count)))
            .collect();

        let mut rolling = FxHashMap::default();
        for ((team_role, season), mut schedule) in schedules {
            schedule.sort();
            let league_average = league[&(team_role.role, season)];
            for (index, game) in schedule.iter().enumerate() {
                let played = index + 1;
                let baseline = if played <= config.min_games {
                    league_average
                } else {
                    let from = played.saturating_sub(config.window);
                    let mut sum = PerMetric::default();
                    for windowed in &schedule[from..played] {
                        sum.add_assign(&game_means[&(team_role.clone(), *windowed)]);
                    }
                    mean_of(sum, played - from)
                };
                rolling.insert((team_role.clone(), *game), baseline);
            }
        }
        debug!("computed {} rolling baselines", rolling.len());

        Self {
            rolling,
            venues,
            league,
        }
    }

    /// The rolling baseline of `team` in `role` as of `game`, inclusive.
    pub fn rolling(&self, team: &str, role: Role, game: GameKey) -> Option<&PerMetric> {
        self.rolling.get(&(
            TeamRole {
                team: team.into(),
                role,
            },
            game,
        ))
    }

    pub fn venue(&self, team: &str, role: Role, venue: Venue) -> Option<&PerMetric> {
        self.venues.get(&(
            TeamRole {
                team: team.into(),
                role,
            },
            venue,
        ))
    }

    pub fn league(&self, role: Role, season: u16) -> Option<&PerMetric> {
        self.league.get(&(role, season))
    }

    /// The baseline a player's record is measured against: the opponent's rolling baseline in the
    /// opposing role. Falls back to the league average when the opponent has no baseline for the game,
    /// as is always the case for playoff games.
    pub fn opposing(&self, opponent: &str, role: Role, game: GameKey) -> Option<&PerMetric> {
        let opposing_role = match role {
            Role::For => Role::Against,
            Role::Against => Role::For,
        };
        self.rolling(opponent, opposing_role, game)
            .or_else(|| self.league(opposing_role, game.season))
    }
}

fn mean_of(mut sum: PerMetric, count: usize) -> PerMetric {
    if count > 0 {
        sum.scale(1.0 / count as f64);
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Counts;
    use crate::metric::Metric;
    use crate::testing::{game, record};
    use assert_float_eq::*;

    fn corpus_with_two_made(values: &[f64]) -> Corpus {
        let mut corpus = Corpus::default();
        for (index, &two_made) in values.iter().enumerate() {
            let game_code = index as u32 + 1;
            corpus.games.push(game(game_code, "AAA", "BBB"));
            let mut aaa = record("a1", "AAA", "BBB", game_code, 1, Role::For);
            aaa.counts = Counts {
                two_attempts: 1.0,
                two_made,
                ..Counts::default()
            };
            corpus.records.push(aaa);
            let mut bbb = record("b1", "BBB", "AAA", game_code, 1, Role::For);
            bbb.counts = Counts {
                two_attempts: 1.0,
                two_made: 0.0,
                ..Counts::default()
            };
            corpus.records.push(bbb);
        }
        corpus
    }

    #[test]
    fn league_fallback_then_window() {
        let values = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let corpus = corpus_with_two_made(&values);
        let config = BaselineConfig {
            window: 2,
            min_games: 7,
        };
        let baselines = Baselines::compute(&corpus, &config);

        // league average over both teams' games: 7 makes from 20 team-games
        let league = baselines.league(Role::For, 1).unwrap()[Metric::TwoMade];
        assert_float_absolute_eq!(0.35, league);

        let early = baselines.rolling("AAA", Role::For, GameKey { season: 1, game: 7 }).unwrap();
        assert_float_absolute_eq!(league, early[Metric::TwoMade]);

        let eighth = baselines.rolling("AAA", Role::For, GameKey { season: 1, game: 8 }).unwrap();
        assert_float_absolute_eq!(1.0, eighth[Metric::TwoMade]);
        assert_float_absolute_eq!(1.0, eighth[Metric::TwoAttempts]);
    }

    #[test]
    fn opposing_uses_other_role() {
        let corpus = corpus_with_two_made(&[1.0]);
        let baselines = Baselines::compute(&corpus, &BaselineConfig::default());
        let game_key = GameKey { season: 1, game: 1 };
        // no Against records exist, so the league average of the Against role is absent too
        assert!(baselines.opposing("BBB", Role::For, game_key).is_none());
        assert!(baselines.opposing("BBB", Role::Against, game_key).is_some());
    }

    #[test]
    fn venue_summary() {
        let corpus = corpus_with_two_made(&[1.0, 0.0]);
        let baselines = Baselines::compute(&corpus, &BaselineConfig::default());
        let home = baselines.venue("AAA", Role::For, Venue::Home).unwrap();
        assert_float_absolute_eq!(0.5, home[Metric::TwoMade]);
        assert!(baselines.venue("AAA", Role::For, Venue::Away).is_none());
    }

    #[test]
    fn playoff_games_are_excluded() {
        let mut corpus = corpus_with_two_made(&[0.0, 1.0]);
        corpus.games[1].phase = Phase::Playoffs;
        for record in &mut corpus.records {
            record.counts.three_attempts = 1.0;
            if record.game == 2 {
                record.counts.three_made = 1.0;
            }
        }
        let baselines = Baselines::compute(&corpus, &BaselineConfig::default());
        let league = baselines.league(Role::For, 1).unwrap();
        assert_float_absolute_eq!(0.0, league[Metric::ThreeMade]);
        assert_float_absolute_eq!(0.0, league[Metric::TwoMade]);

        let playoff = GameKey { season: 1, game: 2 };
        assert!(baselines.rolling("AAA", Role::For, playoff).is_none());
        let opposing = baselines.opposing("AAA", Role::Against, playoff).unwrap();
        assert_float_absolute_eq!(0.0, opposing[Metric::ThreeMade]);
        let home = baselines.venue("AAA", Role::For, Venue::Home).unwrap();
        assert_float_absolute_eq!(0.0, home[Metric::ThreeMade]);
    }
}
