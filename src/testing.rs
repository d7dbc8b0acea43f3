//! Testing helpers and synthetic fixtures.

use assert_float_eq::*;
use tinyrand::{Rand, Seeded, StdRand};

use crate::data::{Actions, Corpus, Counts, GameInfo, Phase, PossessionRecord, Role};

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

pub fn record(
    player: &str,
    team: &str,
    opponent: &str,
    game: u32,
    possession: u32,
    role: Role,
) -> PossessionRecord {
    PossessionRecord {
        season: 1,
        game,
        team: team.into(),
        opponent: opponent.into(),
        possession,
        player: player.into(),
        name: player.to_uppercase(),
        role,
        counts: Counts::default(),
        actions: Actions::default(),
        usage_factor: None,
    }
}

pub fn game(game: u32, home: &str, away: &str) -> GameInfo {
    GameInfo {
        season: 1,
        game,
        home: home.into(),
        away: away.into(),
        phase: Phase::Regular,
        neutral: false,
    }
}

#[inline]
fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}

fn random_possession(rand: &mut impl Rand) -> Counts {
    let mut counts = Counts {
        duration: 10.0 + 10.0 * random_f64(rand),
        ..Counts::default()
    };
    let draw = random_f64(rand);
    if draw < 0.12 {
        counts.turnovers = 1.0;
    } else if draw < 0.22 {
        counts.fta = 2.0;
        counts.ftm = if random_f64(rand) < 0.78 { 2.0 } else { 1.0 };
    } else if draw < 0.52 {
        counts.three_attempts = 1.0;
        if random_f64(rand) < 0.36 {
            counts.three_made = 1.0;
        } else if random_f64(rand) < 0.3 {
            counts.off_rebounds = 1.0;
        } else {
            counts.def_rebounds = 1.0;
        }
    } else {
        counts.two_attempts = 1.0;
        if random_f64(rand) < 0.54 {
            counts.two_made = 1.0;
            counts.assists = 1.0;
        } else if random_f64(rand) < 0.3 {
            counts.off_rebounds = 1.0;
        } else {
            counts.def_rebounds = 1.0;
        }
    }
    counts
}

/// The shooter's own actions on a possession whose team counts are `counts`.
fn shooter_actions(counts: &Counts) -> Actions {
    Actions {
        fta: counts.fta,
        ftm: counts.ftm,
        two_attempts: counts.two_attempts,
        two_made: counts.two_made,
        three_attempts: counts.three_attempts,
        three_made: counts.three_made,
        turnovers: counts.turnovers,
        off_rebounds: counts.off_rebounds,
        ..Actions::default()
    }
}

/// A round-robin league where every team fields five players, each on court for every possession.
/// One random player per side finishes each possession: the shooter on offense, the rebounder on
/// defense. Usage factors are derived from those actions.
pub fn synthetic_corpus(teams: &[&str], rounds: u32, possessions: u32, seed: u64) -> Corpus {
    let mut rand = StdRand::seed(seed);
    let mut corpus = Corpus::default();
    let mut game_code = 0;
    for _ in 0..rounds {
        for (home_index, home) in teams.iter().enumerate() {
            for (away_index, away) in teams.iter().enumerate() {
                if home_index == away_index {
                    continue;
                }
                game_code += 1;
                corpus.games.push(game(game_code, home, away));
                for (team, opponent) in [(*home, *away), (*away, *home)] {
                    for possession in 1..=possessions {
                        let counts = random_possession(&mut rand);
                        let shooter = rand.next_lim_usize(5) + 1;
                        let helper = shooter % 5 + 1;
                        let rebounder = rand.next_lim_usize(5) + 1;
                        for slot in 1..=5 {
                            let mut offense = record(
                                &format!("{team}{slot}"),
                                team,
                                opponent,
                                game_code,
                                possession,
                                Role::For,
                            );
                            offense.counts = counts.clone();
                            if slot == shooter {
                                offense.actions = shooter_actions(&counts);
                            } else if slot == helper {
                                offense.actions.assists = counts.assists;
                            }
                            corpus.records.push(offense);

                            let mut defense = record(
                                &format!("{opponent}{slot}"),
                                opponent,
                                team,
                                game_code,
                                possession,
                                Role::Against,
                            );
                            defense.counts = counts.clone();
                            if slot == rebounder {
                                defense.actions.def_rebounds = counts.def_rebounds;
                            }
                            corpus.records.push(defense);
                        }
                    }
                }
            }
        }
    }
    corpus
}
