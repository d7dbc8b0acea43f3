//! Home-court differentials: relative changes in transition probabilities at home and away.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Corpus, Counts, Phase, Role, Venue};
use crate::linear::matrix::Matrix;
use crate::state::{State, STATES};

const EPSILON: f64 = 1e-9;

/// Differential matrices, indexed by [`State`] ordinal. The `End Possession` row and column are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HcaDifferentials {
    pub home_offense: Matrix<f64>,
    pub home_defense: Matrix<f64>,
    pub away_offense: Matrix<f64>,
    pub away_defense: Matrix<f64>,
}
impl HcaDifferentials {
    /// Differentials that leave every transition unchanged.
    pub fn zero() -> Self {
        Self {
            home_offense: Matrix::allocate(STATES, STATES),
            home_defense: Matrix::allocate(STATES, STATES),
            away_offense: Matrix::allocate(STATES, STATES),
            away_defense: Matrix::allocate(STATES, STATES),
        }
    }

    /// Derives the differentials from regular-season possessions. Each context is compared against
    /// the pool of all venues for the same role.
    pub fn compute(corpus: &Corpus) -> Self {
        let games = corpus.game_index();
        let mut tallies: FxHashMap<(Venue, Role), Matrix<f64>> = FxHashMap::default();
        let mut pooled: FxHashMap<Role, Matrix<f64>> = FxHashMap::default();
        let mut possessions = 0;
        for record in corpus.distinct_possessions() {
            let Some(info) = games.get(&record.game_key()) else {
                continue;
            };
            if info.phase != Phase::Regular {
                continue;
            }
            let venue = info.venue_of(&record.team);
            tally_possession(
                &record.counts,
                tallies
                    .entry((venue, record.role))
                    .or_insert_with(|| Matrix::allocate(STATES, STATES)),
            );
            tally_possession(
                &record.counts,
                pooled
                    .entry(record.role)
                    .or_insert_with(|| Matrix::allocate(STATES, STATES)),
            );
            possessions += 1;
        }
        debug!("tallied {possessions} regular-season possessions");

        let mut differential = |venue: Venue, role: Role| match (tallies.remove(&(venue, role)), pooled.get(&role)) {
            (Some(mut context), Some(reference)) => {
                context.normalise_rows();
                let mut reference = reference.clone();
                reference.normalise_rows();
                relative_difference(&context, &reference)
            }
            _ => Matrix::allocate(STATES, STATES),
        };

        Self {
            home_offense: differential(Venue::Home, Role::For),
            home_defense: differential(Venue::Home, Role::Against),
            away_offense: differential(Venue::Away, Role::For),
            away_defense: differential(Venue::Away, Role::Against),
        }
    }

    /// Scales combined offense and opposing-defense transition counts of the team playing at `venue`
    /// by `1 + coefficient × (differentials)`, then row-normalises. Cells never go negative.
    pub fn adjust(&self, venue: Venue, counts: &Matrix<f64>, coefficient: f64) -> Matrix<f64> {
        let (offense, defense) = match venue {
            Venue::Home => (&self.home_offense, &self.away_defense),
            Venue::Away => (&self.away_offense, &self.home_defense),
            Venue::Neutral => {
                let mut neutral = counts.clone();
                neutral.normalise_rows();
                return neutral;
            }
        };
        let mut adjusted = counts.clone();
        for row in 0..adjusted.rows() {
            for col in 0..adjusted.cols() {
                let factor = 1.0 + coefficient * (offense[(row, col)] + defense[(row, col)]);
                adjusted[(row, col)] = f64::max(0.0, adjusted[(row, col)] * factor);
            }
        }
        adjusted.normalise_rows();
        adjusted
    }
}

/// Adds the implied state transitions of a possession to `matrix`.
pub fn tally_possession(counts: &Counts, matrix: &mut Matrix<f64>) {
    let mut add = |from: State, to: State, amount: f64| {
        if amount > 0.0 {
            matrix[(from.index(), to.index())] += amount;
        }
    };
    add(State::InitialPossession, State::FtTrip, counts.fta);
    add(State::InitialPossession, State::ThreeAttempt, counts.three_attempts);
    add(State::InitialPossession, State::TwoAttempt, counts.two_attempts);
    add(State::InitialPossession, State::Turnover, counts.turnovers);

    add(State::ThreeAttempt, State::ThreeMake, counts.three_made);
    add(State::ThreeAttempt, State::ThreeMiss, counts.three_missed());
    add(State::TwoAttempt, State::TwoMake, counts.two_made);
    add(State::TwoAttempt, State::TwoMiss, counts.two_missed());

    for (misses, miss, oreb, non_oreb) in [
        (counts.two_missed(), State::TwoMiss, State::TwoOreb, State::TwoNonOreb),
        (counts.three_missed(), State::ThreeMiss, State::ThreeOreb, State::ThreeNonOreb),
    ] {
        if counts.off_rebounds > 0.0 {
            let rebounds = f64::min(counts.off_rebounds, misses);
            add(miss, oreb, rebounds);
            add(oreb, State::InitialPossession, rebounds);
        } else {
            add(miss, non_oreb, misses);
        }
    }

    let ft_missed = counts.ft_missed();
    add(State::FtTrip, State::FtAttempt1, counts.fta);
    add(State::FtAttempt1, State::FtMake1, counts.ftm);
    add(State::FtAttempt1, State::FtMiss1, ft_missed);
    add(State::FtMake1, State::FtAttempt2, counts.ftm);
    add(State::FtMiss1, State::FtAttempt2, ft_missed);
    add(State::FtAttempt2, State::FtMake2, counts.ftm);
    add(State::FtAttempt2, State::FtMiss2, ft_missed);
    if ft_missed > 0.0 {
        if counts.off_rebounds > 0.0 {
            add(State::FtMiss2, State::FtOreb, 1.0);
            add(State::FtOreb, State::InitialPossession, 1.0);
        } else {
            add(State::FtMiss2, State::FtNonOreb, 1.0);
        }
    }
}

/// `(context - reference) / reference` cell by cell; undefined cells become 0.
pub fn relative_difference(context: &Matrix<f64>, reference: &Matrix<f64>) -> Matrix<f64> {
    let mut differential = Matrix::allocate(context.rows(), context.cols());
    for row in 0..context.rows() {
        for col in 0..context.cols() {
            let value = (context[(row, col)] - reference[(row, col)]) / (reference[(row, col)] + EPSILON);
            differential[(row, col)] = if value.is_finite() { value } else { 0.0 };
        }
    }
    let end = State::EndPossession.index();
    for index in 0..context.rows() {
        differential[(end, index)] = 0.0;
        differential[(index, end)] = 0.0;
    }
    differential
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_corpus;

    #[test]
    fn tally_made_three() {
        let mut matrix = Matrix::allocate(STATES, STATES);
        let counts = Counts {
            three_attempts: 1.0,
            three_made: 1.0,
            ..Counts::default()
        };
        tally_possession(&counts, &mut matrix);
        assert_eq!(1.0, matrix[(State::InitialPossession.index(), State::ThreeAttempt.index())]);
        assert_eq!(1.0, matrix[(State::ThreeAttempt.index(), State::ThreeMake.index())]);
        assert_eq!(2.0, matrix.flatten().iter().sum::<f64>());
    }

    #[test]
    fn tally_rebounded_miss() {
        let mut matrix = Matrix::allocate(STATES, STATES);
        let counts = Counts {
            two_attempts: 2.0,
            two_made: 1.0,
            off_rebounds: 1.0,
            ..Counts::default()
        };
        tally_possession(&counts, &mut matrix);
        assert_eq!(1.0, matrix[(State::TwoMiss.index(), State::TwoOreb.index())]);
        assert_eq!(1.0, matrix[(State::TwoOreb.index(), State::InitialPossession.index())]);
        assert_eq!(0.0, matrix[(State::TwoMiss.index(), State::TwoNonOreb.index())]);
    }

    #[test]
    fn tally_missed_free_throw() {
        let mut matrix = Matrix::allocate(STATES, STATES);
        let counts = Counts {
            fta: 2.0,
            ftm: 1.0,
            ..Counts::default()
        };
        tally_possession(&counts, &mut matrix);
        assert_eq!(2.0, matrix[(State::FtTrip.index(), State::FtAttempt1.index())]);
        assert_eq!(1.0, matrix[(State::FtAttempt2.index(), State::FtMiss2.index())]);
        assert_eq!(1.0, matrix[(State::FtMiss2.index(), State::FtNonOreb.index())]);
    }

    #[test]
    fn relative_difference_guards_empty_cells() {
        let mut context = Matrix::allocate(STATES, STATES);
        let mut reference = Matrix::allocate(STATES, STATES);
        context[(0, 1)] = 0.6;
        reference[(0, 1)] = 0.5;
        context[(0, STATES - 1)] = 1.0;
        let differential = relative_difference(&context, &reference);
        assert!((differential[(0, 1)] - 0.2).abs() < 1e-6);
        assert_eq!(0.0, differential[(0, STATES - 1)]);
        assert_eq!(0.0, differential[(2, 2)]);
    }

    #[test]
    fn recompute_is_identical() {
        let corpus = synthetic_corpus(&["AAA", "BBB", "CCC"], 2, 20, 7);
        let first = HcaDifferentials::compute(&corpus);
        let second = HcaDifferentials::compute(&corpus);
        assert_eq!(first, second);
        assert!(first.home_offense.flatten().iter().all(|value| value.is_finite()));
    }

    #[test]
    fn adjust_scales_then_normalises() {
        let mut counts = Matrix::allocate(STATES, STATES);
        let (initial, three, two) = (
            State::InitialPossession.index(),
            State::ThreeAttempt.index(),
            State::TwoAttempt.index(),
        );
        counts[(initial, three)] = 50.0;
        counts[(initial, two)] = 50.0;
        let mut differentials = HcaDifferentials::zero();
        differentials.home_offense[(initial, three)] = 0.5;
        differentials.away_defense[(initial, three)] = 0.5;
        differentials.away_offense[(initial, three)] = -2.0;

        let home = differentials.adjust(Venue::Home, &counts, 0.5);
        // 50 × 1.5 against 50
        assert!((home[(initial, three)] - 0.6).abs() < 1e-12);

        let away = differentials.adjust(Venue::Away, &counts, 1.0);
        assert_eq!(0.0, away[(initial, three)]);
        assert_eq!(1.0, away[(initial, two)]);

        let unadjusted = differentials.adjust(Venue::Home, &counts, 0.0);
        assert_eq!(0.5, unadjusted[(initial, three)]);
    }

    #[test]
    fn no_corpus_means_no_effect() {
        let differentials = HcaDifferentials::compute(&Corpus::default());
        assert_eq!(HcaDifferentials::zero(), differentials);
    }
}
