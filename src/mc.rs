//! Monte Carlo simulation of games by walking possession chains.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, Seeded, StdRand};

use crate::linear::matrix::Matrix;
use crate::probs::SliceExt;
use crate::state::{State, StateTally, STATES};

pub const DEFAULT_MAX_STEPS: usize = 25;

/// A row-stochastic transition matrix with rows precomputed as cumulative distributions.
#[derive(Debug, Clone)]
pub struct Chain {
    cumulative: Matrix<f64>,
}
impl Chain {
    /// Rows that sum to zero are treated as absorbing.
    pub fn new(transitions: &Matrix<f64>) -> Self {
        assert_eq!(
            (STATES, STATES),
            (transitions.rows(), transitions.cols()),
            "a chain requires a {STATES}x{STATES} matrix"
        );
        let mut cumulative = Matrix::allocate(STATES, STATES);
        for row in 0..STATES {
            transitions.row_slice(row).cumulative(cumulative.row_slice_mut(row));
        }
        Self { cumulative }
    }

    /// Walks a single possession from `Initial Possession`, adding every visited state to `tally` and
    /// returning the points scored. Each visit is weighted by `weight`.
    pub fn walk(
        &self,
        tally: &mut StateTally,
        weight: f64,
        max_steps: usize,
        rand: &mut impl Rand,
    ) -> f64 {
        let mut state = State::InitialPossession;
        tally.add(state, weight);
        let mut points = 0.0;
        for _ in 0..max_steps {
            let row = self.cumulative.row_slice(state.index());
            let total = row[STATES - 1];
            if total <= 0.0 {
                break;
            }
            let draw = random_f64(rand) * total;
            let mut next = state;
            for (index, &bound) in row.iter().enumerate() {
                if draw < bound {
                    next = State::from_index(index);
                    break;
                }
            }
            if next == state && draw >= total {
                // rounding at the top of the distribution; take the last reachable state
                next = last_reachable(row);
            }
            state = next;
            tally.add(state, weight);
            points += state.points() as f64 * weight;
            if state.is_terminal() {
                break;
            }
        }
        points
    }
}

fn last_reachable(row: &[f64]) -> State {
    let mut previous = 0.0;
    let mut last = 0;
    for (index, &bound) in row.iter().enumerate() {
        if bound > previous {
            last = index;
        }
        previous = bound;
    }
    State::from_index(last)
}

#[inline]
fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}

/// The tally and score of one team in one simulated game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamGame {
    pub tally: StateTally,
    pub points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub home: TeamGame,
    pub away: TeamGame,
}
impl SimulationResult {
    pub fn is_tie(&self) -> bool {
        self.home.points == self.away.points
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationBatch {
    pub games: Vec<SimulationResult>,
    pub possessions: f64,
}

pub struct MonteCarloEngine {
    games: usize,
    possessions: f64,
    max_steps: usize,
    seed: u64,
}
impl MonteCarloEngine {
    pub fn with_games(mut self, games: usize) -> Self {
        self.games = games;
        self
    }

    /// Negative or NaN counts are floored at zero.
    pub fn with_possessions(mut self, possessions: f64) -> Self {
        self.possessions = possessions.max(0.0);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Simulates one game. Teams alternate possessions; a fractional final possession is played by
    /// both teams and weighted by its fraction.
    pub fn simulate_game(&self, home: &Chain, away: &Chain, rand: &mut impl Rand) -> SimulationResult {
        let mut result = SimulationResult::default();
        let whole = self.possessions.trunc() as usize;
        let fraction = self.possessions.fract();
        for _ in 0..whole {
            result.home.points += home.walk(&mut result.home.tally, 1.0, self.max_steps, rand);
            result.away.points += away.walk(&mut result.away.tally, 1.0, self.max_steps, rand);
        }
        if fraction > 0.0 {
            result.home.points += home.walk(&mut result.home.tally, fraction, self.max_steps, rand);
            result.away.points += away.walk(&mut result.away.tally, fraction, self.max_steps, rand);
        }
        result
    }

    /// Simulates all games in parallel. Game `i` draws from its own generator seeded with `seed + i`,
    /// so the batch does not depend on scheduling.
    pub fn simulate(&self, home: &Chain, away: &Chain) -> SimulationBatch {
        let games = (0..self.games)
            .into_par_iter()
            .map(|game| {
                let mut rand = StdRand::seed(self.seed.wrapping_add(game as u64));
                self.simulate_game(home, away, &mut rand)
            })
            .collect();
        SimulationBatch {
            games,
            possessions: self.possessions,
        }
    }
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self {
            games: 10_000,
            possessions: 70.0,
            max_steps: DEFAULT_MAX_STEPS,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(transitions: &[(State, State, f64)]) -> Chain {
        let mut matrix = Matrix::allocate(STATES, STATES);
        for &(from, to, prob) in transitions {
            matrix[(from.index(), to.index())] = prob;
        }
        Chain::new(&matrix)
    }

    #[test]
    fn walk_to_terminal() {
        let chain = chain_of(&[
            (State::InitialPossession, State::ThreeAttempt, 1.0),
            (State::ThreeAttempt, State::ThreeMake, 1.0),
        ]);
        let mut tally = StateTally::default();
        let points = chain.walk(&mut tally, 1.0, DEFAULT_MAX_STEPS, &mut StdRand::seed(0));
        assert_eq!(3.0, points);
        assert_eq!(1.0, tally.get(State::InitialPossession));
        assert_eq!(1.0, tally.get(State::ThreeAttempt));
        assert_eq!(1.0, tally.get(State::ThreeMake));
        assert_eq!(3.0, tally.total());
    }

    #[test]
    fn empty_row_is_absorbing() {
        let chain = chain_of(&[(State::InitialPossession, State::TwoAttempt, 1.0)]);
        let mut tally = StateTally::default();
        let points = chain.walk(&mut tally, 1.0, DEFAULT_MAX_STEPS, &mut StdRand::seed(0));
        assert_eq!(0.0, points);
        assert_eq!(2.0, tally.total());
    }

    #[test]
    fn step_cap_truncates_rebound_loop() {
        let chain = chain_of(&[
            (State::InitialPossession, State::TwoAttempt, 1.0),
            (State::TwoAttempt, State::TwoMiss, 1.0),
            (State::TwoMiss, State::TwoOreb, 1.0),
            (State::TwoOreb, State::InitialPossession, 1.0),
        ]);
        let mut tally = StateTally::default();
        chain.walk(&mut tally, 1.0, DEFAULT_MAX_STEPS, &mut StdRand::seed(0));
        assert_eq!((DEFAULT_MAX_STEPS + 1) as f64, tally.total());
    }

    #[test]
    fn free_throws_score_per_make() {
        let chain = chain_of(&[
            (State::InitialPossession, State::FtTrip, 1.0),
            (State::FtTrip, State::FtAttempt1, 1.0),
            (State::FtAttempt1, State::FtMake1, 1.0),
            (State::FtMake1, State::FtAttempt2, 1.0),
            (State::FtAttempt2, State::FtMake2, 1.0),
        ]);
        let mut tally = StateTally::default();
        let points = chain.walk(&mut tally, 0.5, DEFAULT_MAX_STEPS, &mut StdRand::seed(0));
        assert_eq!(1.0, points);
        assert_eq!(0.5, tally.get(State::FtMake2));
    }

    #[test]
    fn fractional_possession_is_weighted() {
        let chain = chain_of(&[
            (State::InitialPossession, State::TwoAttempt, 1.0),
            (State::TwoAttempt, State::TwoMake, 1.0),
        ]);
        let engine = MonteCarloEngine::default().with_games(3).with_possessions(2.5);
        let batch = engine.simulate(&chain, &chain);
        assert_eq!(3, batch.games.len());
        for game in &batch.games {
            assert_eq!(5.0, game.home.points);
            assert_eq!(2.5, game.away.tally.get(State::TwoMake));
            assert!(game.is_tie());
        }
    }

    #[test]
    fn seeded_batches_repeat() {
        let chain = chain_of(&[
            (State::InitialPossession, State::TwoAttempt, 0.5),
            (State::InitialPossession, State::Turnover, 0.5),
            (State::TwoAttempt, State::TwoMake, 0.5),
            (State::TwoAttempt, State::TwoMiss, 0.5),
            (State::TwoMiss, State::TwoNonOreb, 1.0),
        ]);
        let engine = MonteCarloEngine::default().with_games(50).with_possessions(30.0).with_seed(9);
        assert_eq!(engine.simulate(&chain, &chain), engine.simulate(&chain, &chain));
    }

    #[test]
    fn negative_possessions_play_nothing() {
        let chain = chain_of(&[
            (State::InitialPossession, State::TwoAttempt, 1.0),
            (State::TwoAttempt, State::TwoMake, 1.0),
        ]);
        for possessions in [-3.0, f64::NAN] {
            let batch = MonteCarloEngine::default()
                .with_games(2)
                .with_possessions(possessions)
                .simulate(&chain, &chain);
            assert_eq!(0.0, batch.possessions);
            assert!(batch.games.iter().all(|game| game.home.points == 0.0 && game.is_tie()));
        }
    }
}
