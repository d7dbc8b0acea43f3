//! Calibration of team ratings to possession probabilities, and construction of transition matrices.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tinyrand::Rand;

use crate::data::Role;
use crate::linear::matrix::Matrix;
use crate::metric::{Metric, PerMetric};
use crate::probs::SliceExt;
use crate::rating::{PlayerRatingProfile, INITIAL_RATING};
use crate::state::{State, STATES};

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("target probability {target} must lie strictly between 0 and 1")]
    TargetOutOfRange { target: f64 },

    #[error("calibration scale {scale} must be positive")]
    NonPositiveScale { scale: f64 },
}

/// Maps a rating onto a probability such that the reference rating reproduces the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    base_rating: f64,
    scale: f64,
}
impl Calibration {
    pub fn new(target: f64, reference: f64, scale: f64) -> Result<Self, CalibrationError> {
        if !(target > 0.0 && target < 1.0) {
            return Err(CalibrationError::TargetOutOfRange { target });
        }
        if !(scale > 0.0) {
            return Err(CalibrationError::NonPositiveScale { scale });
        }
        let base_rating = reference + scale * f64::log10(1.0 / target - 1.0);
        Ok(Self { base_rating, scale })
    }

    #[inline]
    pub fn probability(&self, rating: f64) -> f64 {
        1.0 / (1.0 + 10f64.powf(-(rating - self.base_rating) / self.scale))
    }
}

/// League-average probabilities reproduced by a neutral rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub turnover: f64,
    pub ft_trip: f64,
    pub two_attempt: f64,
    pub three_attempt: f64,
    pub three_make: f64,
    pub two_make: f64,
    pub ft_make: f64,
    pub ft_oreb: f64,
    pub two_oreb: f64,
    pub three_oreb: f64,
}
impl Targets {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for target in [
            self.turnover,
            self.ft_trip,
            self.two_attempt,
            self.three_attempt,
            self.three_make,
            self.two_make,
            self.ft_make,
            self.ft_oreb,
            self.two_oreb,
            self.three_oreb,
        ] {
            if !(target > 0.0 && target < 1.0) {
                return Err(CalibrationError::TargetOutOfRange { target });
            }
        }
        Ok(())
    }

    pub fn offense() -> Self {
        Self {
            turnover: 0.12,
            ft_trip: 0.11,
            two_attempt: 0.41,
            three_attempt: 0.28,
            three_make: 0.37,
            two_make: 0.55,
            ft_make: 0.78,
            ft_oreb: 0.175,
            two_oreb: 0.345,
            three_oreb: 0.300,
        }
    }

    pub fn defense() -> Self {
        Self {
            ft_trip: 0.09,
            two_oreb: 0.327,
            ..Self::offense()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRates {
    pub offense: Targets,
    pub defense: Targets,
}
impl TargetRates {
    pub fn get(&self, role: Role) -> &Targets {
        match role {
            Role::For => &self.offense,
            Role::Against => &self.defense,
        }
    }
}

impl Default for TargetRates {
    fn default() -> Self {
        Self {
            offense: Targets::offense(),
            defense: Targets::defense(),
        }
    }
}

/// Usage-weighted aggregate of a roster's ratings on one side of the ball.
pub fn team_ratings<'a>(
    players: impl IntoIterator<Item = &'a PlayerRatingProfile>,
    role: Role,
) -> PerMetric {
    let players: Vec<_> = players.into_iter().collect();
    let weights: Vec<f64> = {
        let mut weights: Vec<_> = players
            .iter()
            .map(|profile| f64::max(0.0, profile.ratings(role)[Metric::Usage]))
            .collect();
        if weights.sum() > 0.0 {
            weights.normalise(1.0);
        } else if !weights.is_empty() {
            let equal = 1.0 / weights.len() as f64;
            weights.iter_mut().for_each(|weight| *weight = equal);
        }
        weights
    };
    let mut aggregate = PerMetric::default();
    for (profile, weight) in players.iter().zip(weights) {
        let mut weighted = *profile.ratings(role);
        weighted.scale(weight);
        aggregate.add_assign(&weighted);
    }
    aggregate
}

/// Probabilities driving a single possession walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossessionProbs {
    /// Turnover, FT trip, 3pt attempt, 2pt attempt; sums to 1.
    pub opening: [f64; 4],
    pub three_make: f64,
    pub two_make: f64,
    pub ft_make: f64,
    pub ft_oreb: f64,
    pub two_oreb: f64,
    pub three_oreb: f64,
}

pub const OPENING_STATES: [State; 4] = [
    State::Turnover,
    State::FtTrip,
    State::ThreeAttempt,
    State::TwoAttempt,
];

impl PossessionProbs {
    pub fn calibrate(
        ratings: &PerMetric,
        targets: &Targets,
        scale: f64,
    ) -> Result<Self, CalibrationError> {
        let calibrate = |metric: Metric, target: f64| -> Result<f64, CalibrationError> {
            Ok(Calibration::new(target, INITIAL_RATING, scale)?.probability(ratings[metric]))
        };
        let mut opening = [
            calibrate(Metric::Turnovers, targets.turnover)?,
            calibrate(Metric::FtAttempts, targets.ft_trip)?,
            calibrate(Metric::ThreeAttempts, targets.three_attempt)?,
            calibrate(Metric::TwoAttempts, targets.two_attempt)?,
        ];
        opening.normalise(1.0);
        Ok(Self {
            opening,
            three_make: calibrate(Metric::ThreeMade, targets.three_make)?,
            two_make: calibrate(Metric::TwoMade, targets.two_make)?,
            ft_make: calibrate(Metric::FtMade, targets.ft_make)?,
            ft_oreb: calibrate(Metric::OffRebounds, targets.ft_oreb)?,
            two_oreb: calibrate(Metric::OffRebounds, targets.two_oreb)?,
            three_oreb: calibrate(Metric::OffRebounds, targets.three_oreb)?,
        })
    }
}

#[inline]
fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}

/// Populates an un-normalised transition count matrix by walking `walks` possessions from the
/// calibrated probabilities. Every walk ends with a transition into `End Possession`.
pub fn sample_matrix(probs: &PossessionProbs, walks: usize, rand: &mut impl Rand) -> Matrix<f64> {
    let mut matrix = Matrix::allocate(STATES, STATES);

    for _ in 0..walks {
        let mut state = State::InitialPossession;
        while state != State::EndPossession {
            state = match state {
                State::InitialPossession => {
                    let draw = random_f64(rand);
                    let mut cumulative = 0.0;
                    let mut next = OPENING_STATES[OPENING_STATES.len() - 1];
                    for (index, &prob) in probs.opening.iter().enumerate() {
                        cumulative += prob;
                        if draw < cumulative {
                            next = OPENING_STATES[index];
                            break;
                        }
                    }
                    step(&mut matrix, state, next)
                }
                State::TwoAttempt => {
                    if random_f64(rand) < probs.two_make {
                        let made = step(&mut matrix, state, State::TwoMake);
                        step(&mut matrix, made, State::EndPossession)
                    } else {
                        let missed = step(&mut matrix, state, State::TwoMiss);
                        rebound(&mut matrix, missed, probs.two_oreb, State::TwoOreb, State::TwoNonOreb, rand)
                    }
                }
                State::ThreeAttempt => {
                    if random_f64(rand) < probs.three_make {
                        let made = step(&mut matrix, state, State::ThreeMake);
                        step(&mut matrix, made, State::EndPossession)
                    } else {
                        let missed = step(&mut matrix, state, State::ThreeMiss);
                        rebound(&mut matrix, missed, probs.three_oreb, State::ThreeOreb, State::ThreeNonOreb, rand)
                    }
                }
                State::FtTrip => {
                    let first = step(&mut matrix, state, State::FtAttempt1);
                    let first = if random_f64(rand) < probs.ft_make {
                        step(&mut matrix, first, State::FtMake1)
                    } else {
                        step(&mut matrix, first, State::FtMiss1)
                    };
                    let second = step(&mut matrix, first, State::FtAttempt2);
                    if random_f64(rand) < probs.ft_make {
                        let made = step(&mut matrix, second, State::FtMake2);
                        step(&mut matrix, made, State::EndPossession)
                    } else {
                        let missed = step(&mut matrix, second, State::FtMiss2);
                        rebound(&mut matrix, missed, probs.ft_oreb, State::FtOreb, State::FtNonOreb, rand)
                    }
                }
                State::Turnover => step(&mut matrix, state, State::EndPossession),
                _ => State::EndPossession,
            };
        }
    }
    matrix
}

/// After a miss, either extends the possession via an offensive rebound or ends it.
fn rebound(
    matrix: &mut Matrix<f64>,
    missed: State,
    oreb_prob: f64,
    oreb: State,
    non_oreb: State,
    rand: &mut impl Rand,
) -> State {
    if random_f64(rand) < oreb_prob {
        let rebounded = step(matrix, missed, oreb);
        step(matrix, rebounded, State::InitialPossession)
    } else {
        let lost = step(matrix, missed, non_oreb);
        step(matrix, lost, State::EndPossession)
    }
}

#[inline]
fn step(matrix: &mut Matrix<f64>, from: State, to: State) -> State {
    matrix[(from.index(), to.index())] += 1.0;
    to
}
