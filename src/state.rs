//! The possession state space.

use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use strum_macros::{Display, EnumCount, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Ordinal,
    EnumCount,
    EnumIter,
    Display,
    Serialize,
    Deserialize,
)]
pub enum State {
    #[strum(serialize = "Initial Possession")]
    InitialPossession,
    #[strum(serialize = "3pt Attempt")]
    ThreeAttempt,
    #[strum(serialize = "3pt Make")]
    ThreeMake,
    #[strum(serialize = "3pt Miss")]
    ThreeMiss,
    #[strum(serialize = "2pt Attempt")]
    TwoAttempt,
    #[strum(serialize = "2pt Make")]
    TwoMake,
    #[strum(serialize = "2pt Miss")]
    TwoMiss,
    #[strum(serialize = "Trip to FT Line")]
    FtTrip,
    #[strum(serialize = "FT Attempt 1")]
    FtAttempt1,
    #[strum(serialize = "FT Attempt 2")]
    FtAttempt2,
    #[strum(serialize = "FT Make 1")]
    FtMake1,
    #[strum(serialize = "FT Miss 1")]
    FtMiss1,
    #[strum(serialize = "FT Make 2")]
    FtMake2,
    #[strum(serialize = "FT Miss 2")]
    FtMiss2,
    #[strum(serialize = "Turnover")]
    Turnover,
    #[strum(serialize = "2pt Oreb")]
    TwoOreb,
    #[strum(serialize = "3pt Oreb")]
    ThreeOreb,
    #[strum(serialize = "FT Oreb")]
    FtOreb,
    #[strum(serialize = "2pt NonOreb")]
    TwoNonOreb,
    #[strum(serialize = "3pt NonOreb")]
    ThreeNonOreb,
    #[strum(serialize = "FT NonOreb")]
    FtNonOreb,
    #[strum(serialize = "End Possession")]
    EndPossession,
}

/// Number of states, including the trailing [`State::EndPossession`] alignment state.
pub const STATES: usize = State::COUNT;

/// All states in ordinal order.
pub const ALL: [State; STATES] = [
    State::InitialPossession,
    State::ThreeAttempt,
    State::ThreeMake,
    State::ThreeMiss,
    State::TwoAttempt,
    State::TwoMake,
    State::TwoMiss,
    State::FtTrip,
    State::FtAttempt1,
    State::FtAttempt2,
    State::FtMake1,
    State::FtMiss1,
    State::FtMake2,
    State::FtMiss2,
    State::Turnover,
    State::TwoOreb,
    State::ThreeOreb,
    State::FtOreb,
    State::TwoNonOreb,
    State::ThreeNonOreb,
    State::FtNonOreb,
    State::EndPossession,
];

impl State {
    #[inline]
    pub fn index(self) -> usize {
        self.ordinal()
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        ALL[index]
    }

    /// Whether the state ends the possession.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            State::ThreeMake
                | State::TwoMake
                | State::FtMake2
                | State::Turnover
                | State::TwoNonOreb
                | State::ThreeNonOreb
                | State::FtNonOreb
                | State::EndPossession
        )
    }

    /// Points credited to the team in possession upon entering this state.
    pub fn points(self) -> u16 {
        match self {
            State::ThreeMake => 3,
            State::TwoMake => 2,
            State::FtMake1 | State::FtMake2 => 1,
            _ => 0,
        }
    }
}

/// A weighted tally of visits to each state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTally([f64; STATES]);

impl StateTally {
    #[inline]
    pub fn add(&mut self, state: State, weight: f64) {
        self.0[state.index()] += weight;
    }

    #[inline]
    pub fn get(&self, state: State) -> f64 {
        self.0[state.index()]
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn clear(&mut self) {
        self.0 = [0.0; STATES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn ordinals_align_with_table() {
        for (index, state) in State::iter().enumerate() {
            assert_eq!(index, state.index());
            assert_eq!(state, State::from_index(index));
        }
        assert_eq!(22, STATES);
    }

    #[test]
    fn terminals() {
        let terminals = State::iter().filter(|state| state.is_terminal()).count();
        assert_eq!(8, terminals);
        assert!(!State::TwoOreb.is_terminal());
        assert!(!State::FtMake1.is_terminal());
    }

    #[test]
    fn display() {
        assert_eq!("Trip to FT Line", State::FtTrip.to_string());
        assert_eq!("3pt NonOreb", State::ThreeNonOreb.to_string());
    }

    #[test]
    fn tally() {
        let mut tally = StateTally::default();
        tally.add(State::TwoMake, 1.0);
        tally.add(State::TwoMake, 0.5);
        tally.add(State::Turnover, 1.0);
        assert_eq!(1.5, tally.get(State::TwoMake));
        assert_eq!(2.5, tally.total());
        tally.clear();
        assert_eq!(0.0, tally.total());
    }
}
