//! Reduction of simulated games into team metrics and market-style outputs.

use serde::{Deserialize, Serialize};

use crate::mc::{SimulationBatch, TeamGame};
use crate::probs::{ratio, round_half};
use crate::state::State;

/// Multiplier applied to the projected total before rounding.
pub const TOTAL_ADJUSTMENT: f64 = 1.005;

/// Counting statistics of one team in one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxTotals {
    pub points: f64,
    pub three_attempts: f64,
    pub three_made: f64,
    pub two_attempts: f64,
    pub two_made: f64,
    pub fta: f64,
    pub ftm: f64,
    pub off_rebounds: f64,
    pub def_rebounds: f64,
    pub non_off_rebounds: f64,
    pub turnovers: f64,
    pub misses: f64,
    pub opp_def_rebounds: f64,
}
impl BoxTotals {
    /// Derives the totals of `team`; defensive rebounds are those conceded by `opponent`.
    pub fn from_game(team: &TeamGame, opponent: &TeamGame) -> Self {
        let mut totals = Self::own(team);
        totals.def_rebounds = Self::own(opponent).opp_def_rebounds;
        totals
    }

    fn own(game: &TeamGame) -> Self {
        let tally = &game.tally;
        let off_rebounds =
            tally.get(State::TwoOreb) + tally.get(State::ThreeOreb) + tally.get(State::FtOreb);
        let misses =
            tally.get(State::TwoMiss) + tally.get(State::ThreeMiss) + tally.get(State::FtMiss2);
        Self {
            points: game.points,
            three_attempts: tally.get(State::ThreeAttempt),
            three_made: tally.get(State::ThreeMake),
            two_attempts: tally.get(State::TwoAttempt),
            two_made: tally.get(State::TwoMake),
            fta: tally.get(State::FtAttempt1) + tally.get(State::FtAttempt2),
            ftm: tally.get(State::FtMake1) + tally.get(State::FtMake2),
            off_rebounds,
            def_rebounds: 0.0,
            non_off_rebounds: tally.get(State::TwoNonOreb)
                + tally.get(State::ThreeNonOreb)
                + tally.get(State::FtNonOreb),
            turnovers: tally.get(State::Turnover),
            misses,
            opp_def_rebounds: misses - off_rebounds,
        }
    }

    fn add_assign(&mut self, other: &BoxTotals) {
        self.points += other.points;
        self.three_attempts += other.three_attempts;
        self.three_made += other.three_made;
        self.two_attempts += other.two_attempts;
        self.two_made += other.two_made;
        self.fta += other.fta;
        self.ftm += other.ftm;
        self.off_rebounds += other.off_rebounds;
        self.def_rebounds += other.def_rebounds;
        self.non_off_rebounds += other.non_off_rebounds;
        self.turnovers += other.turnovers;
        self.misses += other.misses;
        self.opp_def_rebounds += other.opp_def_rebounds;
    }

    fn scale(&mut self, factor: f64) {
        self.points *= factor;
        self.three_attempts *= factor;
        self.three_made *= factor;
        self.two_attempts *= factor;
        self.two_made *= factor;
        self.fta *= factor;
        self.ftm *= factor;
        self.off_rebounds *= factor;
        self.def_rebounds *= factor;
        self.non_off_rebounds *= factor;
        self.turnovers *= factor;
        self.misses *= factor;
        self.opp_def_rebounds *= factor;
    }

    pub fn field_goal_attempts(&self) -> f64 {
        self.two_attempts + self.three_attempts
    }

    pub fn field_goals_made(&self) -> f64 {
        self.two_made + self.three_made
    }
}

/// Mean counting statistics with the shooting splits derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAverages {
    pub totals: BoxTotals,
    pub three_pct: f64,
    pub two_pct: f64,
    pub ft_pct: f64,
    pub effective_fg_pct: f64,
    pub ft_rate: f64,
    pub off_rebound_pct: f64,
}
impl From<BoxTotals> for TeamAverages {
    fn from(totals: BoxTotals) -> Self {
        let fga = totals.field_goal_attempts();
        Self {
            three_pct: ratio(totals.three_made, totals.three_attempts),
            two_pct: ratio(totals.two_made, totals.two_attempts),
            ft_pct: ratio(totals.ftm, totals.fta),
            effective_fg_pct: ratio(totals.field_goals_made() + 0.5 * totals.three_made, fga),
            ft_rate: ratio(totals.fta, fga),
            off_rebound_pct: ratio(
                totals.off_rebounds,
                totals.off_rebounds + totals.opp_def_rebounds,
            ),
            totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    /// Absent when every game tied.
    pub averages: Option<TeamAverages>,
    pub win_prob: f64,
    pub supremacy: Option<f64>,
    pub spread: Option<f64>,
    /// Decimal odds; absent when the team never wins.
    pub moneyline: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupSummary {
    pub home: TeamSummary,
    pub away: TeamSummary,
    pub tie_prob: f64,
    pub total: Option<f64>,
    pub adjusted_total: Option<f64>,
    pub possessions: f64,
    pub games: usize,
    pub decided_games: usize,
}

pub fn moneyline(win_prob: f64) -> Option<f64> {
    if win_prob > 0.0 {
        Some(1.0 / win_prob)
    } else {
        None
    }
}

/// Summarises a batch, excluding tied games from every average.
pub fn summarise(batch: &SimulationBatch) -> MatchupSummary {
    let games = batch.games.len();
    let mut home_sum = BoxTotals::default();
    let mut away_sum = BoxTotals::default();
    let (mut home_wins, mut away_wins, mut decided) = (0usize, 0usize, 0usize);
    for game in batch.games.iter().filter(|game| !game.is_tie()) {
        decided += 1;
        if game.home.points > game.away.points {
            home_wins += 1;
        } else {
            away_wins += 1;
        }
        home_sum.add_assign(&BoxTotals::from_game(&game.home, &game.away));
        away_sum.add_assign(&BoxTotals::from_game(&game.away, &game.home));
    }
    let tie_prob = ratio((games - decided) as f64, games as f64);

    if decided == 0 {
        let undecided = TeamSummary {
            averages: None,
            win_prob: 0.0,
            supremacy: None,
            spread: None,
            moneyline: None,
        };
        return MatchupSummary {
            home: undecided.clone(),
            away: undecided,
            tie_prob: if games > 0 { 1.0 } else { 0.0 },
            total: None,
            adjusted_total: None,
            possessions: batch.possessions,
            games,
            decided_games: 0,
        };
    }

    home_sum.scale(1.0 / decided as f64);
    away_sum.scale(1.0 / decided as f64);
    let supremacy = home_sum.points - away_sum.points;
    let total = home_sum.points + away_sum.points;
    let team = |averages: BoxTotals, wins: usize, supremacy: f64| {
        let win_prob = wins as f64 / decided as f64;
        TeamSummary {
            averages: Some(averages.into()),
            win_prob,
            supremacy: Some(supremacy),
            spread: Some(round_half(-supremacy)),
            moneyline: moneyline(win_prob),
        }
    };
    MatchupSummary {
        home: team(home_sum, home_wins, supremacy),
        away: team(away_sum, away_wins, -supremacy),
        tie_prob,
        total: Some(total),
        adjusted_total: Some(round_half(total * TOTAL_ADJUSTMENT)),
        possessions: batch.possessions,
        games,
        decided_games: decided,
    }
}
