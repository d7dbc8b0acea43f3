//! Fitting of the possession model from a corpus, and projection of a single matchup.

use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::bail;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tinyrand::{Seeded, StdRand};
use tracing::{debug, trace, warn};

use crate::aggregate::{summarise, BoxTotals, MatchupSummary};
use crate::apportion::{apportion, player_rates, ApportionConfig, BoxScoreLine, StatRates};
use crate::baseline::{BaselineConfig, Baselines};
use crate::data::{Corpus, Role, Venue};
use crate::hca::HcaDifferentials;
use crate::linear::matrix::Matrix;
use crate::mc::{Chain, MonteCarloEngine, DEFAULT_MAX_STEPS};
use crate::metric::Sensitivities;
use crate::pace::{matchup_possessions, team_durations, PaceConfig};
use crate::rating::{PlayerRatingProfile, RatingTable};
use crate::roster::{PlayerOverride, Roster, RosterEntry, RosterError};
use crate::timed::Timed;
use crate::transition::{sample_matrix, team_ratings, CalibrationError, PossessionProbs, TargetRates};


#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(anyhow::Error),

    #[error("invalid corpus: {0}")]
    InvalidCorpus(anyhow::Error),

    #[error("invalid matchup: {0}")]
    InvalidMatchup(anyhow::Error),

    #[error("{0}")]
    Calibration(#[from] CalibrationError),

    #[error("{0}")]
    Roster(#[from] RosterError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub targets: TargetRates,
    pub sensitivities: Sensitivities,
    pub scale: f64,
    pub matrix_walks: usize,
    pub max_possession_steps: usize,
    pub pace: PaceConfig,
    pub baseline: BaselineConfig,
    pub apportion: ApportionConfig,
}
impl Config {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.targets.offense.validate()?;
        self.targets.defense.validate()?;
        self.sensitivities.validate()?;
        if !(self.scale > 0.0) {
            bail!("calibration scale must be positive");
        }
        if self.matrix_walks == 0 {
            bail!("at least one matrix walk is required");
        }
        if self.max_possession_steps == 0 {
            bail!("at least one possession step is required");
        }
        self.pace.validate()?;
        self.baseline.validate()?;
        self.apportion.validate()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: TargetRates::default(),
            sensitivities: Sensitivities::default(),
            scale: 1_000.0,
            matrix_walks: 25_000,
            max_possession_steps: DEFAULT_MAX_STEPS,
            pace: PaceConfig::default(),
            baseline: BaselineConfig::default(),
            apportion: ApportionConfig::default(),
        }
    }
}

/// A single game to project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub home: String,
    pub away: String,
    #[serde(default = "Matchup::default_home_court")]
    pub home_court: f64,
    #[serde(default = "Matchup::default_trials")]
    pub trials: usize,
    #[serde(default)]
    pub possession_adjust: f64,
    #[serde(default)]
    pub overrides: Vec<PlayerOverride>,
    #[serde(default)]
    pub seed: Option<u64>,
}
impl Matchup {
    pub const DEFAULT_HOME_COURT: f64 = 0.8;
    pub const DEFAULT_TRIALS: usize = 15_000;

    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
            home_court: Self::DEFAULT_HOME_COURT,
            trials: Self::DEFAULT_TRIALS,
            possession_adjust: 0.0,
            overrides: vec![],
            seed: None,
        }
    }

    fn default_home_court() -> f64 {
        Self::DEFAULT_HOME_COURT
    }

    fn default_trials() -> usize {
        Self::DEFAULT_TRIALS
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.home == self.away {
            bail!("a team cannot play itself");
        }
        if !self.home_court.is_finite() {
            bail!("home-court coefficient must be finite");
        }
        if self.trials == 0 {
            bail!("at least one trial is required");
        }
        if !self.possession_adjust.is_finite() {
            bail!("possession adjustment must be finite");
        }
        Ok(())
    }
}

/// The projected outcome of a matchup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub home: String,
    pub away: String,
    pub summary: MatchupSummary,
    /// Empty when every simulated game tied.
    pub home_players: Vec<BoxScoreLine>,
    pub away_players: Vec<BoxScoreLine>,
}

/// Everything derived from the corpus that a projection needs.
#[derive(Debug, Clone)]
pub struct Model {
    config: Config,
    ratings: RatingTable,
    hca: HcaDifferentials,
    roster: Roster,
    rates: FxHashMap<String, StatRates>,
    /// Mean rates over every rated player; the target of shooting-percentage regression.
    league_rates: StatRates,
}
impl Model {
    pub fn fit(corpus: &Corpus, config: Config) -> Result<Self, ModelError> {
        config.validate().map_err(ModelError::InvalidConfig)?;
        corpus.validate().map_err(ModelError::InvalidCorpus)?;

        let usage_shares = corpus.usage_shares();
        let baselines = Timed::run(|| Baselines::compute(corpus, &config.baseline));
        debug!("baselines took {:.3}s", baselines.elapsed.as_secs_f64());

        let ratings = Timed::run(|| {
            RatingTable::compute(corpus, &usage_shares, &baselines.value, &config.sensitivities)
        });
        debug!(
            "rated {} players in {:.3}s",
            ratings.value.profiles.len(),
            ratings.elapsed.as_secs_f64()
        );

        let hca = Timed::run(|| HcaDifferentials::compute(corpus));
        debug!("home-court differentials took {:.3}s", hca.elapsed.as_secs_f64());

        let roster = Roster::assess(corpus, config.apportion.recent_games);
        let players: Vec<_> = ratings
            .value
            .profiles
            .iter()
            .map(|profile| profile.player.as_str())
            .collect();
        let rates = Timed::run(|| player_rates(corpus, &players, config.apportion.decay));
        debug!("player rates took {:.3}s", rates.elapsed.as_secs_f64());

        Ok(Self::new(config, ratings.value, hca.value, roster, rates.value))
    }

    /// Assembles a model from precomputed parts.
    pub fn new(
        config: Config,
        ratings: RatingTable,
        hca: HcaDifferentials,
        roster: Roster,
        rates: FxHashMap<String, StatRates>,
    ) -> Self {
        let league_rates = StatRates::league(rates.values());
        Self {
            config,
            ratings,
            hca,
            roster,
            rates,
            league_rates,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ratings(&self) -> &RatingTable {
        &self.ratings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn simulate(&self, matchup: &Matchup) -> Result<Projection, ModelError> {
        matchup.validate().map_err(ModelError::InvalidMatchup)?;
        let seed = matchup.seed.unwrap_or_else(clock_seed);

        let mut roster = self.roster.clone();
        roster.apply(&matchup.overrides, |player| {
            self.ratings
                .get(player)
                .or_else(|| self.ratings.profiles.iter().find(|profile| profile.name == player))
                .map(|profile| (profile.player.clone(), profile.name.clone()))
        });
        let home = self.rated_players(&roster, &matchup.home)?;
        let away = self.rated_players(&roster, &matchup.away)?;

        let matrices = Timed::result(|| -> Result<_, ModelError> {
            let home_offense = self.build_matrix(&home, Role::For, seed)?;
            let home_defense = self.build_matrix(&home, Role::Against, seed)?;
            let away_offense = self.build_matrix(&away, Role::For, seed)?;
            let away_defense = self.build_matrix(&away, Role::Against, seed)?;
            let home = self.hca.adjust(
                Venue::Home,
                &combine(&home_offense, &away_defense),
                matchup.home_court,
            );
            let away = self.hca.adjust(
                Venue::Away,
                &combine(&away_offense, &home_defense),
                matchup.home_court,
            );
            Ok((home, away))
        })?;
        debug!("built transition matrices in {:.3}s", matrices.elapsed.as_secs_f64());
        let (home_transitions, away_transitions) = matrices.value;
        trace!("{} transitions:\n{}", matchup.home, home_transitions.verbose());
        trace!("{} transitions:\n{}", matchup.away, away_transitions.verbose());
        let (home_chain, away_chain) = (Chain::new(&home_transitions), Chain::new(&away_transitions));

        let possessions = matchup_possessions(
            team_durations(home.iter().map(|(_, profile)| *profile)),
            team_durations(away.iter().map(|(_, profile)| *profile)),
            matchup.possession_adjust,
            &self.config.pace,
        );
        let engine = MonteCarloEngine::default()
            .with_games(matchup.trials)
            .with_possessions(possessions)
            .with_max_steps(self.config.max_possession_steps)
            .with_seed(Stream::Games.seed(seed));
        let batch = Timed::run(|| engine.simulate(&home_chain, &away_chain));
        debug!(
            "simulated {} games of {possessions:.2} possessions in {:.3}s",
            matchup.trials,
            batch.elapsed.as_secs_f64()
        );
        let summary = summarise(&batch.value);

        let (home_players, away_players) = match (&summary.home.averages, &summary.away.averages) {
            (Some(home_averages), Some(away_averages)) => {
                let home_rates = self.rates_of(&home);
                let away_rates = self.rates_of(&away);
                (
                    self.box_score(&home_rates, &home_averages.totals, possessions),
                    self.box_score(&away_rates, &away_averages.totals, possessions),
                )
            }
            _ => {
                warn!("every simulated game tied; no box score projected");
                (vec![], vec![])
            }
        };

        Ok(Projection {
            home: matchup.home.clone(),
            away: matchup.away.clone(),
            summary,
            home_players,
            away_players,
        })
    }

    /// Active roster entries of `team` that carry a rating. Unrated players are dropped rather than
    /// assumed neutral.
    fn rated_players<'a>(
        &'a self,
        roster: &'a Roster,
        team: &str,
    ) -> Result<Vec<(&'a RosterEntry, &'a PlayerRatingProfile)>, ModelError> {
        let rated: Vec<_> = roster
            .active(team)?
            .into_iter()
            .filter_map(|entry| match self.ratings.get(&entry.player) {
                Some(profile) => Some((entry, profile)),
                None => {
                    warn!("skipping unrated player {} of {team}", entry.player);
                    None
                }
            })
            .collect();
        if rated.is_empty() {
            return Err(RosterError::NoActivePlayers(team.into()).into());
        }
        Ok(rated)
    }

    fn build_matrix(
        &self,
        players: &[(&RosterEntry, &PlayerRatingProfile)],
        role: Role,
        seed: u64,
    ) -> Result<Matrix<f64>, ModelError> {
        let ratings = team_ratings(players.iter().map(|(_, profile)| *profile), role);
        let probs = PossessionProbs::calibrate(&ratings, self.config.targets.get(role), self.config.scale)?;
        let mut rand = StdRand::seed(Stream::Matrix(role).seed(seed));
        Ok(sample_matrix(&probs, self.config.matrix_walks, &mut rand))
    }

    fn rates_of<'a>(
        &self,
        players: &[(&'a RosterEntry, &'a PlayerRatingProfile)],
    ) -> Vec<(&'a RosterEntry, StatRates)> {
        players
            .iter()
            .map(|(entry, _)| {
                let rates = self.rates.get(&entry.player).copied().unwrap_or_default();
                (*entry, rates)
            })
            .collect()
    }

    fn box_score(
        &self,
        players: &[(&RosterEntry, StatRates)],
        totals: &BoxTotals,
        possessions: f64,
    ) -> Vec<BoxScoreLine> {
        apportion(players, totals, &self.league_rates, possessions, &self.config.apportion)
    }
}

/// Cell-wise sum of a team's offensive counts and its opponent's defensive counts.
pub fn combine(offense: &Matrix<f64>, defense: &Matrix<f64>) -> Matrix<f64> {
    offense.add(defense)
}

/// Independent random streams drawn from one matchup seed. Both teams' matrices of the same role
/// share a stream, so identical ratings give identical matrices, while the offense and defense
/// summed into one matrix sample independently of each other and of the games.
#[derive(Debug, Clone, Copy, Hash)]
enum Stream {
    Matrix(Role),
    Games,
}
impl Stream {
    fn seed(self, seed: u64) -> u64 {
        let mut hasher = FxHasher::default();
        (seed, self).hash(&mut hasher);
        hasher.finish()
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}
