//! Apportioning of simulated team totals to individual players.

use anyhow::bail;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::aggregate::BoxTotals;
use crate::data::{Corpus, Role};
use crate::probs::{ratio, SliceExt};
use crate::roster::RosterEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApportionConfig {
    /// Geometric weight applied per possession of age, newest first.
    pub decay: f64,
    pub ft_prior: f64,
    pub two_prior: f64,
    pub three_prior: f64,
    pub game_seconds: f64,
    /// Games averaged when projecting a player's possessions.
    pub recent_games: usize,
}
impl ApportionConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            bail!("decay must lie in (0, 1]");
        }
        if [self.ft_prior, self.two_prior, self.three_prior]
            .iter()
            .any(|&prior| !(prior > 0.0))
        {
            bail!("shooting priors must be positive");
        }
        if !(self.game_seconds > 0.0) {
            bail!("game length must be positive");
        }
        if self.recent_games == 0 {
            bail!("at least one recent game is required");
        }
        Ok(())
    }
}

impl Default for ApportionConfig {
    fn default() -> Self {
        Self {
            decay: 0.99,
            ft_prior: 0.3,
            two_prior: 0.25,
            three_prior: 0.4,
            game_seconds: 2400.0,
            recent_games: 3,
        }
    }
}

/// Decay-weighted per-possession credit of a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatRates {
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
}
impl StatRates {
    fn fields_mut(&mut self) -> [&mut f64; 10] {
        [
            &mut self.fta,
            &mut self.ftm,
            &mut self.two_attempts,
            &mut self.two_made,
            &mut self.three_attempts,
            &mut self.three_made,
            &mut self.assists,
            &mut self.turnovers,
            &mut self.off_rebounds,
            &mut self.def_rebounds,
        ]
    }

    /// Mean across players.
    pub fn league<'a>(rates: impl IntoIterator<Item = &'a StatRates>) -> StatRates {
        let mut sum = StatRates::default();
        let mut count = 0;
        for rates in rates {
            let mut rates = *rates;
            for (total, value) in sum.fields_mut().into_iter().zip(rates.fields_mut()) {
                *total += *value;
            }
            count += 1;
        }
        if count > 0 {
            for total in sum.fields_mut() {
                *total /= count as f64;
            }
        }
        sum
    }
}

fn decay_weights(len: usize, decay: f64) -> Vec<f64> {
    let mut weights: Vec<_> = (0..len).map(|age| decay.powi(age as i32)).collect();
    if !weights.is_empty() {
        weights.normalise(1.0);
    }
    weights
}

/// Per-possession rates of each of `players`, drawn from the player's own actions. Offensive
/// stats come from offensive possessions, newest weighted most. Defensive rebounds are a plain
/// mean over defensive possessions.
pub fn player_rates(corpus: &Corpus, players: &[&str], decay: f64) -> FxHashMap<String, StatRates> {
    let wanted: FxHashSet<&str> = players.iter().copied().collect();
    let mut histories: FxHashMap<(&str, Role), Vec<usize>> = FxHashMap::default();
    for (index, record) in corpus.records.iter().enumerate() {
        if wanted.contains(record.player.as_str()) {
            histories
                .entry((record.player.as_str(), record.role))
                .or_default()
                .push(index);
        }
    }

    let mut rates: FxHashMap<String, StatRates> = players
        .iter()
        .map(|&player| (player.to_string(), StatRates::default()))
        .collect();
    for ((player, role), mut indexes) in histories {
        indexes.sort_by(|&a, &b| corpus.records[b].chronological(&corpus.records[a]));
        let weights = match role {
            Role::For => decay_weights(indexes.len(), decay),
            Role::Against => decay_weights(indexes.len(), 1.0),
        };
        let player_rates = rates.entry(player.to_string()).or_default();
        for (index, weight) in indexes.into_iter().zip(weights) {
            let actions = &corpus.records[index].actions;
            match role {
                Role::For => {
                    player_rates.fta += actions.fta * weight;
                    player_rates.ftm += actions.ftm * weight;
                    player_rates.two_attempts += actions.two_attempts * weight;
                    player_rates.two_made += actions.two_made * weight;
                    player_rates.three_attempts += actions.three_attempts * weight;
                    player_rates.three_made += actions.three_made * weight;
                    player_rates.assists += actions.assists * weight;
                    player_rates.turnovers += actions.turnovers * weight;
                    player_rates.off_rebounds += actions.off_rebounds * weight;
                }
                Role::Against => {
                    player_rates.def_rebounds += actions.def_rebounds * weight;
                }
            }
        }
    }
    rates
}

/// A shooting percentage shrunk toward the league's, weighted by attempt volume against `prior`.
pub fn regressed_pct(made: f64, attempts: f64, league_pct: f64, prior: f64) -> f64 {
    ratio(ratio(made, attempts) * attempts + league_pct * prior, attempts + prior)
}

/// Rescales `values` to sum to `total`; all zeros when there is nothing to scale.
fn normalise_to(values: &mut [f64], total: f64) {
    let sum = values.sum();
    if sum > 0.0 {
        values.scale(total / sum);
    } else {
        values.scale(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreLine {
    pub player: String,
    pub name: String,
    pub team: String,
    pub minutes: f64,
    pub possessions: f64,
    pub two_made: f64,
    pub two_attempts: f64,
    pub two_pct: f64,
    pub three_made: f64,
    pub three_attempts: f64,
    pub three_pct: f64,
    pub ftm: f64,
    pub fta: f64,
    pub ft_pct: f64,
    pub off_rebounds: f64,
    pub def_rebounds: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub turnovers: f64,
    pub points: f64,
}

/// Apportions one team's simulated totals among `players`, returning lines sorted by points,
/// highest first.
pub fn apportion(
    players: &[(&RosterEntry, StatRates)],
    team: &BoxTotals,
    league: &StatRates,
    possessions_per_game: f64,
    config: &ApportionConfig,
) -> Vec<BoxScoreLine> {
    let projected = |rate: fn(&StatRates) -> f64| -> Vec<f64> {
        players
            .iter()
            .map(|(entry, rates)| rate(rates) * entry.possessions)
            .collect()
    };
    let mut fta = projected(|rates| rates.fta);
    let mut two_attempts = projected(|rates| rates.two_attempts);
    let mut three_attempts = projected(|rates| rates.three_attempts);
    let mut turnovers = projected(|rates| rates.turnovers);
    let mut off_rebounds = projected(|rates| rates.off_rebounds);
    let mut def_rebounds = projected(|rates| rates.def_rebounds);
    let assists = projected(|rates| rates.assists);
    normalise_to(&mut fta, team.fta);
    normalise_to(&mut two_attempts, team.two_attempts);
    normalise_to(&mut three_attempts, team.three_attempts);
    normalise_to(&mut turnovers, team.turnovers);
    normalise_to(&mut off_rebounds, team.off_rebounds);
    // every simulated defensive rebound is credited, so player totals match the team's exactly
    normalise_to(&mut def_rebounds, team.def_rebounds);

    let league_ft = ratio(league.ftm, league.fta);
    let league_two = ratio(league.two_made, league.two_attempts);
    let league_three = ratio(league.three_made, league.three_attempts);
    let made = |attempts: &[f64], pct: fn(&StatRates, f64, f64) -> f64, league_pct: f64, prior: f64| -> Vec<f64> {
        players
            .iter()
            .zip(attempts)
            .map(|((_, rates), &attempts)| pct(rates, league_pct, prior) * attempts)
            .collect()
    };
    let mut ftm = made(
        &fta[..],
        |rates, league_pct, prior| regressed_pct(rates.ftm, rates.fta, league_pct, prior),
        league_ft,
        config.ft_prior,
    );
    let mut two_made = made(
        &two_attempts[..],
        |rates, league_pct, prior| regressed_pct(rates.two_made, rates.two_attempts, league_pct, prior),
        league_two,
        config.two_prior,
    );
    let mut three_made = made(
        &three_attempts[..],
        |rates, league_pct, prior| {
            regressed_pct(rates.three_made, rates.three_attempts, league_pct, prior)
        },
        league_three,
        config.three_prior,
    );
    normalise_to(&mut ftm, team.ftm);
    normalise_to(&mut two_made, team.two_made);
    normalise_to(&mut three_made, team.three_made);

    let seconds_per_possession = ratio(config.game_seconds, possessions_per_game);
    let mut lines: Vec<_> = players
        .iter()
        .enumerate()
        .map(|(index, (entry, _))| BoxScoreLine {
            player: entry.player.clone(),
            name: entry.name.clone(),
            team: entry.team.clone(),
            minutes: (entry.possessions * seconds_per_possession / 60.0 * 10.0).round() / 10.0,
            possessions: entry.possessions,
            two_made: two_made[index],
            two_attempts: two_attempts[index],
            two_pct: ratio(two_made[index], two_attempts[index]),
            three_made: three_made[index],
            three_attempts: three_attempts[index],
            three_pct: ratio(three_made[index], three_attempts[index]),
            ftm: ftm[index],
            fta: fta[index],
            ft_pct: ratio(ftm[index], fta[index]),
            off_rebounds: off_rebounds[index],
            def_rebounds: def_rebounds[index],
            rebounds: off_rebounds[index] + def_rebounds[index],
            assists: assists[index],
            turnovers: turnovers[index],
            points: 3.0 * three_made[index] + 2.0 * two_made[index] + ftm[index],
        })
        .collect();
    lines.sort_by(|a, b| b.points.total_cmp(&a.points));
    lines
}
