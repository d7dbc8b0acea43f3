//! Per-player random-walk skill ratings.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::baseline::Baselines;
use crate::data::{Corpus, PossessionRecord, Role, AVERAGE_USAGE_SHARE};
use crate::metric::{Metric, PerMetric, Sensitivities};
use crate::probs::ratio;

pub const INITIAL_RATING: f64 = 1500.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRatingProfile {
    pub player: String,
    pub name: String,
    /// Team of the most recent observed possession.
    pub team: String,
    pub offense: PerMetric,
    pub defense: PerMetric,
    pub observations: usize,
}
impl PlayerRatingProfile {
    pub fn new(player: String, name: String, team: String) -> Self {
        Self {
            player,
            name,
            team,
            offense: PerMetric::filled(INITIAL_RATING),
            defense: PerMetric::filled(INITIAL_RATING),
            observations: 0,
        }
    }

    pub fn ratings(&self, role: Role) -> &PerMetric {
        match role {
            Role::For => &self.offense,
            Role::Against => &self.defense,
        }
    }

    /// Folds a single possession into the profile.
    pub fn update(
        &mut self,
        record: &PossessionRecord,
        usage_share: f64,
        baseline: &PerMetric,
        sensitivities: &Sensitivities,
    ) {
        let (ratings, k) = match record.role {
            Role::For => (&mut self.offense, &sensitivities.offense),
            Role::Against => (&mut self.defense, &sensitivities.defense),
        };
        for metric in Metric::iter() {
            let outcome = match metric {
                Metric::Usage => ratio(usage_share - AVERAGE_USAGE_SHARE, AVERAGE_USAGE_SHARE),
                _ => {
                    let actual = metric.observe(&record.counts) * usage_share;
                    let expected = baseline[metric] * usage_share;
                    ratio(actual - expected, expected)
                }
            };
            ratings[metric] += k[metric] * outcome;
        }
        self.team.clone_from(&record.team);
        self.observations += 1;
    }

    /// Flattened `(column, rating)` pairs, suffixed by side.
    pub fn columns(&self) -> Vec<(String, f64)> {
        Metric::iter()
            .map(|metric| (format!("{metric}_offense"), self.offense[metric]))
            .chain(Metric::iter().map(|metric| (format!("{metric}_defense"), self.defense[metric])))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingTable {
    pub profiles: Vec<PlayerRatingProfile>,
}
impl RatingTable {
    /// Walks each player's possessions in chronological order. Players are independent and are folded
    /// in parallel; the output is ordered by player ID.
    pub fn compute(
        corpus: &Corpus,
        usage_shares: &[f64],
        baselines: &Baselines,
        sensitivities: &Sensitivities,
    ) -> Self {
        debug_assert_eq!(corpus.records.len(), usage_shares.len());
        let mut histories: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
        for (index, record) in corpus.records.iter().enumerate() {
            histories.entry(&record.player).or_default().push(index);
        }
        let mut histories: Vec<_> = histories.into_iter().collect();
        histories.sort_by(|(a, _), (b, _)| a.cmp(b));

        let profiles: Vec<_> = histories
            .into_par_iter()
            .map(|(player, mut indexes)| {
                indexes.sort_by(|&a, &b| {
                    let (a, b) = (&corpus.records[a], &corpus.records[b]);
                    a.chronological(b).then_with(|| a.role.cmp(&b.role))
                });
                let first = &corpus.records[indexes[0]];
                let mut profile =
                    PlayerRatingProfile::new(player.into(), first.name.clone(), first.team.clone());
                for index in indexes {
                    let record = &corpus.records[index];
                    match baselines.opposing(&record.opponent, record.role, record.game_key()) {
                        Some(baseline) => {
                            profile.update(record, usage_shares[index], baseline, sensitivities)
                        }
                        None => profile.team.clone_from(&record.team),
                    }
                }
                profile
            })
            .collect();
        debug!("rated {} players", profiles.len());
        Self { profiles }
    }

    pub fn get(&self, player: &str) -> Option<&PlayerRatingProfile> {
        self.profiles
            .binary_search_by(|profile| profile.player.as_str().cmp(player))
            .ok()
            .map(|index| &self.profiles[index])
    }

    /// Profiles with the highest ratings for `metric` on the given side.
    pub fn top(&self, role: Role, metric: Metric, limit: usize) -> Vec<&PlayerRatingProfile> {
        let mut sorted: Vec<_> = self.profiles.iter().collect();
        sorted.sort_by(|a, b| b.ratings(role)[metric].total_cmp(&a.ratings(role)[metric]));
        sorted.truncate(limit);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Counts;
    use crate::testing::record;
    use assert_float_eq::*;

    fn baseline_with(metric: Metric, value: f64) -> PerMetric {
        let mut baseline = PerMetric::filled(1.0);
        baseline[metric] = value;
        baseline[Metric::Usage] = AVERAGE_USAGE_SHARE;
        baseline
    }

    #[test]
    fn update_moves_by_relative_outcome() {
        let mut profile = PlayerRatingProfile::new("p1".into(), "P One".into(), "AAA".into());
        let mut possession = record("p1", "AAA", "BBB", 1, 1, Role::For);
        possession.counts = Counts {
            three_attempts: 1.0,
            three_made: 1.0,
            ..Counts::default()
        };
        let baseline = baseline_with(Metric::ThreeMade, 0.5);
        let sensitivities = Sensitivities::default();
        profile.update(&possession, 0.4, &baseline, &sensitivities);

        // (1 - 0.5) / 0.5 = 1
        assert_float_absolute_eq!(1500.6, profile.offense[Metric::ThreeMade]);
        // usage share 0.4 against 0.2
        assert_float_absolute_eq!(1500.5, profile.offense[Metric::Usage]);
        // defense untouched
        assert_eq!(PerMetric::filled(INITIAL_RATING), profile.defense);
        assert_eq!(1, profile.observations);
    }

    #[test]
    fn zero_usage_moves_nothing_but_usage() {
        let mut profile = PlayerRatingProfile::new("p1".into(), "P One".into(), "AAA".into());
        let mut possession = record("p1", "AAA", "BBB", 1, 1, Role::For);
        possession.counts.two_attempts = 3.0;
        let baseline = baseline_with(Metric::TwoAttempts, 1.0);
        profile.update(&possession, 0.0, &baseline, &Sensitivities::default());
        for metric in Metric::iter().filter(|&metric| metric != Metric::Usage) {
            assert_eq!(INITIAL_RATING, profile.offense[metric]);
        }
        assert!(profile.offense[Metric::Usage] < INITIAL_RATING);
    }

    #[test]
    fn zero_baseline_is_neutral() {
        let mut profile = PlayerRatingProfile::new("p1".into(), "P One".into(), "AAA".into());
        let mut possession = record("p1", "AAA", "BBB", 1, 1, Role::Against);
        possession.counts.turnovers = 1.0;
        let baseline = baseline_with(Metric::Turnovers, 0.0);
        profile.update(&possession, 0.2, &baseline, &Sensitivities::default());
        assert_eq!(INITIAL_RATING, profile.defense[Metric::Turnovers]);
    }

    #[test]
    fn columns_are_suffixed() {
        let profile = PlayerRatingProfile::new("p1".into(), "P One".into(), "AAA".into());
        let columns = profile.columns();
        assert_eq!(24, columns.len());
        assert_eq!("two_made_offense", columns[0].0);
        assert_eq!("usage_defense", columns[23].0);
    }
}
