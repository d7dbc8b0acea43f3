//! Rated possession metrics.

use std::ops::{Index, IndexMut};

use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use strum_macros::{Display, EnumCount, EnumIter};

use crate::data::{Counts, AVERAGE_USAGE_SHARE};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinal, EnumCount, EnumIter, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    TwoMade,
    TwoMissed,
    TwoAttempts,
    ThreeMade,
    ThreeMissed,
    ThreeAttempts,
    FtAttempts,
    FtMade,
    OffRebounds,
    Turnovers,
    Duration,
    Usage,
}

pub const METRICS: usize = Metric::COUNT;

impl Metric {
    /// The per-possession value of this metric. Usage is not a count and observes as 0.
    pub fn observe(self, counts: &Counts) -> f64 {
        match self {
            Metric::TwoMade => counts.two_made,
            Metric::TwoMissed => counts.two_missed(),
            Metric::TwoAttempts => counts.two_attempts,
            Metric::ThreeMade => counts.three_made,
            Metric::ThreeMissed => counts.three_missed(),
            Metric::ThreeAttempts => counts.three_attempts,
            Metric::FtAttempts => counts.fta,
            Metric::FtMade => counts.ftm,
            Metric::OffRebounds => counts.off_rebounds,
            Metric::Turnovers => counts.turnovers,
            Metric::Duration => counts.duration,
            Metric::Usage => 0.0,
        }
    }
}

/// A value for every [`Metric`], indexable by metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerMetric(pub [f64; METRICS]);

impl PerMetric {
    pub fn filled(value: f64) -> Self {
        Self([value; METRICS])
    }

    /// Per-possession observation of every count metric, with usage pinned to the average share.
    pub fn observe(counts: &Counts) -> Self {
        let mut values = Self::filled(0.0);
        for (index, value) in values.0.iter_mut().enumerate() {
            *value = METRIC_TABLE[index].observe(counts);
        }
        values[Metric::Usage] = AVERAGE_USAGE_SHARE;
        values
    }

    pub fn add_assign(&mut self, other: &PerMetric) {
        for (value, other) in self.0.iter_mut().zip(other.0.iter()) {
            *value += other;
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for value in &mut self.0 {
            *value *= factor;
        }
    }
}

impl Default for PerMetric {
    fn default() -> Self {
        Self::filled(0.0)
    }
}

impl Index<Metric> for PerMetric {
    type Output = f64;

    #[inline]
    fn index(&self, metric: Metric) -> &Self::Output {
        &self.0[metric.ordinal()]
    }
}

impl IndexMut<Metric> for PerMetric {
    #[inline]
    fn index_mut(&mut self, metric: Metric) -> &mut Self::Output {
        &mut self.0[metric.ordinal()]
    }
}

const METRIC_TABLE: [Metric; METRICS] = [
    Metric::TwoMade,
    Metric::TwoMissed,
    Metric::TwoAttempts,
    Metric::ThreeMade,
    Metric::ThreeMissed,
    Metric::ThreeAttempts,
    Metric::FtAttempts,
    Metric::FtMade,
    Metric::OffRebounds,
    Metric::Turnovers,
    Metric::Duration,
    Metric::Usage,
];

/// Update sensitivities (k) per metric, for each side of the ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensitivities {
    pub offense: PerMetric,
    pub defense: PerMetric,
}
impl Sensitivities {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for values in [&self.offense, &self.defense] {
            if values.0.iter().any(|&k| !k.is_finite() || k < 0.0) {
                anyhow::bail!("sensitivities must be finite and non-negative");
            }
        }
        Ok(())
    }
}

impl Default for Sensitivities {
    fn default() -> Self {
        Self {
            offense: PerMetric([0.7, 0.7, 0.9, 0.6, 0.6, 0.9, 0.6, 0.4, 0.6, 0.2, 0.5, 0.5]),
            defense: PerMetric([0.5, 0.5, 0.7, 0.4, 0.4, 0.7, 0.6, 0.001, 0.6, 0.2, 0.5, 0.6]),
        }
    }
}
