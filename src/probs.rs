//! Utilities for working with probabilities and ratios.

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn normalise(&mut self, target: f64) -> f64;
    fn scale(&mut self, factor: f64);
    fn mean(&self) -> f64;
    fn cumulative(&self, target: &mut [f64]);
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn normalise(&mut self, target: f64) -> f64 {
        let sum = self.sum();
        self.scale(target / sum);
        sum
    }

    fn scale(&mut self, factor: f64) {
        for element in self {
            *element *= factor;
        }
    }

    /// Arithmetic mean; 0 for an empty slice.
    fn mean(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.sum() / self.len() as f64
        }
    }

    /// Writes the running total of this slice into `target`.
    fn cumulative(&self, target: &mut [f64]) {
        debug_assert_eq!(self.len(), target.len());
        let mut running = 0.0;
        for (index, &value) in self.iter().enumerate() {
            running += value;
            target[index] = running;
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is zero or the quotient is not finite.
#[inline]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let quotient = numerator / denominator;
    if quotient.is_finite() {
        quotient
    } else {
        0.0
    }
}

/// Rounds to the nearest multiple of 0.5.
#[inline]
pub fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_slice_f64_relative;
    use assert_float_eq::*;

    #[test]
    fn normalise() {
        let mut data = [0.1, 0.2, 0.3, 0.4];
        let sum = data.normalise(2.0);
        assert_float_absolute_eq!(1.0, sum);
        assert_float_absolute_eq!(2.0, data.sum());
        assert_slice_f64_relative(&[0.2, 0.4, 0.6, 0.8], &data, 1e-9);
    }

    #[test]
    fn mean_of_empty() {
        let empty: [f64; 0] = [];
        assert_eq!(0.0, empty.mean());
        assert_float_absolute_eq!(2.0, [1.0, 2.0, 3.0].mean());
    }

    #[test]
    fn cumulative() {
        let mut target = [0.0; 3];
        [0.25, 0.25, 0.5].cumulative(&mut target);
        assert_eq!([0.25, 0.5, 1.0], target);
    }

    #[test]
    fn ratio_guards_zero() {
        assert_eq!(0.0, ratio(5.0, 0.0));
        assert_eq!(0.0, ratio(0.0, 0.0));
        assert_eq!(0.5, ratio(1.0, 2.0));
    }

    #[test]
    fn round_to_half() {
        assert_eq!(-3.5, round_half(-3.6));
        assert_eq!(221.0, round_half(220.9));
        assert_eq!(7.5, round_half(7.4));
    }
}
