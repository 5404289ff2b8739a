use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use crate::constants::DIAMETER_RESAMPLE_LIMIT;
use crate::error::{AggregationError, Result};

/// Scalar input that is either a literal or drawn once per use from a law
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    Fixed(f64),
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std: f64 },
}

impl Distribution {
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match *self {
            Distribution::Fixed(value) => value,
            Distribution::Uniform { min, max } if min == max => min,
            Distribution::Uniform { min, max } => rng.gen_range(min..=max),
            Distribution::Normal { mean, std } if std == 0.0 => mean,
            Distribution::Normal { mean, std } => match Normal::new(mean, std) {
                Ok(normal) => normal.sample(rng),
                Err(_) => mean,
            },
        }
    }

    /// Draws until a strictly positive value comes out. Normal laws with a
    /// large spread can go negative; those draws are discarded.
    pub fn sample_positive(&self, rng: &mut impl Rng) -> Result<f64> {
        for _ in 0..DIAMETER_RESAMPLE_LIMIT {
            let value = self.sample(rng);
            if value > 0.0 && value.is_finite() {
                return Ok(value);
            }
        }
        Err(AggregationError::invalid(format!(
            "{self:?} produced no positive value in {DIAMETER_RESAMPLE_LIMIT} draws"
        )))
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Fixed(value) => value,
            Distribution::Uniform { min, max } => 0.5 * (min + max),
            Distribution::Normal { mean, .. } => mean,
        }
    }

    /// Smallest and largest value a draw can take. Normal laws are unbounded.
    pub fn support(&self) -> (f64, f64) {
        match *self {
            Distribution::Fixed(value) => (value, value),
            Distribution::Uniform { min, max } => (min, max),
            Distribution::Normal { mean, std } if std == 0.0 => (mean, mean),
            Distribution::Normal { .. } => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    /// Structural checks only: finite parameters, min ≤ max, std ≥ 0
    pub fn check_shape(&self, name: &str) -> Result<()> {
        let ok = match *self {
            Distribution::Fixed(value) => value.is_finite(),
            Distribution::Uniform { min, max } => {
                min.is_finite() && max.is_finite() && min <= max
            }
            Distribution::Normal { mean, std } => {
                mean.is_finite() && std.is_finite() && std >= 0.0
            }
        };
        if !ok {
            return Err(AggregationError::invalid(format!(
                "{name}: malformed distribution {self:?}"
            )));
        }
        Ok(())
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        self.check_shape(name)?;
        if self.mean() <= 0.0 {
            return Err(AggregationError::invalid(format!(
                "{name}: mean must be positive, got {}",
                self.mean()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fixed_never_consumes_randomness() {
        let mut a = ChaCha8Rng::seed_from_u64(1);
        let mut b = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(Distribution::Fixed(25.0).sample(&mut a), 25.0);
        assert_eq!(a.gen_range(0..u64::MAX), b.gen_range(0..u64::MAX));
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let dist = Distribution::Uniform { min: 10.0, max: 30.0 };
        for _ in 0..1000 {
            let v = dist.sample(&mut rng);
            assert!((10.0..=30.0).contains(&v));
        }
        assert_relative_eq!(dist.mean(), 20.0);
    }

    #[test]
    fn test_normal_sample_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let dist = Distribution::Normal { mean: 25.0, std: 2.0 };
        let n = 20_000;
        let total: f64 = (0..n).map(|_| dist.sample_positive(&mut rng).unwrap()).sum();
        assert!((total / n as f64 - 25.0).abs() < 0.1);
    }

    #[test]
    fn test_validate_rejects_bad_laws() {
        assert!(Distribution::Fixed(0.0).validate("d").is_err());
        assert!(Distribution::Uniform { min: 5.0, max: 1.0 }.validate("d").is_err());
        assert!(Distribution::Normal { mean: 10.0, std: -1.0 }.validate("d").is_err());
        assert!(Distribution::Normal { mean: 10.0, std: 1.0 }.validate("d").is_ok());
    }

    #[test]
    fn test_support_bounds() {
        assert_eq!(Distribution::Fixed(1.2).support(), (1.2, 1.2));
        assert_eq!(Distribution::Uniform { min: 1.0, max: 1.5 }.support(), (1.0, 1.5));
        assert_eq!(Distribution::Normal { mean: 1.3, std: 0.0 }.support(), (1.3, 1.3));
        let (lo, hi) = Distribution::Normal { mean: 1.3, std: 0.1 }.support();
        assert!(lo.is_infinite() && hi.is_infinite());
    }

    #[test]
    fn test_sample_positive_gives_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = Distribution::Fixed(-1.0).sample_positive(&mut rng).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidParameters(_)));
    }
}
