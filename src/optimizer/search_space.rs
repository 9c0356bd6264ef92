//! Search space for random forest hyperparameters

use crate::error::{Result, TrafficError};
use crate::training::{ForestParams, MaxFeatures};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: usize,
    pub high: usize,
}

impl IntRange {
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(self.low..=self.high)
    }

    fn check(&self, name: &str, min: usize) -> Result<()> {
        if self.low > self.high || self.low < min {
            return Err(TrafficError::InvalidParameter {
                name: name.to_string(),
                value: format!("{}..={}", self.low, self.high),
                reason: format!("need {} <= low <= high", min),
            });
        }
        Ok(())
    }
}

/// Inclusive float range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub low: f64,
    pub high: f64,
}

impl FloatRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        rng.gen::<f64>() * (self.high - self.low) + self.low
    }
}

/// Ranges sampled for each forest trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub n_estimators: IntRange,
    pub max_depth: IntRange,
    pub min_samples_split: IntRange,
    pub min_samples_leaf: IntRange,
    /// Fraction of features drawn per split
    pub max_features: FloatRange,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: IntRange::new(100, 200),
            max_depth: IntRange::new(4, 9),
            min_samples_split: IntRange::new(2, 10),
            min_samples_leaf: IntRange::new(1, 10),
            max_features: FloatRange::new(0.5, 0.9),
        }
    }
}

impl SearchSpace {
    pub fn with_n_estimators(mut self, low: usize, high: usize) -> Self {
        self.n_estimators = IntRange::new(low, high);
        self
    }

    pub fn with_max_depth(mut self, low: usize, high: usize) -> Self {
        self.max_depth = IntRange::new(low, high);
        self
    }

    pub fn with_min_samples_split(mut self, low: usize, high: usize) -> Self {
        self.min_samples_split = IntRange::new(low, high);
        self
    }

    pub fn with_min_samples_leaf(mut self, low: usize, high: usize) -> Self {
        self.min_samples_leaf = IntRange::new(low, high);
        self
    }

    pub fn with_max_features(mut self, low: f64, high: f64) -> Self {
        self.max_features = FloatRange::new(low, high);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.n_estimators.check("n_estimators", 1)?;
        self.max_depth.check("max_depth", 1)?;
        self.min_samples_split.check("min_samples_split", 2)?;
        self.min_samples_leaf.check("min_samples_leaf", 1)?;

        let mf = self.max_features;
        if !(mf.low > 0.0 && mf.low <= mf.high && mf.high <= 1.0) {
            return Err(TrafficError::InvalidParameter {
                name: "max_features".to_string(),
                value: format!("{}..={}", mf.low, mf.high),
                reason: "need 0 < low <= high <= 1".to_string(),
            });
        }
        Ok(())
    }

    /// Draw one forest configuration
    pub fn sample(&self, rng: &mut impl Rng) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators.sample(rng),
            max_depth: Some(self.max_depth.sample(rng)),
            min_samples_split: self.min_samples_split.sample(rng),
            min_samples_leaf: self.min_samples_leaf.sample(rng),
            max_features: MaxFeatures::Fraction(self.max_features.sample(rng)),
            ..ForestParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_samples_within_default_ranges() {
        let space = SearchSpace::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..200 {
            let p = space.sample(&mut rng);
            assert!((100..=200).contains(&p.n_estimators));
            assert!((4..=9).contains(&p.max_depth.unwrap()));
            assert!((2..=10).contains(&p.min_samples_split));
            assert!((1..=10).contains(&p.min_samples_leaf));
            match p.max_features {
                MaxFeatures::Fraction(f) => assert!((0.5..=0.9).contains(&f)),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_validate() {
        assert!(SearchSpace::default().validate().is_ok());
        assert!(SearchSpace::default().with_max_depth(5, 3).validate().is_err());
        assert!(SearchSpace::default().with_min_samples_split(1, 4).validate().is_err());
        assert!(SearchSpace::default().with_max_features(0.0, 0.5).validate().is_err());
    }
}
