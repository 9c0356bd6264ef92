//! Random search over forest hyperparameters

use crate::error::{Result, TrafficError};
use crate::training::{cross_val_score, ForestParams, Metric};
use super::search_space::SearchSpace;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Configuration for a tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub n_trials: usize,
    pub cv_folds: usize,
    pub metric: Metric,
    /// Seeds both the sampler and every candidate forest
    pub random_state: u64,
    pub space: SearchSpace,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            n_trials: 20,
            cv_folds: 5,
            metric: Metric::Accuracy,
            random_state: 42,
            space: SearchSpace::default(),
        }
    }
}

impl TuningConfig {
    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }
}

/// Result of a single trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub params: ForestParams,
    /// Mean cross-validated score
    pub score: f64,
    pub std: f64,
    pub duration_secs: f64,
}

/// All trials of a tuning run and the best one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: usize,
    pub metric: Metric,
    pub total_duration_secs: f64,
}

impl TuningReport {
    pub fn best_trial(&self) -> &TrialResult {
        &self.trials[self.best_trial_idx]
    }

    pub fn best_params(&self) -> ForestParams {
        self.best_trial().params
    }

    pub fn best_score(&self) -> f64 {
        self.best_trial().score
    }
}

/// Samples forest configurations and keeps the one with the highest CV score
#[derive(Debug, Clone, Default)]
pub struct RandomSearchTuner {
    config: TuningConfig,
}

impl RandomSearchTuner {
    pub fn new(config: TuningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    /// Run the search on an already preprocessed feature matrix
    pub fn tune(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TuningReport> {
        if self.config.n_trials == 0 {
            return Err(TrafficError::InvalidParameter {
                name: "n_trials".to_string(),
                value: "0".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        self.config.space.validate()?;

        let start = Instant::now();
        let seed = self.config.random_state;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut trials: Vec<TrialResult> = Vec::with_capacity(self.config.n_trials);
        let mut best_trial_idx = 0;

        for trial_id in 0..self.config.n_trials {
            let trial_start = Instant::now();
            let params = self.config.space.sample(&mut rng);

            let cv = cross_val_score(
                || params.build(seed),
                x,
                y,
                self.config.cv_folds,
                self.config.metric,
            )?;

            debug!(
                trial_id,
                n_estimators = params.n_estimators,
                max_depth = ?params.max_depth,
                min_samples_split = params.min_samples_split,
                min_samples_leaf = params.min_samples_leaf,
                score = cv.mean_score,
                "trial finished"
            );

            if trial_id > 0 && cv.mean_score > trials[best_trial_idx].score {
                best_trial_idx = trial_id;
            }

            trials.push(TrialResult {
                trial_id,
                params,
                score: cv.mean_score,
                std: cv.std_score,
                duration_secs: trial_start.elapsed().as_secs_f64(),
            });
        }

        let report = TuningReport {
            trials,
            best_trial_idx,
            metric: self.config.metric,
            total_duration_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            trials = report.trials.len(),
            best_trial = best_trial_idx,
            best_score = report.best_score(),
            metric = %report.metric,
            "tuning finished"
        );

        Ok(report)
    }
}
