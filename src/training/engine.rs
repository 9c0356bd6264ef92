//! Training engine: hold-out training and cross-validation over a recipe frame

use crate::error::{Result, TrafficError};
use crate::preprocessing::Preprocessor;
use crate::recipe::TrafficLabel;
use super::classifier::{Classifier, TrainedClassifier};
use super::config::{CvPreprocessing, TrainingConfig};
use super::cross_validation::{cross_val_score, stratified_split, CVResults, StratifiedKFold};
use super::metrics::{ClassificationMetrics, Metric, MetricsReport};
use ndarray::{Array1, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome<C = TrainedClassifier> {
    pub preprocessor: Preprocessor,
    pub classifier: C,
    pub report: MetricsReport,
}

/// Per-fold scores of a cross-validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
    pub metric: Metric,
    pub preprocessing: CvPreprocessing,
}

impl CrossValidationReport {
    fn new(results: CVResults, metric: Metric, preprocessing: CvPreprocessing) -> Self {
        Self {
            scores: results.scores,
            mean: results.mean_score,
            std: results.std_score,
            metric,
            preprocessing,
        }
    }
}

/// Main training engine
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train the configured classifier on a stratified hold-out split
    pub fn train(
        &self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
        test_fraction: f64,
    ) -> Result<TrainingOutcome> {
        let classifier = self.config.classifier.build(self.config.random_state);
        self.train_with(df, columns_to_drop, target_column, test_fraction, classifier)
    }

    /// Train a caller-supplied classifier on a stratified hold-out split.
    ///
    /// The preprocessor is fitted on the training partition only and the same
    /// instance transforms both partitions.
    pub fn train_with<C: Classifier>(
        &self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
        test_fraction: f64,
        mut classifier: C,
    ) -> Result<TrainingOutcome<C>> {
        self.config.validate()?;
        let start = Instant::now();

        let (features, y) = self.prepare_data(df, columns_to_drop, target_column)?;
        let split = stratified_split(&y, test_fraction, self.config.random_state)?;

        info!(
            rows = features.height(),
            train = split.train_indices.len(),
            test = split.test_indices.len(),
            classifier = classifier.name(),
            "training started"
        );

        let train_df = take_rows(&features, &split.train_indices)?;
        let test_df = take_rows(&features, &split.test_indices)?;
        let y_train = y.select(Axis(0), &split.train_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut preprocessor = Preprocessor::new(self.config.unknown_categories);
        let x_train = preprocessor.fit_transform(
            &train_df,
            &self.config.numeric_refs(),
            &self.config.categorical_refs(),
        )?;
        let x_test = preprocessor.transform(&test_df)?;

        classifier.fit(&x_train, &y_train)?;

        let train = ClassificationMetrics::compute(&y_train, &classifier.predict(&x_train)?)?;
        let test = ClassificationMetrics::compute(&y_test, &classifier.predict(&x_test)?)?;

        let report = MetricsReport {
            train,
            test,
            n_train: x_train.nrows(),
            n_test: x_test.nrows(),
            n_features: x_train.ncols(),
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            features = report.n_features,
            train_accuracy = report.train.accuracy,
            test_accuracy = report.test.accuracy,
            test_f1 = report.test.f1_score,
            secs = report.training_time_secs,
            "training finished"
        );

        Ok(TrainingOutcome { preprocessor, classifier, report })
    }

    /// Stratified k-fold cross-validation of the configured classifier
    pub fn cross_validate(
        &self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
        fold_count: usize,
    ) -> Result<CrossValidationReport> {
        self.config.validate()?;
        let kfold = StratifiedKFold::new(fold_count)?;
        let (features, y) = self.prepare_data(df, columns_to_drop, target_column)?;

        let metric = self.config.cv_scoring;
        let mode = self.config.cv_preprocessing;
        let numeric = self.config.numeric_refs();
        let categorical = self.config.categorical_refs();
        let make_classifier = || self.config.classifier.build(self.config.random_state);

        let results = match mode {
            CvPreprocessing::WholeDataset => {
                let mut preprocessor = Preprocessor::new(self.config.unknown_categories);
                let x = preprocessor.fit_transform(&features, &numeric, &categorical)?;
                cross_val_score(make_classifier, &x, &y, fold_count, metric)?
            }
            CvPreprocessing::PerFold => {
                let mut scores = Vec::with_capacity(fold_count);
                for split in kfold.split(&y)? {
                    let train_df = take_rows(&features, &split.train_indices)?;
                    let test_df = take_rows(&features, &split.test_indices)?;

                    let mut preprocessor = Preprocessor::new(self.config.unknown_categories);
                    let x_train = preprocessor.fit_transform(&train_df, &numeric, &categorical)?;
                    let x_test = preprocessor.transform(&test_df)?;

                    let mut classifier = make_classifier();
                    classifier.fit(&x_train, &y.select(Axis(0), &split.train_indices))?;
                    let score = metric.score(
                        &y.select(Axis(0), &split.test_indices),
                        &classifier.predict(&x_test)?,
                    )?;

                    debug!(fold = split.fold_idx, metric = %metric, score, "fold scored");
                    scores.push(score);
                }
                CVResults::from_scores(scores)
            }
        };

        info!(
            folds = fold_count,
            metric = %metric,
            mean = results.mean_score,
            std = results.std_score,
            preprocessing = ?mode,
            "cross-validation finished"
        );

        Ok(CrossValidationReport::new(results, metric, mode))
    }

    /// Drop non-feature columns and split off the encoded target
    fn prepare_data(
        &self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
    ) -> Result<(DataFrame, Array1<f64>)> {
        if columns_to_drop.contains(&target_column) {
            return Err(TrafficError::ValidationError(format!(
                "target column {:?} is also listed for dropping",
                target_column
            )));
        }

        let y = encode_target(df, target_column)?;

        let mut features = df.drop(target_column)?;
        for &name in columns_to_drop {
            features = features
                .drop(name)
                .map_err(|_| TrafficError::FeatureNotFound(name.to_string()))?;
        }

        Ok((features, y))
    }
}

/// Map the raw target column ("Low" / "High") to 0 / 1.
///
/// Any other value, including null, is an `InvalidLabel` error.
pub fn encode_target(df: &DataFrame, target_column: &str) -> Result<Array1<f64>> {
    let column = df
        .column(target_column)
        .map_err(|_| TrafficError::FeatureNotFound(target_column.to_string()))?;
    let casted = column.cast(&DataType::String)?;

    casted
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .and_then(TrafficLabel::from_raw)
                .map(TrafficLabel::as_class)
                .ok_or_else(|| TrafficError::InvalidLabel {
                    value: value.unwrap_or("null").to_string(),
                    row,
                })
        })
        .collect()
}

/// Select rows by position
pub(crate) fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}
