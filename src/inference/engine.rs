//! Traffic model: trains, evaluates, persists and predicts
//!
//! Owns the fitted preprocessor and classifier as a pair. Prediction needs
//! both; they are only ever replaced together (by `train` or `load`).

use crate::error::{Result, TrafficError};
use crate::export::{self, BundleMetadata};
use crate::preprocessing::Preprocessor;
use crate::recipe::{Prediction, Recipe};
use crate::training::{
    Classifier, CrossValidationReport, MetricsReport, TrainEngine, TrainedClassifier, TrainingConfig,
};
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Outcome of [`TrafficModel::evaluate`]
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Metrics(MetricsReport),
    NoMetrics,
}

impl Evaluation {
    pub fn metrics(&self) -> Option<&MetricsReport> {
        match self {
            Evaluation::Metrics(report) => Some(report),
            Evaluation::NoMetrics => None,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Metrics(report) => write!(f, "{}", report),
            Evaluation::NoMetrics => f.write_str("no metrics available"),
        }
    }
}

/// Recipe traffic model
#[derive(Debug, Clone)]
pub struct TrafficModel<C = TrainedClassifier> {
    config: TrainingConfig,
    classifier: Option<C>,
    preprocessor: Option<Preprocessor>,
    metrics: Option<MetricsReport>,
}

impl Default for TrafficModel {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}

impl TrafficModel {
    /// Empty model; call [`TrafficModel::train`] or [`TrafficModel::load`] before predicting
    pub fn new(config: TrainingConfig) -> Self {
        Self::with_config(config)
    }

    /// Train the configured classifier and keep the resulting pair and metrics
    pub fn train(
        &mut self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
        test_fraction: f64,
    ) -> Result<MetricsReport> {
        let outcome = TrainEngine::new(self.config.clone()).train(
            df,
            columns_to_drop,
            target_column,
            test_fraction,
        )?;

        self.classifier = Some(outcome.classifier);
        self.preprocessor = Some(outcome.preprocessor);
        self.metrics = Some(outcome.report.clone());
        Ok(outcome.report)
    }

    /// Cross-validate the configured classifier; the model's own state is untouched
    pub fn cross_validate(
        &self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
        fold_count: usize,
    ) -> Result<CrossValidationReport> {
        TrainEngine::new(self.config.clone()).cross_validate(df, columns_to_drop, target_column, fold_count)
    }
}

impl<C: Classifier> TrafficModel<C> {
    pub fn with_config(config: TrainingConfig) -> Self {
        Self {
            config,
            classifier: None,
            preprocessor: None,
            metrics: None,
        }
    }

    /// Wrap an already fitted pair
    pub fn from_parts(classifier: C, preprocessor: Preprocessor) -> Self {
        Self {
            config: TrainingConfig::default(),
            classifier: Some(classifier),
            preprocessor: Some(preprocessor),
            metrics: None,
        }
    }

    /// Train a caller-supplied classifier with this model's configuration
    pub fn train_with(
        &mut self,
        df: &DataFrame,
        columns_to_drop: &[&str],
        target_column: &str,
        test_fraction: f64,
        classifier: C,
    ) -> Result<MetricsReport> {
        let outcome = TrainEngine::new(self.config.clone()).train_with(
            df,
            columns_to_drop,
            target_column,
            test_fraction,
            classifier,
        )?;

        self.classifier = Some(outcome.classifier);
        self.preprocessor = Some(outcome.preprocessor);
        self.metrics = Some(outcome.report.clone());
        Ok(outcome.report)
    }

    /// Metrics of the most recent `train`, or of the loaded bundle
    pub fn evaluate(&self) -> Evaluation {
        match &self.metrics {
            Some(report) => Evaluation::Metrics(report.clone()),
            None => Evaluation::NoMetrics,
        }
    }

    /// Both components present and fitted
    pub fn is_ready(&self) -> bool {
        self.parts().is_ok()
    }

    fn parts(&self) -> Result<(&C, &Preprocessor)> {
        match (&self.classifier, &self.preprocessor) {
            (Some(c), Some(p)) if c.is_fitted() && p.is_fitted() => Ok((c, p)),
            _ => Err(TrafficError::ModelNotReady),
        }
    }

    /// Predict the traffic class of a single recipe given its fields
    pub fn predict_traffic_increase(
        &self,
        calories: f64,
        carbohydrate: f64,
        sugar: f64,
        protein: f64,
        category: &str,
        servings: u32,
    ) -> Result<Prediction> {
        self.predict_recipe(&Recipe::new(calories, carbohydrate, sugar, protein, category, servings))
    }

    pub fn predict_recipe(&self, recipe: &Recipe) -> Result<Prediction> {
        let mut predictions = self.predict_batch(std::slice::from_ref(recipe))?;
        predictions.pop().ok_or_else(|| {
            TrafficError::ShapeError {
                expected: "1 prediction".to_string(),
                actual: "0 predictions".to_string(),
            }
        })
    }

    /// Predict many recipes with a single transform
    pub fn predict_batch(&self, recipes: &[Recipe]) -> Result<Vec<Prediction>> {
        let (classifier, preprocessor) = self.parts()?;
        for recipe in recipes {
            recipe.validate()?;
        }

        let frame = Recipe::batch_to_frame(recipes)?;
        let x = preprocessor.transform(&frame)?;
        let proba = classifier.predict_proba(&x)?;

        if proba.len() != recipes.len() {
            return Err(TrafficError::ShapeError {
                expected: format!("{} probabilities", recipes.len()),
                actual: format!("{} probabilities", proba.len()),
            });
        }

        debug!(rows = recipes.len(), classifier = classifier.name(), "predicted batch");

        Ok(proba.iter().map(|&p| Prediction::from_positive_probability(p)).collect())
    }

    /// Feature importances paired with the preprocessor's feature names
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let (classifier, preprocessor) = self.parts().ok()?;
        let importances = classifier.feature_importances()?;
        Some(
            preprocessor
                .feature_names()
                .iter()
                .cloned()
                .zip(importances.iter().copied())
                .collect(),
        )
    }

    pub fn classifier(&self) -> Option<&C> {
        self.classifier.as_ref()
    }

    pub fn preprocessor(&self) -> Option<&Preprocessor> {
        self.preprocessor.as_ref()
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

impl<C: Classifier + Serialize + DeserializeOwned> TrafficModel<C> {
    /// Persist the classifier/preprocessor pair with the latest metrics
    pub fn save(&self, path: impl AsRef<Path>) -> Result<BundleMetadata> {
        export::save(
            self.classifier.as_ref(),
            self.preprocessor.as_ref(),
            self.metrics.as_ref(),
            path,
        )
    }

    /// Replace all state with the bundle at `path`; on error nothing changes
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let bundle = export::load::<C>(path)?;
        self.classifier = Some(bundle.classifier);
        self.preprocessor = Some(bundle.preprocessor);
        self.metrics = bundle.metadata.metrics;
        Ok(self)
    }

    /// Load a bundle into a model with the default configuration
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut model = Self::with_config(TrainingConfig::default());
        model.load(path)?;
        Ok(model)
    }
}
