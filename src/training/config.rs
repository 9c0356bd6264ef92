//! Training configuration

use crate::error::{Result, TrafficError};
use crate::preprocessing::UnknownCategoryPolicy;
use crate::recipe::{CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use super::classifier::TrainedClassifier;
use super::decision_tree::{Criterion, DecisionTree};
use super::metrics::Metric;
use super::random_forest::{MaxFeatures, RandomForest};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the preprocessor is fitted during cross-validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvPreprocessing {
    /// A fresh preprocessor is fitted on each training fold
    #[default]
    PerFold,
    /// One preprocessor is fitted on the whole dataset before splitting.
    /// Scaling ranges and vocabularies then leak from the held-out fold.
    WholeDataset,
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            criterion: Criterion::Gini,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    /// Unfitted forest with these parameters and a seed
    pub fn build(&self, random_state: u64) -> RandomForest {
        let mut forest = RandomForest::new(self.n_estimators)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_criterion(self.criterion)
            .with_bootstrap(self.bootstrap)
            .with_random_state(random_state);
        if let Some(depth) = self.max_depth {
            forest = forest.with_max_depth(depth);
        }
        forest
    }
}

/// Single decision tree hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub criterion: Criterion,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
        }
    }
}

/// Which classifier to train
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    RandomForest(ForestParams),
    DecisionTree(TreeParams),
}

impl Default for ClassifierSpec {
    fn default() -> Self {
        ClassifierSpec::RandomForest(ForestParams::default())
    }
}

impl ClassifierSpec {
    /// Build an unfitted classifier
    pub fn build(&self, random_state: u64) -> TrainedClassifier {
        match self {
            ClassifierSpec::RandomForest(params) => {
                TrainedClassifier::RandomForest(params.build(random_state))
            }
            ClassifierSpec::DecisionTree(params) => {
                let mut tree = DecisionTree::new()
                    .with_min_samples_split(params.min_samples_split)
                    .with_min_samples_leaf(params.min_samples_leaf)
                    .with_criterion(params.criterion)
                    .with_random_state(random_state);
                if let Some(depth) = params.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                if let Some(n) = params.max_features {
                    tree = tree.with_max_features(n);
                }
                TrainedClassifier::DecisionTree(tree)
            }
        }
    }
}

/// Configuration for training and cross-validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub classifier: ClassifierSpec,
    /// Seed for the hold-out split and the classifier
    pub random_state: u64,
    pub cv_scoring: Metric,
    pub cv_preprocessing: CvPreprocessing,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub unknown_categories: UnknownCategoryPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierSpec::default(),
            random_state: 42,
            cv_scoring: Metric::Accuracy,
            cv_preprocessing: CvPreprocessing::PerFold,
            numeric_columns: NUMERIC_FEATURES.iter().map(|c| c.to_string()).collect(),
            categorical_columns: CATEGORICAL_FEATURES.iter().map(|c| c.to_string()).collect(),
            unknown_categories: UnknownCategoryPolicy::Ignore,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(mut self, classifier: ClassifierSpec) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_cv_scoring(mut self, metric: Metric) -> Self {
        self.cv_scoring = metric;
        self
    }

    pub fn with_cv_preprocessing(mut self, mode: CvPreprocessing) -> Self {
        self.cv_preprocessing = mode;
        self
    }

    pub fn with_numeric_columns(mut self, columns: Vec<String>) -> Self {
        self.numeric_columns = columns;
        self
    }

    pub fn with_categorical_columns(mut self, columns: Vec<String>) -> Self {
        self.categorical_columns = columns;
        self
    }

    pub fn with_unknown_categories(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_categories = policy;
        self
    }

    /// Read a JSON config; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(TrafficError::ValidationError(
                "at least one feature column must be configured".to_string(),
            ));
        }
        if let Some(dup) = self
            .numeric_columns
            .iter()
            .find(|c| self.categorical_columns.contains(c))
        {
            return Err(TrafficError::ValidationError(format!(
                "column {:?} is listed as both numeric and categorical",
                dup
            )));
        }
        if let ClassifierSpec::RandomForest(params) = &self.classifier {
            if params.n_estimators == 0 {
                return Err(TrafficError::InvalidParameter {
                    name: "n_estimators".to_string(),
                    value: "0".to_string(),
                    reason: "must be >= 1".to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn numeric_refs(&self) -> Vec<&str> {
        self.numeric_columns.iter().map(String::as_str).collect()
    }

    pub(crate) fn categorical_refs(&self) -> Vec<&str> {
        self.categorical_columns.iter().map(String::as_str).collect()
    }
}
