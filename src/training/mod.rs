//! Model training module
//!
//! Provides the binary traffic classifiers and the machinery to train and
//! evaluate them:
//! - Decision trees and Random Forests behind the [`Classifier`] trait
//! - Stratified hold-out training with train/test metrics
//! - Stratified k-fold cross-validation

mod config;
mod engine;
mod metrics;
pub mod classifier;
pub mod cross_validation;
pub mod decision_tree;
pub mod random_forest;

pub use classifier::{Classifier, TrainedClassifier};
pub use config::{ClassifierSpec, CvPreprocessing, ForestParams, TrainingConfig, TreeParams};
pub use cross_validation::{cross_val_score, stratified_split, CVResults, CVSplit, StratifiedKFold, TrainTestSplit};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{encode_target, CrossValidationReport, TrainEngine, TrainingOutcome};
pub use metrics::{ClassificationMetrics, ConfusionCounts, Metric, MetricsReport};
pub use random_forest::{MaxFeatures, RandomForest};
