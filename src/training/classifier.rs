//! Pluggable binary classifier interface

use crate::error::{Result, TrafficError};
use super::decision_tree::DecisionTree;
use super::random_forest::RandomForest;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Binary classifier over the preprocessed feature matrix.
///
/// Labels are `0.0` (Low) and `1.0` (High). `predict_proba` returns the
/// probability of the positive class for each row.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Hard labels; thresholds the positive-class probability at 0.5 by default
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    fn name(&self) -> &str;

    /// Width of the matrix seen during fit, when the model records it
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Built-in classifiers, serialisable as part of a model bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedClassifier {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
}

impl TrainedClassifier {
    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedClassifier::RandomForest(m) => m,
            TrainedClassifier::DecisionTree(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedClassifier::RandomForest(m) => m,
            TrainedClassifier::DecisionTree(m) => m,
        }
    }
}

impl Default for TrainedClassifier {
    fn default() -> Self {
        TrainedClassifier::RandomForest(RandomForest::default())
    }
}

impl Classifier for TrainedClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }
}

/// Validate a training set and map labels to class indices (0 = Low, 1 = High)
pub(crate) fn binary_classes(x: &Array2<f64>, y: &Array1<f64>) -> Result<Vec<usize>> {
    if x.nrows() != y.len() {
        return Err(TrafficError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(TrafficError::ValidationError(format!(
            "cannot fit on a {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }

    y.iter()
        .enumerate()
        .map(|(i, &v)| {
            if v == 0.0 {
                Ok(0)
            } else if v == 1.0 {
                Ok(1)
            } else {
                Err(TrafficError::ValidationError(format!(
                    "label {} at row {} is not a binary class",
                    v, i
                )))
            }
        })
        .collect()
}

/// Reject a matrix whose width differs from the one seen during fit
pub(crate) fn check_features(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(TrafficError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}
