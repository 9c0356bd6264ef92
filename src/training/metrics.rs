//! Binary classification metrics (positive class = High)

use crate::error::{Result, TrafficError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scoring metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::F1 => "f1",
        }
    }

    pub fn score(self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        Ok(ClassificationMetrics::compute(y_true, y_pred)?.get(self))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Confusion counts with High as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(TrafficError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let mut counts = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

/// Accuracy, precision, recall and F1 of one partition.
///
/// Undefined ratios (no predicted or no actual positives) are reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion: ConfusionCounts,
}

impl ClassificationMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        let confusion = ConfusionCounts::from_labels(y_true, y_pred)?;
        let ConfusionCounts { tp, fp, tn, fn_ } = confusion;

        let total = confusion.total();
        let accuracy = if total > 0 { (tp + tn) as f64 / total as f64 } else { 0.0 };
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self { accuracy, precision, recall, f1_score, confusion })
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy,
            Metric::Precision => self.precision,
            Metric::Recall => self.recall,
            Metric::F1 => self.f1_score,
        }
    }
}

impl fmt::Display for ClassificationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
            self.accuracy, self.precision, self.recall, self.f1_score
        )
    }
}

/// Metrics of one training run, train and test partitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub train: ClassificationMetrics,
    pub test: ClassificationMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub training_time_secs: f64,
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "train ({} rows): {}", self.n_train, self.train)?;
        write!(f, "test ({} rows): {}", self.n_test, self.test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();

        assert_eq!(m.confusion, ConfusionCounts { tp: 3, fp: 1, tn: 3, fn_: 1 });
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.precision, 0.75);
        assert_eq!(m.recall, 0.75);
        assert!((m.f1_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions() {
        let y_true = array![1.0, 0.0];
        let y_pred = array![0.0, 0.0];

        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();

        assert_eq!(m.accuracy, 0.5);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_metric_score() {
        let y_true = array![1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 0.0, 0.0];

        assert_eq!(Metric::Recall.score(&y_true, &y_pred).unwrap(), 0.5);
        assert_eq!(Metric::Precision.score(&y_true, &y_pred).unwrap(), 1.0);
        assert!(Metric::F1.score(&y_true, &array![1.0]).is_err());
    }

    #[test]
    fn test_metric_serde_name() {
        assert_eq!(serde_json::to_string(&Metric::F1).unwrap(), "\"f1\"");
        assert_eq!(Metric::Accuracy.to_string(), "accuracy");
    }
}
