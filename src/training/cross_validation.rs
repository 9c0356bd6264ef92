//! Stratified splitting and k-fold cross-validation

use crate::error::{Result, TrafficError};
use super::classifier::Classifier;
use super::metrics::Metric;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold without shuffling.
///
/// Samples of each class keep their original order and are dealt to folds in
/// contiguous blocks, so every fold holds roughly the same class proportions.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(TrafficError::InvalidParameter {
                name: "fold_count".to_string(),
                value: n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        Ok(Self { n_splits })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test splits for binary labels
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        let k = self.n_splits;

        let classes: Vec<usize> = y.iter().map(|&v| usize::from(v > 0.5)).collect();
        let class_sizes = [
            classes.iter().filter(|&&c| c == 0).count(),
            classes.iter().filter(|&&c| c == 1).count(),
        ];

        if class_sizes.iter().all(|&n| n < k) {
            return Err(TrafficError::ValidationError(format!(
                "n_splits ({}) cannot exceed the number of members of every class ({:?})",
                k, class_sizes
            )));
        }
        let smallest = class_sizes.iter().copied().filter(|&n| n > 0).min().unwrap_or(0);
        if smallest < k {
            warn!(smallest_class = smallest, n_splits = k, "least populated class has fewer members than folds");
        }

        // Per-fold class allocation: deal the class-sorted labels round robin
        let sorted_labels: Vec<usize> = std::iter::repeat(0)
            .take(class_sizes[0])
            .chain(std::iter::repeat(1).take(class_sizes[1]))
            .collect();
        let mut allocation = vec![[0usize; 2]; k];
        for (pos, &class) in sorted_labels.iter().enumerate() {
            allocation[pos % k][class] += 1;
        }

        // Assign each class's samples, in order, to folds in contiguous blocks
        let mut test_fold = vec![0usize; n_samples];
        for class in 0..2 {
            let fold_of_rank: Vec<usize> = (0..k)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]))
                .collect();
            let members = classes.iter().enumerate().filter(|(_, &c)| c == class);
            for ((idx, _), &fold) in members.zip(fold_of_rank.iter()) {
                test_fold[idx] = fold;
            }
        }

        let splits = (0..k)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| test_fold[i] == fold_idx);
                CVSplit { train_indices, test_indices, fold_idx }
            })
            .collect();

        Ok(splits)
    }
}

/// Row indices of a hold-out split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Seeded stratified hold-out split.
///
/// Each class sends `round(n_class * test_fraction)` of its rows to the test
/// side, clamped so both sides keep at least one row of any class with two or
/// more members. Indices come back sorted.
pub fn stratified_split(y: &Array1<f64>, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrafficError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must lie in (0, 1)".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(y.len());
    let mut test_indices = Vec::new();

    for class in [false, true] {
        let mut members: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &v)| (v > 0.5) == class)
            .map(|(i, _)| i)
            .collect();
        let n = members.len();
        if n == 0 {
            continue;
        }

        members.shuffle(&mut rng);

        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
        };

        test_indices.extend_from_slice(&members[..n_test]);
        train_indices.extend_from_slice(&members[n_test..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(TrafficError::DataError(
            "stratified split resulted in an empty train or test partition".to_string(),
        ));
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    debug!(train = train_indices.len(), test = test_indices.len(), "stratified split");

    Ok(TrainTestSplit { train_indices, test_indices })
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Population standard deviation of scores
    pub std_score: f64,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len().max(1) as f64;
        let mean_score = scores.iter().sum::<f64>() / n_folds;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
        }
    }

    pub fn n_folds(&self) -> usize {
        self.scores.len()
    }
}

/// Score a fresh classifier on every fold of an already preprocessed matrix
pub fn cross_val_score<C, F>(
    make_classifier: F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    n_splits: usize,
    metric: Metric,
) -> Result<CVResults>
where
    C: Classifier,
    F: Fn() -> C,
{
    let splits = StratifiedKFold::new(n_splits)?.split(y)?;

    let mut scores = Vec::with_capacity(splits.len());
    for split in &splits {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut classifier = make_classifier();
        classifier.fit(&x_train, &y_train)?;
        let score = metric.score(&y_test, &classifier.predict(&x_test)?)?;

        debug!(fold = split.fold_idx, metric = %metric, score, "fold scored");
        scores.push(score);
    }

    Ok(CVResults::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::decision_tree::DecisionTree;
    use ndarray::array;

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, // 5 samples of class 0
            1.0, 1.0, 1.0, 1.0, 1.0, // 5 samples of class 1
        ]);

        let splits = StratifiedKFold::new(5).unwrap().split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            assert_eq!(split.train_indices.len(), 8);
        }
        assert_eq!(splits[0].test_indices, vec![0, 5]);
        assert_eq!(splits[4].test_indices, vec![4, 9]);
    }

    #[test]
    fn test_stratified_k_fold_covers_every_index_once() {
        let y = Array1::from_iter((0..23).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }));

        let splits = StratifiedKFold::new(4).unwrap().split(&y).unwrap();

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..23).collect::<Vec<_>>());

        for split in &splits {
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert!((1..=3).contains(&positives), "fold {} has {} positives", split.fold_idx, positives);
            assert!(split.train_indices.iter().all(|i| !split.test_indices.contains(i)));
        }
    }

    #[test]
    fn test_invalid_fold_count() {
        assert!(StratifiedKFold::new(1).is_err());

        let y = array![0.0, 1.0, 0.0];
        assert!(StratifiedKFold::new(3).unwrap().split(&y).is_err());
    }

    #[test]
    fn test_stratified_split_sizes() {
        let y = Array1::from_iter((0..100).map(|i| if i < 60 { 1.0 } else { 0.0 }));

        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test_indices.len(), 20);
        assert_eq!(split.train_indices.len(), 80);
        let test_pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(test_pos, 12);
    }

    #[test]
    fn test_stratified_split_same_seed_same_split() {
        let y = Array1::from_iter((0..50).map(|i| (i % 2) as f64));

        let a = stratified_split(&y, 0.3, 42).unwrap();
        let b = stratified_split(&y, 0.3, 42).unwrap();
        let c = stratified_split(&y, 0.3, 7).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_stratified_split_clamps_small_classes() {
        let y = array![1.0, 1.0, 0.0, 0.0, 0.0];

        let split = stratified_split(&y, 0.1, 42).unwrap();

        // round(2 * 0.1) = 0 and round(3 * 0.1) = 0, both clamped up to 1
        assert_eq!(split.test_indices.len(), 2);
    }

    #[test]
    fn test_stratified_split_invalid_fraction() {
        let y = array![0.0, 1.0];
        assert!(stratified_split(&y, 0.0, 42).is_err());
        assert!(stratified_split(&y, 1.0, 42).is_err());
    }

    #[test]
    fn test_cv_results() {
        let results = CVResults::from_scores(vec![0.5, 1.0]);
        assert_eq!(results.mean_score, 0.75);
        assert_eq!(results.std_score, 0.25);
        assert_eq!(results.n_folds(), 2);
    }

    #[test]
    fn test_cross_val_score() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let y = Array1::from_iter((0..20).map(|i| if i >= 10 { 1.0 } else { 0.0 }));

        let results = cross_val_score(DecisionTree::new, &x, &y, 5, Metric::Accuracy).unwrap();

        assert_eq!(results.n_folds(), 5);
        assert!(results.mean_score > 0.7, "mean accuracy {}", results.mean_score);
    }
}
