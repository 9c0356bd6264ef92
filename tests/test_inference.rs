//! Integration test: prediction through the traffic model

mod common;

use common::{recipes_df, small_forest_config, ID_COLUMN, TARGET};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tasty_traffic::inference::{Evaluation, TrafficModel};
use tasty_traffic::preprocessing::Preprocessor;
use tasty_traffic::recipe::{Recipe, TrafficLabel, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use tasty_traffic::training::Classifier;
use tasty_traffic::{Result, TrafficError};

/// Classifier that answers every row with the same positive-class probability
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FixedProbability(f64);

impl Classifier for FixedProbability {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), self.0))
    }

    fn is_fitted(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fixed_probability"
    }
}

fn stub_model(p: f64) -> TrafficModel<FixedProbability> {
    let mut pre = Preprocessor::default();
    pre.fit(&recipes_df(20), &NUMERIC_FEATURES, &CATEGORICAL_FEATURES).unwrap();
    TrafficModel::from_parts(FixedProbability(p), pre)
}

#[test]
fn test_high_traffic_scenario() {
    let prediction = stub_model(0.87)
        .predict_traffic_increase(250.0, 45.0, 18.0, 12.0, "Dessert", 4)
        .unwrap();

    assert_eq!(prediction.as_pair(), ("High Traffic", 0.87));
}

#[test]
fn test_low_traffic_scenario() {
    let prediction = stub_model(0.13)
        .predict_traffic_increase(250.0, 45.0, 18.0, 12.0, "Dessert", 4)
        .unwrap();

    assert_eq!(prediction.label_str(), "Low Traffic");
    assert!((prediction.probability - 0.87).abs() < 1e-12);
}

#[test]
fn test_threshold_goes_to_high() {
    let prediction = stub_model(0.5)
        .predict_traffic_increase(100.0, 10.0, 1.0, 5.0, "Meat", 2)
        .unwrap();
    assert_eq!(prediction.label, TrafficLabel::High);
    assert_eq!(prediction.probability, 0.5);
}

#[test]
fn test_predict_before_training() {
    let model = TrafficModel::new(small_forest_config());

    assert!(!model.is_ready());
    assert_eq!(model.evaluate(), Evaluation::NoMetrics);
    assert!(matches!(
        model.predict_traffic_increase(250.0, 45.0, 18.0, 12.0, "Dessert", 4),
        Err(TrafficError::ModelNotReady)
    ));
    assert!(matches!(
        model.predict_batch(&[Recipe::new(1.0, 1.0, 1.0, 1.0, "Pork", 1)]),
        Err(TrafficError::ModelNotReady)
    ));
}

#[test]
fn test_trained_model_predicts_protein_signal() {
    let mut model = TrafficModel::new(small_forest_config());
    let report = model.train(&recipes_df(150), &[ID_COLUMN], TARGET, 0.2).unwrap();

    assert_eq!(model.evaluate(), Evaluation::Metrics(report));

    let high = model.predict_traffic_increase(300.0, 40.0, 10.0, 55.0, "Meat", 4).unwrap();
    let low = model.predict_traffic_increase(300.0, 40.0, 10.0, 2.0, "Meat", 4).unwrap();
    assert_eq!(high.label, TrafficLabel::High);
    assert_eq!(low.label, TrafficLabel::Low);
    assert!(high.probability >= 0.5 && low.probability >= 0.5);
}

#[test]
fn test_unseen_category_still_predicts() {
    let mut model = TrafficModel::new(small_forest_config());
    model.train(&recipes_df(80), &[ID_COLUMN], TARGET, 0.2).unwrap();

    let prediction = model
        .predict_traffic_increase(200.0, 30.0, 5.0, 40.0, "Chicken Breast", 2)
        .unwrap();
    assert!((0.5..=1.0).contains(&prediction.probability));
}

#[test]
fn test_feature_importances_named() {
    let mut model = TrafficModel::new(small_forest_config());
    model.train(&recipes_df(80), &[ID_COLUMN], TARGET, 0.2).unwrap();

    let importances = model.feature_importances().unwrap();
    assert_eq!(importances.len(), 10);

    let (top, _) = importances
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap();
    assert_eq!(top, "protein");
}

#[test]
fn test_train_with_custom_classifier() {
    let mut model: TrafficModel<FixedProbability> = TrafficModel::with_config(small_forest_config());
    let report = model
        .train_with(&recipes_df(50), &[ID_COLUMN], TARGET, 0.2, FixedProbability(0.9))
        .unwrap();

    // always predicts High
    assert_eq!(report.test.recall, 1.0);
    assert!(model.is_ready());
}
