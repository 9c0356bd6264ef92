//! Shared fixtures for the integration tests

#![allow(dead_code)]

use polars::prelude::*;
use tasty_traffic::training::{ClassifierSpec, ForestParams, TrainingConfig};

pub const ID_COLUMN: &str = "recipe";
pub const TARGET: &str = "high_traffic";

/// Synthetic recipe table in the raw training layout.
///
/// Traffic is High when protein exceeds 25g, so the signal is learnable.
pub fn recipes_df(n: usize) -> DataFrame {
    let calories: Vec<f64> = (0..n).map(|i| 40.0 + (i * 53 % 700) as f64 * 1.5).collect();
    let carbohydrate: Vec<f64> = (0..n).map(|i| (i * 11 % 90) as f64 + 0.25).collect();
    let sugar: Vec<f64> = (0..n).map(|i| (i * 7 % 30) as f64 * 0.5).collect();
    let protein: Vec<f64> = (0..n).map(|i| (i * 13 % 60) as f64).collect();
    let category: Vec<&str> = (0..n)
        .map(|i| ["Dessert", "Meat", "Vegetable", "Beverages", "Pork"][i % 5])
        .collect();
    let servings: Vec<i64> = (0..n).map(|i| [1, 2, 4, 6][i % 4]).collect();
    let target: Vec<&str> = protein
        .iter()
        .map(|&p| if p > 25.0 { "High" } else { "Low" })
        .collect();
    let ids: Vec<i64> = (1..=n as i64).collect();

    df!(
        ID_COLUMN => ids,
        "calories" => calories,
        "carbohydrate" => carbohydrate,
        "sugar" => sugar,
        "protein" => protein,
        "category" => category,
        "servings" => servings,
        TARGET => target
    )
    .unwrap()
}

/// Forest small enough to keep the tests fast
pub fn small_forest_config() -> TrainingConfig {
    TrainingConfig::default().with_classifier(ClassifierSpec::RandomForest(ForestParams {
        n_estimators: 12,
        max_depth: Some(6),
        ..ForestParams::default()
    }))
}
