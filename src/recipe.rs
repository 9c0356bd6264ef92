//! Recipe records, traffic labels and prediction results

use crate::error::{Result, TrafficError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CALORIES: &str = "calories";
pub const CARBOHYDRATE: &str = "carbohydrate";
pub const SUGAR: &str = "sugar";
pub const PROTEIN: &str = "protein";
pub const CATEGORY: &str = "category";
pub const SERVINGS: &str = "servings";

/// Numeric feature columns of the canonical recipe schema, in output order
pub const NUMERIC_FEATURES: [&str; 5] = [CALORIES, CARBOHYDRATE, SUGAR, PROTEIN, SERVINGS];

/// Categorical feature columns of the canonical recipe schema
pub const CATEGORICAL_FEATURES: [&str; 1] = [CATEGORY];

/// One recipe, either a labeled training row or a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub calories: f64,
    pub carbohydrate: f64,
    pub sugar: f64,
    pub protein: f64,
    pub category: String,
    pub servings: u32,
}

impl Recipe {
    pub fn new(
        calories: f64,
        carbohydrate: f64,
        sugar: f64,
        protein: f64,
        category: impl Into<String>,
        servings: u32,
    ) -> Self {
        Self {
            calories,
            carbohydrate,
            sugar,
            protein,
            category: category.into(),
            servings,
        }
    }

    /// Check the domain constraints: non-negative finite nutrients, at least one serving
    pub fn validate(&self) -> Result<()> {
        let nutrients = [
            (CALORIES, self.calories),
            (CARBOHYDRATE, self.carbohydrate),
            (SUGAR, self.sugar),
            (PROTEIN, self.protein),
        ];
        for (name, value) in nutrients {
            if !value.is_finite() || value < 0.0 {
                return Err(TrafficError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be a finite value >= 0".to_string(),
                });
            }
        }
        if self.servings == 0 {
            return Err(TrafficError::InvalidParameter {
                name: SERVINGS.to_string(),
                value: "0".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }

    /// Single-row feature table with the canonical column names
    pub fn to_frame(&self) -> Result<DataFrame> {
        Self::batch_to_frame(std::slice::from_ref(self))
    }

    /// Feature table with one row per recipe
    pub fn batch_to_frame(recipes: &[Recipe]) -> Result<DataFrame> {
        let df = df!(
            CALORIES => recipes.iter().map(|r| r.calories).collect::<Vec<f64>>(),
            CARBOHYDRATE => recipes.iter().map(|r| r.carbohydrate).collect::<Vec<f64>>(),
            SUGAR => recipes.iter().map(|r| r.sugar).collect::<Vec<f64>>(),
            PROTEIN => recipes.iter().map(|r| r.protein).collect::<Vec<f64>>(),
            CATEGORY => recipes.iter().map(|r| r.category.as_str()).collect::<Vec<&str>>(),
            SERVINGS => recipes.iter().map(|r| r.servings as i64).collect::<Vec<i64>>(),
        )?;
        Ok(df)
    }
}

/// Binary traffic outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficLabel {
    Low,
    High,
}

impl TrafficLabel {
    /// Parse a raw target value from the training data ("Low" / "High")
    pub fn from_raw(value: &str) -> Option<Self> {
        match value {
            "Low" => Some(TrafficLabel::Low),
            "High" => Some(TrafficLabel::High),
            _ => None,
        }
    }

    /// Numeric class used by the classifiers
    pub fn as_class(self) -> f64 {
        match self {
            TrafficLabel::Low => 0.0,
            TrafficLabel::High => 1.0,
        }
    }

    pub fn from_class(class: f64) -> Self {
        if class >= 0.5 {
            TrafficLabel::High
        } else {
            TrafficLabel::Low
        }
    }

    /// Display string surfaced to callers
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficLabel::Low => "Low Traffic",
            TrafficLabel::High => "High Traffic",
        }
    }

    /// Inverse of [`TrafficLabel::as_str`]
    pub fn parse_display(value: &str) -> Option<Self> {
        match value {
            "Low Traffic" => Some(TrafficLabel::Low),
            "High Traffic" => Some(TrafficLabel::High),
            _ => None,
        }
    }
}

impl fmt::Display for TrafficLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted label together with the probability of that label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: TrafficLabel,
    pub probability: f64,
}

impl Prediction {
    /// Threshold at which the positive class wins
    pub const THRESHOLD: f64 = 0.5;

    /// Build from the positive-class probability.
    ///
    /// The reported probability is that of the predicted label, so a `Low`
    /// prediction carries `1 - p` and the value never drops below 0.5.
    pub fn from_positive_probability(p: f64) -> Self {
        if p >= Self::THRESHOLD {
            Self { label: TrafficLabel::High, probability: p }
        } else {
            Self { label: TrafficLabel::Low, probability: 1.0 - p }
        }
    }

    pub fn label_str(&self) -> &'static str {
        self.label.as_str()
    }

    /// `(label, probability)` pair for the serving layer
    pub fn as_pair(&self) -> (&'static str, f64) {
        (self.label.as_str(), self.probability)
    }
}
