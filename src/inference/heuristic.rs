//! Fixed-weight traffic scorer
//!
//! A baseline that needs no training data: a weighted sum of the raw
//! nutrition facts and servings, clipped into `[0, 1]` and read as the
//! probability of high traffic.

use crate::error::Result;
use crate::recipe::{Prediction, Recipe};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Linear score over raw recipe features. Calories and category are not used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicScorer {
    pub protein: f64,
    pub carbohydrate: f64,
    pub sugar: f64,
    pub servings: f64,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            protein: 0.4,
            carbohydrate: 0.3,
            sugar: -0.2,
            servings: 0.1,
        }
    }
}

impl HeuristicScorer {
    pub fn new(protein: f64, carbohydrate: f64, sugar: f64, servings: f64) -> Self {
        Self {
            protein,
            carbohydrate,
            sugar,
            servings,
        }
    }

    /// Weighted sum clipped into `[0, 1]`
    pub fn score(&self, recipe: &Recipe) -> f64 {
        let raw = recipe.protein * self.protein
            + recipe.carbohydrate * self.carbohydrate
            + recipe.sugar * self.sugar
            + recipe.servings as f64 * self.servings;
        raw.clamp(0.0, 1.0)
    }

    /// Validate the recipe and label its score like a classifier probability
    pub fn predict(&self, recipe: &Recipe) -> Result<Prediction> {
        recipe.validate()?;
        let score = self.score(recipe);
        debug!(score, "heuristic traffic score");
        Ok(Prediction::from_positive_probability(score))
    }

    pub fn predict_batch(&self, recipes: &[Recipe]) -> Result<Vec<Prediction>> {
        recipes.iter().map(|r| self.predict(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrafficError;
    use crate::recipe::TrafficLabel;

    #[test]
    fn test_protein_rich_recipe_saturates() {
        let recipe = Recipe::new(250.0, 45.0, 18.0, 12.0, "Dessert", 4);

        let prediction = HeuristicScorer::default().predict(&recipe).unwrap();

        assert_eq!(prediction.as_pair(), ("High Traffic", 1.0));
    }

    #[test]
    fn test_sugar_pulls_score_to_zero() {
        let recipe = Recipe::new(100.0, 0.0, 20.0, 0.0, "Beverages", 1);
        let scorer = HeuristicScorer::default();

        assert_eq!(scorer.score(&recipe), 0.0);
        let prediction = scorer.predict(&recipe).unwrap();
        assert_eq!(prediction.label, TrafficLabel::Low);
        assert_eq!(prediction.probability, 1.0);
    }

    #[test]
    fn test_score_between_bounds() {
        let recipe = Recipe::new(80.0, 0.0, 0.0, 0.5, "Vegetable", 1);
        let scorer = HeuristicScorer::default();

        assert!((scorer.score(&recipe) - 0.3).abs() < 1e-12);
        let prediction = scorer.predict(&recipe).unwrap();
        assert_eq!(prediction.label, TrafficLabel::Low);
        assert!((prediction.probability - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_custom_weights() {
        let recipe = Recipe::new(0.0, 0.0, 0.0, 0.0, "Pork", 6);
        let scorer = HeuristicScorer::new(0.0, 0.0, 0.0, 0.1);

        assert!((scorer.score(&recipe) - 0.6).abs() < 1e-12);
        assert_eq!(scorer.predict(&recipe).unwrap().label, TrafficLabel::High);
    }

    #[test]
    fn test_invalid_recipe_rejected() {
        let scorer = HeuristicScorer::default();
        let recipes = [
            Recipe::new(250.0, 45.0, 18.0, 12.0, "Dessert", 4),
            Recipe::new(250.0, -45.0, 18.0, 12.0, "Dessert", 4),
        ];

        assert!(matches!(
            scorer.predict_batch(&recipes),
            Err(TrafficError::InvalidParameter { .. })
        ));
        assert_eq!(scorer.predict_batch(&recipes[..1]).unwrap().len(), 1);
    }
}
