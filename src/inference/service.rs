//! Long-lived prediction service with hot model reloads

use super::engine::TrafficModel;
use crate::error::Result;
use crate::recipe::{Prediction, Recipe};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Model bundle written by [`TrafficModel::save`]
    pub model_path: PathBuf,
}

impl ServiceConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self { model_path: model_path.into() }
    }
}

/// Serves predictions from an immutable model snapshot.
///
/// Each prediction clones the current `Arc` under a short read lock, so a
/// reload never blocks or disturbs requests already in flight.
pub struct PredictionService {
    config: ServiceConfig,
    model: RwLock<Arc<TrafficModel>>,
}

impl PredictionService {
    /// Load the configured bundle; fails instead of starting without a model
    pub fn start(config: ServiceConfig) -> Result<Self> {
        let model = TrafficModel::from_file(&config.model_path)?;
        info!(path = %config.model_path.display(), "prediction service started");

        Ok(Self {
            config,
            model: RwLock::new(Arc::new(model)),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Current model
    pub fn snapshot(&self) -> Arc<TrafficModel> {
        Arc::clone(&self.model.read())
    }

    pub fn predict(&self, recipe: &Recipe) -> Result<Prediction> {
        self.snapshot().predict_recipe(recipe)
    }

    pub fn predict_batch(&self, recipes: &[Recipe]) -> Result<Vec<Prediction>> {
        self.snapshot().predict_batch(recipes)
    }

    /// Re-read the bundle and swap it in. On failure the old model stays.
    pub fn reload(&self) -> Result<()> {
        match TrafficModel::from_file(&self.config.model_path) {
            Ok(model) => {
                *self.model.write() = Arc::new(model);
                info!(path = %self.config.model_path.display(), "model reloaded");
                Ok(())
            }
            Err(e) => {
                warn!(
                    path = %self.config.model_path.display(),
                    error = %e,
                    "reload failed, keeping current model"
                );
                Err(e)
            }
        }
    }
}
