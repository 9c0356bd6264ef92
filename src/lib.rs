//! Tasty Traffic - recipe traffic prediction
//!
//! Predicts whether a recipe featured on the homepage will drive high
//! traffic, from its nutrition facts, category and servings.
//!
//! # Modules
//!
//! ## Core
//! - [`recipe`] - Recipe records, traffic labels and predictions
//! - [`preprocessing`] - IQR outlier capping, min-max scaling, one-hot encoding
//! - [`training`] - Random forest / decision tree training, stratified splits, metrics
//! - [`optimizer`] - Random search over forest hyperparameters
//!
//! ## Serving
//! - [`export`] - Single-file model bundles
//! - [`inference`] - Traffic model, heuristic baseline and the hot-reloadable prediction service
//!
//! ## Utilities
//! - [`utils`] - CSV loading
//!
//! # Example
//!
//! ```no_run
//! use tasty_traffic::prelude::*;
//!
//! # fn main() -> tasty_traffic::Result<()> {
//! let mut df = DataLoader::new().load_csv("recipe_site_traffic.csv")?;
//! for column in ["calories", "carbohydrate", "sugar", "protein"] {
//!     cap_outliers(&mut df, column)?;
//! }
//!
//! let mut model = TrafficModel::new(TrainingConfig::default());
//! let report = model.train(&df, &["recipe"], "high_traffic", 0.2)?;
//! println!("{}", report);
//!
//! model.save("traffic.bin")?;
//! let prediction = model.predict_traffic_increase(250.0, 45.0, 18.0, 12.0, "Dessert", 4)?;
//! println!("{} ({:.2})", prediction.label_str(), prediction.probability);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Core ML modules
pub mod recipe;
pub mod preprocessing;
pub mod training;
pub mod optimizer;

// Serving
pub mod export;
pub mod inference;

// Utilities
pub mod utils;

pub use error::{Result, TrafficError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TrafficError};

    // Domain
    pub use crate::recipe::{Prediction, Recipe, TrafficLabel};

    // Preprocessing
    pub use crate::preprocessing::{cap_outliers, IqrCapper, Preprocessor, UnknownCategoryPolicy};

    // Training
    pub use crate::training::{
        Classifier, ClassifierSpec, CvPreprocessing, ForestParams, Metric, MetricsReport,
        RandomForest, TrainEngine, TrainedClassifier, TrainingConfig,
    };

    // Optimization
    pub use crate::optimizer::{RandomSearchTuner, SearchSpace, TuningConfig};

    // Serving
    pub use crate::inference::{Evaluation, HeuristicScorer, PredictionService, ServiceConfig, TrafficModel};

    // Utilities
    pub use crate::utils::DataLoader;
}
