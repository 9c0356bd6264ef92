//! Hyperparameter search for the random forest
//!
//! Random search over a bounded [`SearchSpace`], each candidate scored by
//! stratified k-fold cross-validation.

mod search_space;
mod tuner;

pub use search_space::{FloatRange, IntRange, SearchSpace};
pub use tuner::{RandomSearchTuner, TrialResult, TuningConfig, TuningReport};
