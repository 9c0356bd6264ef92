//! Prediction
//!
//! [`TrafficModel`] pairs a fitted preprocessor with a classifier and turns
//! recipes into [`Prediction`](crate::recipe::Prediction)s.
//! [`PredictionService`] wraps a loaded model for a long-running process and
//! supports swapping in a new bundle without interrupting requests.
//! [`HeuristicScorer`] is a fixed-weight baseline that needs no training.

mod engine;
mod heuristic;
mod service;

pub use engine::{Evaluation, TrafficModel};
pub use heuristic::HeuristicScorer;
pub use service::{PredictionService, ServiceConfig};
