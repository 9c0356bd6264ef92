//! Fitted feature pipeline shared by training and serving

use crate::error::{Result, TrafficError};
use super::{
    encoder::{OneHotEncoder, UnknownCategoryPolicy},
    scaler::MinMaxScaler,
};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Min-max scaler over the numeric columns plus one-hot encoder over the
/// categorical columns.
///
/// Output columns are the scaled numeric columns in the order given to
/// [`Preprocessor::fit`], followed by the one-hot blocks of each categorical
/// column in vocabulary order. The layout is fixed once fitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preprocessor {
    scaler: MinMaxScaler,
    encoder: OneHotEncoder,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl Preprocessor {
    pub fn new(policy: UnknownCategoryPolicy) -> Self {
        Self {
            encoder: OneHotEncoder::new(policy),
            ..Self::default()
        }
    }

    /// Fit both transforms; any earlier fit is discarded
    pub fn fit(
        &mut self,
        df: &DataFrame,
        numeric_columns: &[&str],
        categorical_columns: &[&str],
    ) -> Result<&mut Self> {
        if numeric_columns.is_empty() && categorical_columns.is_empty() {
            return Err(TrafficError::ValidationError(
                "preprocessor needs at least one feature column".to_string(),
            ));
        }
        if df.height() == 0 {
            return Err(TrafficError::ValidationError(
                "cannot fit preprocessor on an empty frame".to_string(),
            ));
        }

        self.is_fitted = false;

        let mut scaler = MinMaxScaler::new();
        scaler.fit(df, numeric_columns)?;

        let mut encoder = OneHotEncoder::new(self.encoder.policy());
        encoder.fit(df, categorical_columns)?;

        let mut feature_names: Vec<String> = numeric_columns.iter().map(|c| c.to_string()).collect();
        feature_names.extend(encoder.feature_names());

        debug!(
            rows = df.height(),
            numeric = numeric_columns.len(),
            encoded = encoder.n_features(),
            "fitted preprocessor"
        );

        self.scaler = scaler;
        self.encoder = encoder;
        self.numeric_columns = numeric_columns.iter().map(|c| c.to_string()).collect();
        self.categorical_columns = categorical_columns.iter().map(|c| c.to_string()).collect();
        self.feature_names = feature_names;
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a frame into the model matrix, one row per input row
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(TrafficError::Unfitted);
        }

        let mut columns = self.scaler.transform_columns(df)?;
        columns.extend(self.encoder.transform_columns(df)?);

        if columns.len() != self.feature_names.len() {
            return Err(TrafficError::ShapeError {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", columns.len()),
            });
        }

        let n_rows = df.height();
        let n_cols = columns.len();
        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| columns[c][r]))
    }

    pub fn fit_transform(
        &mut self,
        df: &DataFrame,
        numeric_columns: &[&str],
        categorical_columns: &[&str],
    ) -> Result<Array2<f64>> {
        self.fit(df, numeric_columns, categorical_columns)?;
        self.transform(df)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
