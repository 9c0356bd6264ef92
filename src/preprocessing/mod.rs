//! Data preprocessing module
//!
//! Provides the fitted feature transforms shared by training and inference:
//! - Min-max scaling of numeric columns
//! - One-hot encoding of categorical columns
//! - IQR outlier capping (offline, applied to raw data before training)

mod scaler;
mod encoder;
mod pipeline;
pub mod outlier;

pub use scaler::{MinMaxScaler, ColumnRange};
pub use encoder::{OneHotEncoder, UnknownCategoryPolicy};
pub use pipeline::Preprocessor;
pub use outlier::{IqrCapper, OutlierBounds, cap_outliers};

use crate::error::{Result, TrafficError};
use polars::prelude::*;

/// Read a column as `f64` values, casting integer columns.
///
/// Nulls are rejected: the pipeline does not impute.
pub(crate) fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| TrafficError::FeatureNotFound(name.to_string()))?;
    let casted = column.cast(&DataType::Float64)?;
    let ca = casted.f64()?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                TrafficError::DataError(format!("null value in column {:?} at row {}", name, row))
            })
        })
        .collect()
}
