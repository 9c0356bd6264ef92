//! Min-max feature scaling

use crate::error::{Result, TrafficError};
use super::column_f64;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Training range memorized for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    /// Divisor used when scaling; a constant column scales by 1 so it maps to 0
    fn scale(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 { 1.0 } else { range }
    }

    fn apply(&self, v: f64) -> f64 {
        (v - self.min) / self.scale()
    }
}

/// Min-Max scaler: (x - min) / (max - min), per column.
///
/// Values outside the training range are not clipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    ranges: Vec<ColumnRange>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to the given columns, replacing any earlier fit
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut ranges = Vec::with_capacity(columns.len());

        for &col_name in columns {
            let values = column_f64(df, col_name)?;
            if values.is_empty() {
                return Err(TrafficError::ValidationError(format!(
                    "cannot fit scaler on empty column {:?}",
                    col_name
                )));
            }

            let (min, max) = values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

            if min == max {
                warn!(column = col_name, value = min, "constant column, scaled values will be 0");
            }

            ranges.push(ColumnRange { name: col_name.to_string(), min, max });
        }

        self.ranges = ranges;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale every fitted column; one output vector per column, in fit order
    pub fn transform_columns(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        if !self.is_fitted {
            return Err(TrafficError::Unfitted);
        }

        self.ranges
            .iter()
            .map(|range| {
                let values = column_f64(df, &range.name)?;
                Ok(values.into_iter().map(|v| range.apply(v)).collect())
            })
            .collect()
    }

    /// Transform the data frame, replacing each fitted column with its scaled version
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let scaled = self.transform_columns(df)?;

        let mut result = df.clone();
        for (range, values) in self.ranges.iter().zip(scaled) {
            result.with_column(Series::new(range.name.as_str().into(), values))?;
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
