//! IQR outlier capping
//!
//! Applied offline to the raw dataset before training. Values are clipped into
//! `[Q1 - factor * IQR, Q3 + factor * IQR]`; quantiles use linear interpolation
//! between order statistics. NaN is skipped when computing the quartiles and
//! passes through capping unchanged.

use crate::error::{Result, TrafficError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounds computed for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
    pub q1: f64,
    pub q3: f64,
}

impl OutlierBounds {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Clip into `[lower, upper]`; NaN comes back as NaN
    pub fn clip(&self, v: f64) -> f64 {
        if v < self.lower {
            self.lower
        } else if v > self.upper {
            self.upper
        } else {
            v
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Interquartile-range capper
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IqrCapper {
    factor: f64,
}

impl Default for IqrCapper {
    fn default() -> Self {
        Self { factor: 1.5 }
    }
}

impl IqrCapper {
    pub fn new(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(TrafficError::InvalidParameter {
                name: "factor".to_string(),
                value: factor.to_string(),
                reason: "must be a finite value >= 0".to_string(),
            });
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Compute the capping bounds of a column without modifying it.
    ///
    /// Nulls and NaN are ignored. A column without any other value gets
    /// unbounded limits, and so does a side whose limit is undefined
    /// (an infinite IQR from infinite quartiles).
    pub fn bounds(&self, df: &DataFrame, column: &str) -> Result<OutlierBounds> {
        let values = nullable_f64(df, column)?;
        let mut sorted: Vec<f64> = values.into_iter().flatten().filter(|v| !v.is_nan()).collect();

        if sorted.is_empty() {
            return Ok(OutlierBounds {
                lower: f64::NEG_INFINITY,
                upper: f64::INFINITY,
                q1: f64::NAN,
                q3: f64::NAN,
            });
        }

        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = linear_quantile(&sorted, 0.25);
        let q3 = linear_quantile(&sorted, 0.75);
        let iqr = q3 - q1;

        let lower = q1 - self.factor * iqr;
        let upper = q3 + self.factor * iqr;

        Ok(OutlierBounds {
            lower: if lower.is_nan() { f64::NEG_INFINITY } else { lower },
            upper: if upper.is_nan() { f64::INFINITY } else { upper },
            q1,
            q3,
        })
    }

    /// Clip the column in place and return the bounds used.
    ///
    /// The column comes back as `Float64`; nulls stay null and other columns
    /// are left untouched.
    pub fn cap(&self, df: &mut DataFrame, column: &str) -> Result<OutlierBounds> {
        let bounds = self.bounds(df, column)?;
        let values = nullable_f64(df, column)?;

        let mut clipped_count = 0usize;
        let capped: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| {
                v.map(|x| {
                    let c = bounds.clip(x);
                    if c.to_bits() != x.to_bits() {
                        clipped_count += 1;
                    }
                    c
                })
            })
            .collect();

        df.with_column(Series::new(column.into(), capped))?;

        debug!(
            column,
            lower = bounds.lower,
            upper = bounds.upper,
            clipped = clipped_count,
            "capped outliers"
        );

        Ok(bounds)
    }
}

/// Cap one column with the standard 1.5 × IQR rule
pub fn cap_outliers(df: &mut DataFrame, column: &str) -> Result<OutlierBounds> {
    IqrCapper::default().cap(df, column)
}

fn nullable_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| TrafficError::FeatureNotFound(name.to_string()))?;
    let casted = column.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Quantile of sorted data, interpolating linearly between the two nearest ranks
fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    if frac == 0.0 || sorted[lo] == sorted[hi] {
        // also keeps inf from turning into inf - inf
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_quantile() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((linear_quantile(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((linear_quantile(&sorted, 0.75) - 3.25).abs() < 1e-12);
        assert_eq!(linear_quantile(&[5.0], 0.25), 5.0);
    }

    #[test]
    fn test_iqr_bounds() {
        let df = df!("sugar" => &[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();

        let bounds = IqrCapper::default().bounds(&df, "sugar").unwrap();

        assert_eq!(bounds.q1, 2.0);
        assert_eq!(bounds.q3, 4.0);
        assert_eq!(bounds.lower, -1.0);
        assert_eq!(bounds.upper, 7.0);
    }

    #[test]
    fn test_cap_outliers_clips_in_place() {
        let mut df = df!(
            "sugar" => &[1.0, 2.0, 3.0, 4.0, 100.0],
            "protein" => &[9.0, 9.0, 9.0, 9.0, 900.0]
        )
        .unwrap();

        cap_outliers(&mut df, "sugar").unwrap();

        let sugar: Vec<f64> = df.column("sugar").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(sugar, vec![1.0, 2.0, 3.0, 4.0, 7.0]);

        let protein = df.column("protein").unwrap().f64().unwrap();
        assert_eq!(protein.get(4), Some(900.0));
    }

    #[test]
    fn test_capped_values_within_bounds() {
        let raw: Vec<f64> = (0..50).map(|i| ((i * 37) % 23) as f64 * (i as f64).sqrt()).collect();
        let mut df = df!("calories" => raw).unwrap();

        let capper = IqrCapper::default();
        let before = capper.bounds(&df, "calories").unwrap();
        capper.cap(&mut df, "calories").unwrap();

        for v in df.column("calories").unwrap().f64().unwrap().into_no_null_iter() {
            assert!(before.contains(v), "{} outside [{}, {}]", v, before.lower, before.upper);
        }
    }

    #[test]
    fn test_nulls_stay_null() {
        let mut df = df!("sugar" => &[Some(1.0), None, Some(3.0), Some(50.0)]).unwrap();

        cap_outliers(&mut df, "sugar").unwrap();

        assert_eq!(df.column("sugar").unwrap().null_count(), 1);
    }

    #[test]
    fn test_constant_column_clips_to_single_value() {
        let mut df = df!("servings" => &[4i64, 4, 4]).unwrap();

        let bounds = cap_outliers(&mut df, "servings").unwrap();

        assert_eq!(bounds.lower, 4.0);
        assert_eq!(bounds.upper, 4.0);
        assert_eq!(bounds.iqr(), 0.0);
    }

    #[test]
    fn test_nan_ignored_for_bounds_and_kept() {
        let mut df = df!("sugar" => &[1.0, 2.0, f64::NAN, 3.0, 4.0, 100.0, f64::NAN]).unwrap();
        let clean = df!("sugar" => &[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();

        let expected = IqrCapper::default().bounds(&clean, "sugar").unwrap();
        let bounds = cap_outliers(&mut df, "sugar").unwrap();

        assert_eq!(bounds, expected);
        let sugar: Vec<Option<f64>> = df.column("sugar").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(sugar[4], Some(4.0));
        assert_eq!(sugar[5], Some(7.0));
        assert!(sugar[2].unwrap().is_nan());
        assert!(sugar[6].unwrap().is_nan());
    }

    #[test]
    fn test_mostly_nan_column() {
        let mut df = df!("sugar" => &[1.0, 2.0, 3.0, f64::NAN]).unwrap();

        let bounds = cap_outliers(&mut df, "sugar").unwrap();

        assert_eq!(bounds.q1, 1.5);
        assert_eq!(bounds.q3, 2.5);
        assert_eq!(df.column("sugar").unwrap().f64().unwrap().get(2), Some(3.0));
    }

    #[test]
    fn test_infinite_upper_quartile() {
        let mut df = df!("calories" => &[1.0, 2.0, f64::INFINITY, f64::INFINITY]).unwrap();

        let bounds = cap_outliers(&mut df, "calories").unwrap();

        assert_eq!(bounds.q3, f64::INFINITY);
        assert_eq!(bounds.upper, f64::INFINITY);
        assert!(!bounds.lower.is_nan());
        let calories: Vec<f64> = df.column("calories").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(calories, vec![1.0, 2.0, f64::INFINITY, f64::INFINITY]);
    }

    #[test]
    fn test_all_infinite_column_unbounded() {
        let mut df = df!("calories" => &[f64::INFINITY, f64::INFINITY, f64::INFINITY]).unwrap();

        let bounds = cap_outliers(&mut df, "calories").unwrap();

        assert_eq!(bounds.lower, f64::NEG_INFINITY);
        assert_eq!(bounds.upper, f64::INFINITY);
        assert_eq!(df.column("calories").unwrap().f64().unwrap().get(0), Some(f64::INFINITY));
    }

    #[test]
    fn test_clip_passes_nan_through() {
        let bounds = OutlierBounds { lower: 0.0, upper: 1.0, q1: 0.25, q3: 0.75 };
        assert!(bounds.clip(f64::NAN).is_nan());
        assert_eq!(bounds.clip(-3.0), 0.0);
        assert_eq!(bounds.clip(3.0), 1.0);
    }

    #[test]
    fn test_missing_column() {
        let mut df = df!("sugar" => &[1.0]).unwrap();
        assert!(matches!(
            cap_outliers(&mut df, "fat"),
            Err(TrafficError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_factor() {
        assert!(IqrCapper::new(-1.0).is_err());
        assert_eq!(IqrCapper::new(3.0).unwrap().factor(), 3.0);
    }
}
