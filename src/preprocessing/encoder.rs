//! One-hot categorical encoding

use crate::error::{Result, TrafficError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// What to do with a category that was not seen during fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Encode as an all-zero block
    #[default]
    Ignore,
    /// Fail with `UnseenCategory`
    Error,
}

/// Vocabulary memorized for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnVocabulary {
    name: String,
    /// Sorted, deduplicated categories; defines the output column order
    categories: Vec<String>,
}

/// One-hot encoder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<ColumnVocabulary>,
    policy: UnknownCategoryPolicy,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(policy: UnknownCategoryPolicy) -> Self {
        Self {
            vocabularies: Vec::new(),
            policy,
            is_fitted: false,
        }
    }

    /// Fit the encoder to the data, replacing any earlier fit
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut vocabularies = Vec::with_capacity(columns.len());

        for &col_name in columns {
            let values = string_values(df, col_name)?;
            let categories: BTreeSet<String> = values.into_iter().flatten().collect();

            if categories.is_empty() {
                return Err(TrafficError::ValidationError(format!(
                    "cannot fit encoder on column {:?} without values",
                    col_name
                )));
            }

            vocabularies.push(ColumnVocabulary {
                name: col_name.to_string(),
                categories: categories.into_iter().collect(),
            });
        }

        self.vocabularies = vocabularies;
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode every fitted column; one 0/1 vector per output feature, in
    /// [`OneHotEncoder::feature_names`] order
    pub fn transform_columns(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        if !self.is_fitted {
            return Err(TrafficError::Unfitted);
        }

        let mut output = Vec::with_capacity(self.n_features());

        for vocab in &self.vocabularies {
            let values = string_values(df, &vocab.name)?;
            let index: HashMap<&str, usize> = vocab
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();

            let mut block = vec![vec![0.0; values.len()]; vocab.categories.len()];

            for (row, value) in values.iter().enumerate() {
                match value.as_deref().and_then(|v| index.get(v)) {
                    Some(&cat_idx) => block[cat_idx][row] = 1.0,
                    None => {
                        let shown = value.clone().unwrap_or_else(|| "null".to_string());
                        match self.policy {
                            UnknownCategoryPolicy::Ignore => {
                                debug!(column = %vocab.name, value = %shown, "unseen category encoded as zeros");
                            }
                            UnknownCategoryPolicy::Error => {
                                return Err(TrafficError::UnseenCategory {
                                    column: vocab.name.clone(),
                                    value: shown,
                                });
                            }
                        }
                    }
                }
            }

            output.extend(block);
        }

        Ok(output)
    }

    /// Transform the data frame: each fitted column is replaced by its one-hot columns
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let encoded = self.transform_columns(df)?;

        let mut result = df.clone();
        for vocab in &self.vocabularies {
            result = result.drop(&vocab.name)?;
        }
        for (name, values) in self.feature_names().into_iter().zip(encoded) {
            result.with_column(Series::new(name.into(), values))?;
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Output feature names as `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| v.categories.iter().map(move |c| format!("{}_{}", v.name, c)))
            .collect()
    }

    pub fn n_features(&self) -> usize {
        self.vocabularies.iter().map(|v| v.categories.len()).sum()
    }

    /// Fitted vocabulary of a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.vocabularies
            .iter()
            .find(|v| v.name == column)
            .map(|v| v.categories.as_slice())
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| TrafficError::FeatureNotFound(name.to_string()))?;
    let casted = column.cast(&DataType::String)?;
    let ca = casted.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}
