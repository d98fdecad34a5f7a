//! One-hot encoding for categorical columns.
//!
//! Expands each categorical column into indicator columns, one per category
//! observed at fit time, sorted by category value.

use crate::dataset::{FeatureMatrix, Table};
use crate::error::{ChurnError, Result};
use crate::preprocessing::encoding::HandleUnknown;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder for categorical table columns.
///
/// # Example
/// ```ignore
/// // State column: ["KS", "OH", "KS"]
/// let encoder = OneHotEncoder::new().with_columns(vec!["State".into()]);
/// let encoded = encoder.fit_transform(&table)?;
/// // columns: ["State_KS", "State_OH"]
/// // [[1, 0],
/// //  [0, 1],
/// //  [1, 0]]
/// ```
#[derive(Clone, Debug, Default)]
pub struct OneHotEncoder {
    /// Columns to encode; `None` means every categorical column, in table order.
    columns: Option<Vec<String>>,
    /// How to handle unknown categories during transform.
    handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    /// Create a new OneHotEncoder that encodes all categorical columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict encoding to the named columns, in the given order.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Set the strategy for handling unknown categories.
    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.handle_unknown = strategy;
        self
    }
}

/// Serializable parameters for a fitted OneHotEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoderParams {
    /// Encoded columns, in output order.
    pub columns: Vec<String>,
    /// Sorted, unique categories for each column.
    pub categories: Vec<Vec<String>>,
    /// Handle unknown strategy.
    pub handle_unknown: HandleUnknown,
}

/// Fitted OneHotEncoder ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedOneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
    n_features_out: usize,
    handle_unknown: HandleUnknown,
}

impl FittedOneHotEncoder {
    /// Get the categories learned for each column.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Get the encoded column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the number of output indicator columns.
    pub fn n_features_out(&self) -> usize {
        self.n_features_out
    }

    /// Output column names, `"{column}_{category}"`.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, cats)| cats.iter().map(move |cat| format!("{}_{}", column, cat)))
            .collect()
    }
}

impl Transformer for OneHotEncoder {
    type Input = Table;
    type Output = FeatureMatrix;
    type Params = OneHotEncoderParams;
    type Fitted = FittedOneHotEncoder;

    fn fit(&self, data: &Table) -> Result<FittedOneHotEncoder> {
        if data.is_empty() {
            return Err(ChurnError::EmptyData(
                "Cannot fit OneHotEncoder on empty data".to_string(),
            ));
        }

        let columns: Vec<String> = match &self.columns {
            Some(columns) => columns.clone(),
            None => data
                .columns()
                .iter()
                .filter(|c| c.data.as_categorical().is_some())
                .map(|c| c.name.clone())
                .collect(),
        };

        let mut categories = Vec::with_capacity(columns.len());
        for column in &columns {
            let values = data.categorical(column)?;
            let unique: BTreeSet<&str> = values.iter().map(String::as_str).collect();
            categories.push(unique.into_iter().map(str::to_string).collect::<Vec<_>>());
        }

        Ok(FittedOneHotEncoder {
            n_features_out: categories.iter().map(Vec::len).sum(),
            columns,
            categories,
            handle_unknown: self.handle_unknown,
        })
    }
}

impl FittedTransformer for FittedOneHotEncoder {
    type Input = Table;
    type Output = FeatureMatrix;
    type Params = OneHotEncoderParams;

    fn transform(&self, data: &Table) -> Result<FeatureMatrix> {
        let rows = data.n_rows();
        let mut result = Array2::<f64>::zeros((rows, self.n_features_out));

        let mut offset = 0;
        for (column, cats) in self.columns.iter().zip(&self.categories) {
            let values = data.categorical(column)?;
            for (row, value) in values.iter().enumerate() {
                match cats.binary_search_by(|c| c.as_str().cmp(value.as_str())) {
                    Ok(idx) => result[[row, offset + idx]] = 1.0,
                    Err(_) if self.handle_unknown == HandleUnknown::Error => {
                        return Err(ChurnError::InvalidParameter(format!(
                            "Unknown category {:?} in column '{}'",
                            value, column
                        )));
                    }
                    // With Ignore, leave the group as zeros
                    Err(_) => {}
                }
            }
            offset += cats.len();
        }

        FeatureMatrix::new(result, self.feature_names(), false)
    }

    fn extract_params(&self) -> OneHotEncoderParams {
        OneHotEncoderParams {
            columns: self.columns.clone(),
            categories: self.categories.clone(),
            handle_unknown: self.handle_unknown,
        }
    }

    fn from_params(params: OneHotEncoderParams) -> Result<Self> {
        if params.columns.len() != params.categories.len() {
            return Err(ChurnError::InvalidShape {
                expected: format!("{} category lists", params.columns.len()),
                got: format!("{}", params.categories.len()),
            });
        }
        for (column, cats) in params.columns.iter().zip(&params.categories) {
            if cats.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ChurnError::InvalidParameter(format!(
                    "categories for '{}' must be sorted and unique",
                    column
                )));
            }
        }
        Ok(FittedOneHotEncoder {
            n_features_out: params.categories.iter().map(Vec::len).sum(),
            columns: params.columns,
            categories: params.categories,
            handle_unknown: params.handle_unknown,
        })
    }

    fn n_features_in(&self) -> usize {
        self.columns.len()
    }
}
