//! Binary label encoding.
//!
//! One-hot encoding a two-valued target yields two complementary indicator
//! columns. This encoder keeps only the positive-class indicator, giving a
//! single 0/1 column.

use crate::dataset::Table;
use crate::error::{ChurnError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Encodes a binary categorical column to 0/1.
#[derive(Clone, Debug)]
pub struct LabelEncoder {
    column: String,
    positive: Option<String>,
}

impl LabelEncoder {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            positive: None,
        }
    }

    /// Class mapped to 1. Defaults to the greatest observed class.
    pub fn with_positive(mut self, positive: impl Into<String>) -> Self {
        self.positive = Some(positive.into());
        self
    }
}

/// Serializable parameters for a fitted LabelEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoderParams {
    pub column: String,
    /// Sorted classes seen at fit time (one or two).
    pub classes: Vec<String>,
    pub positive: String,
}

/// Fitted LabelEncoder.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedLabelEncoder {
    column: String,
    classes: Vec<String>,
    positive: String,
}

impl FittedLabelEncoder {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn positive(&self) -> &str {
        &self.positive
    }

    /// Name of the encoded column, `"{column}_{positive}"`.
    pub fn output_name(&self) -> String {
        format!("{}_{}", self.column, self.positive)
    }
}

impl Transformer for LabelEncoder {
    type Input = Table;
    type Output = Array1<f64>;
    type Params = LabelEncoderParams;
    type Fitted = FittedLabelEncoder;

    fn fit(&self, data: &Table) -> Result<FittedLabelEncoder> {
        if data.is_empty() {
            return Err(ChurnError::EmptyData(
                "Cannot fit LabelEncoder on empty data".to_string(),
            ));
        }
        let values = data.categorical(&self.column)?;
        let classes: Vec<String> = values
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        if classes.len() > 2 {
            return Err(ChurnError::InvalidParameter(format!(
                "label '{}' must be binary, found {} classes: {:?}",
                self.column,
                classes.len(),
                classes
            )));
        }

        let positive = match &self.positive {
            Some(p) => p.clone(),
            None => classes.last().cloned().unwrap_or_default(),
        };
        if classes.len() == 2 && !classes.contains(&positive) {
            return Err(ChurnError::InvalidParameter(format!(
                "positive class {:?} not among label classes {:?}",
                positive, classes
            )));
        }

        Ok(FittedLabelEncoder {
            column: self.column.clone(),
            classes,
            positive,
        })
    }
}

impl FittedTransformer for FittedLabelEncoder {
    type Input = Table;
    type Output = Array1<f64>;
    type Params = LabelEncoderParams;

    fn transform(&self, data: &Table) -> Result<Array1<f64>> {
        let values = data.categorical(&self.column)?;
        values
            .iter()
            .map(|v| {
                if *v == self.positive {
                    Ok(1.0)
                } else if self.classes.contains(v) {
                    Ok(0.0)
                } else {
                    Err(ChurnError::InvalidParameter(format!(
                        "Unknown label {:?} in column '{}'",
                        v, self.column
                    )))
                }
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    fn extract_params(&self) -> LabelEncoderParams {
        LabelEncoderParams {
            column: self.column.clone(),
            classes: self.classes.clone(),
            positive: self.positive.clone(),
        }
    }

    fn from_params(params: LabelEncoderParams) -> Result<Self> {
        if params.classes.is_empty() || params.classes.len() > 2 {
            return Err(ChurnError::InvalidParameter(format!(
                "label encoder needs one or two classes, got {}",
                params.classes.len()
            )));
        }
        Ok(FittedLabelEncoder {
            column: params.column,
            classes: params.classes,
            positive: params.positive,
        })
    }

    fn n_features_in(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn churn(values: Vec<&str>) -> Table {
        Table::new(vec![Column::categorical("Churn?", values)]).unwrap()
    }

    #[test]
    fn test_label_encoder_default_positive_is_greatest() {
        let fitted = LabelEncoder::new("Churn?")
            .fit(&churn(vec!["False.", "True.", "False."]))
            .unwrap();
        assert_eq!(fitted.positive(), "True.");
        assert_eq!(fitted.output_name(), "Churn?_True.");

        let y = fitted.transform(&churn(vec!["True.", "False."])).unwrap();
        assert_eq!(y.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_label_encoder_explicit_positive() {
        let fitted = LabelEncoder::new("Churn?")
            .with_positive("False.")
            .fit(&churn(vec!["False.", "True."]))
            .unwrap();
        let y = fitted.transform(&churn(vec!["True.", "False."])).unwrap();
        assert_eq!(y.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_label_encoder_rejects_non_binary() {
        let result = LabelEncoder::new("Churn?").fit(&churn(vec!["a", "b", "c"]));
        assert!(matches!(result, Err(ChurnError::InvalidParameter(_))));
    }

    #[test]
    fn test_label_encoder_rejects_foreign_positive() {
        let result = LabelEncoder::new("Churn?")
            .with_positive("Yes")
            .fit(&churn(vec!["False.", "True."]));
        assert!(result.is_err());
    }

    #[test]
    fn test_label_encoder_unknown_label() {
        let fitted = LabelEncoder::new("Churn?")
            .fit(&churn(vec!["False.", "True."]))
            .unwrap();
        assert!(fitted.transform(&churn(vec!["Maybe."])).is_err());
    }

    #[test]
    fn test_label_encoder_single_class_with_positive() {
        let fitted = LabelEncoder::new("Churn?")
            .with_positive("True.")
            .fit(&churn(vec!["False.", "False."]))
            .unwrap();
        let y = fitted.transform(&churn(vec!["False.", "True."])).unwrap();
        assert_eq!(y.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_label_encoder_params_roundtrip() {
        let fitted = LabelEncoder::new("Churn?")
            .fit(&churn(vec!["False.", "True."]))
            .unwrap();
        let restored = FittedLabelEncoder::from_params(fitted.extract_params()).unwrap();
        assert_eq!(restored, fitted);
    }
}
