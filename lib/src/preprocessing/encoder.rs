//! Table-to-matrix encoder for the churn workflow.
//!
//! Layout of the produced matrix:
//!
//! | position | columns                                                  |
//! |----------|----------------------------------------------------------|
//! | 0        | label indicator (`Churn?_True.`), only when labelled     |
//! | next     | numeric columns, in table order                          |
//! | rest     | one indicator per category, grouped by column, sorted    |
//!
//! The fitted encoder is the encoding schema: persist it next to the training
//! files and reapply it to scoring data instead of refitting, so the column
//! set and order cannot drift between training and inference.

use crate::dataset::{FeatureMatrix, Table, CHURN_LABEL, CHURN_POSITIVE};
use crate::error::{ChurnError, Result};
use crate::preprocessing::encoding::{
    FittedLabelEncoder, FittedOneHotEncoder, HandleUnknown, LabelEncoder, LabelEncoderParams,
    OneHotEncoder, OneHotEncoderParams,
};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{concatenate, s, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Unfitted encoder: which column is the label and how to treat unknowns.
#[derive(Clone, Debug, Default)]
pub struct ChurnEncoder {
    label: Option<String>,
    positive: Option<String>,
    handle_unknown: HandleUnknown,
}

impl ChurnEncoder {
    /// Encoder with no label column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder for the churn file: label `Churn?`, positive class `True.`.
    pub fn churn() -> Self {
        Self::new()
            .with_label(CHURN_LABEL)
            .with_positive(CHURN_POSITIVE)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_positive(mut self, positive: impl Into<String>) -> Self {
        self.positive = Some(positive.into());
        self
    }

    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.handle_unknown = strategy;
        self
    }
}

/// Serializable encoding schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodingSchema {
    /// Numeric pass-through columns, in output order.
    pub numeric: Vec<String>,
    pub one_hot: OneHotEncoderParams,
    pub label: Option<LabelEncoderParams>,
}

/// Fitted encoder; reapplies one fixed schema to any table.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedChurnEncoder {
    numeric: Vec<String>,
    one_hot: FittedOneHotEncoder,
    label: Option<FittedLabelEncoder>,
}

impl FittedChurnEncoder {
    pub fn label(&self) -> Option<&FittedLabelEncoder> {
        self.label.as_ref()
    }

    pub fn one_hot(&self) -> &FittedOneHotEncoder {
        &self.one_hot
    }

    /// Feature column names, label excluded.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric.clone();
        names.extend(self.one_hot.feature_names());
        names
    }

    /// Number of model inputs (feature columns, label excluded).
    pub fn n_features_out(&self) -> usize {
        self.numeric.len() + self.one_hot.n_features_out()
    }

    /// Encodes feature columns only; the label column may be absent.
    pub fn transform_features(&self, data: &Table) -> Result<FeatureMatrix> {
        let rows = data.n_rows();
        let n_numeric = self.numeric.len();
        let mut out = Array2::<f64>::zeros((rows, self.n_features_out()));

        for (j, name) in self.numeric.iter().enumerate() {
            let values = data.numeric(name)?;
            out.column_mut(j).assign(&ArrayView1::from(values));
        }

        let indicators = self.one_hot.transform(data)?;
        out.slice_mut(s![.., n_numeric..])
            .assign(&indicators.data());

        FeatureMatrix::new(out, self.feature_names(), false)
    }
}

impl Transformer for ChurnEncoder {
    type Input = Table;
    type Output = FeatureMatrix;
    type Params = EncodingSchema;
    type Fitted = FittedChurnEncoder;

    fn fit(&self, data: &Table) -> Result<FittedChurnEncoder> {
        if data.is_empty() {
            return Err(ChurnError::EmptyData(
                "Cannot fit encoder on empty table".to_string(),
            ));
        }

        let label = match &self.label {
            Some(column) => {
                let mut encoder = LabelEncoder::new(column.clone());
                if let Some(positive) = &self.positive {
                    encoder = encoder.with_positive(positive.clone());
                }
                Some(encoder.fit(data)?)
            }
            None => None,
        };
        let is_label = |name: &str| self.label.as_deref() == Some(name);

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for column in data.columns() {
            if is_label(&column.name) {
                continue;
            }
            if column.data.as_numeric().is_some() {
                numeric.push(column.name.clone());
            } else {
                categorical.push(column.name.clone());
            }
        }

        let one_hot = OneHotEncoder::new()
            .with_columns(categorical)
            .with_handle_unknown(self.handle_unknown)
            .fit(data)?;

        tracing::debug!(
            numeric = numeric.len(),
            indicators = one_hot.n_features_out(),
            "fitted encoding schema"
        );

        Ok(FittedChurnEncoder {
            numeric,
            one_hot,
            label,
        })
    }
}

impl FittedTransformer for FittedChurnEncoder {
    type Input = Table;
    type Output = FeatureMatrix;
    type Params = EncodingSchema;

    /// Encodes features and, when the encoder has a label, puts the 0/1
    /// label in column 0. Errors if the label column is missing.
    fn transform(&self, data: &Table) -> Result<FeatureMatrix> {
        let features = self.transform_features(data)?;
        let Some(label) = &self.label else {
            return Ok(features);
        };

        let y = label.transform(data)?;
        let matrix = concatenate(
            Axis(1),
            &[y.view().insert_axis(Axis(1)), features.data()],
        )?;

        let mut columns = Vec::with_capacity(matrix.ncols());
        columns.push(label.output_name());
        columns.extend(features.columns().iter().cloned());
        FeatureMatrix::new(matrix, columns, true)
    }

    fn extract_params(&self) -> EncodingSchema {
        EncodingSchema {
            numeric: self.numeric.clone(),
            one_hot: self.one_hot.extract_params(),
            label: self.label.as_ref().map(|l| l.extract_params()),
        }
    }

    fn from_params(params: EncodingSchema) -> Result<Self> {
        Ok(FittedChurnEncoder {
            numeric: params.numeric,
            one_hot: FittedOneHotEncoder::from_params(params.one_hot)?,
            label: params
                .label
                .map(FittedLabelEncoder::from_params)
                .transpose()?,
        })
    }

    fn n_features_in(&self) -> usize {
        self.numeric.len() + self.one_hot.n_features_in()
    }
}
