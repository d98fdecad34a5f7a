//! Core traits for preprocessing transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Used during fitting; has settings and learns from data.
//! - [`FittedTransformer`]: After fitting; ready for inference and serialization.

use crate::error::{ChurnError, Result};
use crate::serialization::SerializableParams;

/// Trait for unfitted transformers.
///
/// A transformer learns parameters (category sets, class labels) from
/// training data and can then transform new data using exactly those
/// parameters.
///
/// # Type Parameters
/// - `Input`: Input data type (typically [`Table`](crate::dataset::Table)).
/// - `Output`: Output data type.
/// - `Params`: Serializable representation of learned parameters.
/// - `Fitted`: The corresponding fitted transformer type.
///
/// # Example
/// ```ignore
/// use churnflow::preprocessing::{ChurnEncoder, Transformer, FittedTransformer};
///
/// let encoder = ChurnEncoder::churn();
/// let fitted = encoder.fit(&train_table)?;
/// let matrix = fitted.transform(&test_table)?;
/// ```
pub trait Transformer: Clone {
    /// Input data type for transformation.
    type Input;
    /// Output data type after transformation.
    type Output;
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer<Params = Self::Params, Input = Self::Input, Output = Self::Output>;

    /// Fit the transformer to the training data.
    ///
    /// # Errors
    /// Returns [`ChurnError`] if:
    /// - Data is empty
    /// - A required column is missing
    /// - Values violate the transformer's contract (e.g. a non-binary label)
    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted>;

    /// Fit the transformer and transform the data in one step.
    fn fit_transform(&self, data: &Self::Input) -> Result<Self::Output> {
        self.fit(data)?.transform(data)
    }
}

/// Trait for fitted transformers ready for inference.
///
/// # Guarantees
/// - `extract_params()` + `from_params()` is a round-trip.
/// - `save_to_file` / `load_from_file` reproduce identical transforms.
pub trait FittedTransformer: Clone {
    /// Input data type for transformation.
    type Input;
    /// Output data type after transformation.
    type Output;
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;

    /// Transform data using learned parameters.
    ///
    /// # Errors
    /// Returns [`ChurnError`] if the input lacks fitted columns or holds
    /// values the fitted parameters cannot represent.
    fn transform(&self, data: &Self::Input) -> Result<Self::Output>;

    /// Extract learned parameters as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted transformer from parameters.
    fn from_params(params: Self::Params) -> Result<Self>
    where
        Self: Sized;

    /// Save the fitted transformer to a file.
    fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let params = self.extract_params();
        let bytes = params
            .to_bytes()
            .map_err(|e| ChurnError::Serialization(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a fitted transformer from a file.
    fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let bytes = std::fs::read(path)?;
        let params = Self::Params::from_bytes(&bytes)
            .map_err(|e| ChurnError::Serialization(e.to_string()))?;
        Self::from_params(params)
    }

    /// Returns the number of input columns seen during fit.
    fn n_features_in(&self) -> usize;
}
