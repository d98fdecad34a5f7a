//! Numeric feature matrix produced by the encoder.

use crate::error::{ChurnError, Result};
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use std::ops::Range;

/// Encoded, numeric-only rows with named columns.
///
/// When `has_label` is set, column 0 is the 0/1 churn label. Serialized
/// copies carry neither header nor row index, so the column order is the only
/// link back to the encoding schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
    columns: Vec<String>,
    has_label: bool,
}

impl FeatureMatrix {
    pub fn new(data: Array2<f64>, columns: Vec<String>, has_label: bool) -> Result<Self> {
        if data.ncols() != columns.len() {
            return Err(ChurnError::InvalidShape {
                expected: format!("{} named columns", columns.len()),
                got: format!("{} matrix columns", data.ncols()),
            });
        }
        if has_label && columns.is_empty() {
            return Err(ChurnError::InvalidParameter(
                "a labelled matrix needs at least the label column".to_string(),
            ));
        }
        Ok(Self {
            data,
            columns,
            has_label,
        })
    }

    /// Builds a matrix from a flat row-major buffer.
    pub fn from_rows(
        values: Vec<f64>,
        n_rows: usize,
        columns: Vec<String>,
        has_label: bool,
    ) -> Result<Self> {
        let data = Array2::from_shape_vec((n_rows, columns.len()), values)?;
        Self::new(data, columns, has_label)
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    /// Number of model inputs, i.e. columns excluding the label.
    pub fn n_features(&self) -> usize {
        self.n_columns() - usize::from(self.has_label)
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn has_label(&self) -> bool {
        self.has_label
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// The label column, if present.
    pub fn labels(&self) -> Option<ArrayView1<'_, f64>> {
        self.has_label.then(|| self.data.column(0))
    }

    /// Copy of the matrix with the label column stripped.
    pub fn without_label(&self) -> FeatureMatrix {
        if !self.has_label {
            return self.clone();
        }
        FeatureMatrix {
            data: self.data.slice(s![.., 1..]).to_owned(),
            columns: self.columns[1..].to_vec(),
            has_label: false,
        }
    }

    /// Rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            data: self.data.select(Axis(0), indices),
            columns: self.columns.clone(),
            has_label: self.has_label,
        }
    }

    /// Contiguous row slice.
    pub fn slice_rows(&self, range: Range<usize>) -> FeatureMatrix {
        FeatureMatrix {
            data: self.data.slice(s![range, ..]).to_owned(),
            columns: self.columns.clone(),
            has_label: self.has_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labelled() -> FeatureMatrix {
        FeatureMatrix::new(
            array![[1.0, 10.0, 0.0], [0.0, 20.0, 1.0], [1.0, 30.0, 0.0]],
            vec!["y".into(), "a".into(), "b".into()],
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_label_and_features() {
        let m = labelled();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_columns(), 3);
        assert_eq!(m.n_features(), 2);
        assert_eq!(m.labels().unwrap().to_vec(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_without_label() {
        let m = labelled().without_label();
        assert!(!m.has_label());
        assert_eq!(m.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(m.data().row(1).to_vec(), vec![20.0, 1.0]);
        assert!(m.labels().is_none());
        assert_eq!(m.without_label(), m);
    }

    #[test]
    fn test_select_and_slice_rows() {
        let m = labelled();
        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.data().column(1).to_vec(), vec![30.0, 10.0]);
        let sliced = m.slice_rows(1..3);
        assert_eq!(sliced.n_rows(), 2);
        assert_eq!(sliced.data().column(1).to_vec(), vec![20.0, 30.0]);
        assert_eq!(m.select_rows(&[]).n_rows(), 0);
    }

    #[test]
    fn test_new_rejects_name_mismatch() {
        let result = FeatureMatrix::new(array![[1.0, 2.0]], vec!["only".into()], false);
        assert!(matches!(result, Err(ChurnError::InvalidShape { .. })));
    }

    #[test]
    fn test_from_rows_rejects_bad_buffer() {
        let result = FeatureMatrix::from_rows(vec![1.0, 2.0, 3.0], 2, vec!["a".into(), "b".into()], false);
        assert!(result.is_err());
    }
}
