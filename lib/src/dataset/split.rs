//! Seeded train/validation/test partitioning.

use crate::dataset::matrix::FeatureMatrix;
use crate::error::{ChurnError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Seed the churn workflow uses for its split.
pub const DEFAULT_SEED: u64 = 1729;

/// Fractions of rows assigned to training and validation; the rest is test.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitRatios {
    pub train: f64,
    pub validation: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            validation: 0.2,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, validation: f64) -> Result<Self> {
        let ratios = Self { train, validation };
        ratios.validate()?;
        Ok(ratios)
    }

    /// Share left over for the test partition.
    pub fn test(&self) -> f64 {
        1.0 - self.train - self.validation
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !ok(self.train) || !ok(self.validation) || self.train + self.validation > 1.0 + 1e-9 {
            return Err(ChurnError::InvalidParameter(format!(
                "split ratios must be in [0, 1] and sum to at most 1, got train={} validation={}",
                self.train, self.validation
            )));
        }
        Ok(())
    }

    /// Cumulative cut points `(floor(train * n), floor((train + validation) * n))`.
    pub fn cut_points(&self, n: usize) -> (usize, usize) {
        // absorb float error in the cumulative fraction (0.7 + 0.2 < 0.9)
        let cut = |fraction: f64| ((n as f64 * fraction) + 1e-9).floor() as usize;
        let first = cut(self.train).min(n);
        let second = cut(self.train + self.validation).clamp(first, n);
        (first, second)
    }
}

/// Three disjoint row subsets of one feature matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Partitions {
    pub train: FeatureMatrix,
    pub validation: FeatureMatrix,
    pub test: FeatureMatrix,
}

impl Partitions {
    pub fn sizes(&self) -> (usize, usize, usize) {
        (
            self.train.n_rows(),
            self.validation.n_rows(),
            self.test.n_rows(),
        )
    }
}

/// Seeded permutation of `0..n`.
///
/// Identical `(n, seed)` yields an identical order.
pub fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}

/// Shuffles rows with `seed` and cuts the permutation at the ratio cut points.
pub fn split(matrix: &FeatureMatrix, ratios: SplitRatios, seed: u64) -> Result<Partitions> {
    ratios.validate()?;
    let n = matrix.n_rows();
    let order = permutation(n, seed);
    let (first, second) = ratios.cut_points(n);

    tracing::debug!(rows = n, first, second, seed, "splitting feature matrix");

    Ok(Partitions {
        train: matrix.select_rows(&order[..first]),
        validation: matrix.select_rows(&order[first..second]),
        test: matrix.select_rows(&order[second..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn indexed(n: usize) -> FeatureMatrix {
        let values: Vec<f64> = (0..n).flat_map(|i| [(i % 2) as f64, i as f64]).collect();
        FeatureMatrix::from_rows(values, n, vec!["y".into(), "id".into()], true).unwrap()
    }

    fn ids(m: &FeatureMatrix) -> Vec<usize> {
        m.data().column(1).iter().map(|&v| v as usize).collect()
    }

    #[test]
    fn test_cut_points_churn_size() {
        assert_eq!(SplitRatios::default().cut_points(3333), (2333, 2999));
    }

    #[test]
    fn test_cut_points_absorb_float_error() {
        // 10 * (0.7 + 0.2) is 8.999999999999998 in f64
        assert_eq!(SplitRatios::default().cut_points(10), (7, 9));
        assert_eq!(SplitRatios::default().cut_points(0), (0, 0));
    }

    #[test]
    fn test_split_sizes_for_churn_dataset() {
        let parts = split(&indexed(3333), SplitRatios::default(), DEFAULT_SEED).unwrap();
        assert_eq!(parts.sizes(), (2333, 666, 334));
    }

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let m = indexed(200);
        let a = split(&m, SplitRatios::default(), DEFAULT_SEED).unwrap();
        let b = split(&m, SplitRatios::default(), DEFAULT_SEED).unwrap();
        assert_eq!(a, b);

        let c = split(&m, SplitRatios::default(), 7).unwrap();
        assert_ne!(ids(&a.train), ids(&c.train));
    }

    #[test]
    fn test_split_partitions_are_disjoint_and_complete() {
        let parts = split(&indexed(101), SplitRatios::default(), 3).unwrap();
        let mut seen = HashSet::new();
        for part in [&parts.train, &parts.validation, &parts.test] {
            for id in ids(part) {
                assert!(seen.insert(id), "row {} appears twice", id);
            }
        }
        assert_eq!(seen.len(), 101);
    }

    #[test]
    fn test_split_keeps_rows_intact() {
        let parts = split(&indexed(50), SplitRatios::default(), 11).unwrap();
        for row in parts.train.data().rows() {
            assert_eq!(row[0], (row[1] as usize % 2) as f64);
        }
    }

    #[test]
    fn test_split_empty_matrix() {
        let parts = split(&indexed(0), SplitRatios::default(), 1).unwrap();
        assert_eq!(parts.sizes(), (0, 0, 0));
    }

    #[test]
    fn test_invalid_ratios_rejected() {
        assert!(SplitRatios::new(0.8, 0.3).is_err());
        assert!(SplitRatios::new(-0.1, 0.2).is_err());
        assert!(SplitRatios::new(f64::NAN, 0.2).is_err());
        let ok = SplitRatios::new(0.6, 0.4).unwrap();
        assert!(ok.test().abs() < 1e-12);
    }
}
