//! Descriptive statistics over numeric columns.

use crate::dataset::Table;
use crate::error::{ChurnError, Result};
use ndarray::{Array2, Axis};

/// Count, moments and quartiles of one numeric column.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; NaN for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn summarize(column: &str, values: &[f64]) -> NumericSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    NumericSummary {
        column: column.to_string(),
        count: values.len(),
        mean: mean(values),
        std: std_dev(values),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

/// Summaries of every numeric column, in table order.
pub fn describe(table: &Table) -> Vec<NumericSummary> {
    table
        .columns()
        .iter()
        .filter_map(|c| c.data.as_numeric().map(|v| summarize(&c.name, v)))
        .collect()
}

/// Equal-width bin counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Counts finite values into `bins` equal-width bins over `[min, max]`.
///
/// The last bin includes the maximum. A constant column is centred in a
/// unit-wide range.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram> {
    if bins == 0 {
        return Err(ChurnError::InvalidParameter(
            "histogram needs at least one bin".to_string(),
        ));
    }
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (mut lo, mut hi) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if finite.is_empty() {
        (lo, hi) = (0.0, 1.0);
    } else if lo == hi {
        (lo, hi) = (lo - 0.5, hi + 0.5);
    }

    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Ok(Histogram { edges, counts })
}

/// Pearson correlation of the numeric columns.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

/// A strongly correlated column pair; `drop` is the later column.
#[derive(Clone, Debug, PartialEq)]
pub struct RedundantPair {
    pub keep: String,
    pub drop: String,
    pub r: f64,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[[i, j]])
    }

    /// Pairs with `|r| >= threshold`, upper triangle only.
    pub fn redundant_pairs(&self, threshold: f64) -> Vec<RedundantPair> {
        let k = self.columns.len();
        let mut pairs = Vec::new();
        for i in 0..k {
            for j in (i + 1)..k {
                let r = self.values[[i, j]];
                if r.abs() >= threshold {
                    pairs.push(RedundantPair {
                        keep: self.columns[i].clone(),
                        drop: self.columns[j].clone(),
                        r,
                    });
                }
            }
        }
        pairs
    }

    /// Distinct columns proposed for removal, in column order.
    pub fn redundant_columns(&self, threshold: f64) -> Vec<String> {
        let mut drop: Vec<String> = Vec::new();
        for pair in self.redundant_pairs(threshold) {
            if !drop.contains(&pair.drop) && !drop.contains(&pair.keep) {
                drop.push(pair.drop);
            }
        }
        drop
    }
}

/// Correlates every numeric column with every other.
///
/// Constant columns correlate 0 with everything else.
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let numeric: Vec<(&str, &[f64])> = table
        .columns()
        .iter()
        .filter_map(|c| c.data.as_numeric().map(|v| (c.name.as_str(), v)))
        .collect();
    let n = table.n_rows();
    let k = numeric.len();

    let mut x = Array2::<f64>::zeros((n, k));
    for (j, (_, values)) in numeric.iter().enumerate() {
        let m = mean(values);
        for (i, v) in values.iter().enumerate() {
            x[[i, j]] = v - m;
        }
    }
    let cov = x.t().dot(&x);
    let scale = cov.diag().mapv(f64::sqrt);

    let mut values = Array2::<f64>::eye(k);
    for i in 0..k {
        for j in 0..k {
            if i == j {
                continue;
            }
            let denom = scale[i] * scale[j];
            values[[i, j]] = if denom > 0.0 { cov[[i, j]] / denom } else { 0.0 };
        }
    }
    debug_assert_eq!(values.len_of(Axis(0)), k);

    CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}
