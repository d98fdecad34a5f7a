//! Evaluation of endpoint predictions against held-out labels.
//!
//! Churn is scored as a probability; a cutoff turns it into a decision. The
//! cost matrix prices each outcome and [`optimal_cutoff`] sweeps cutoffs for
//! the cheapest one.

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    /// Predicts churn where `probability > cutoff`; `actual` holds 0/1.
    pub fn at_cutoff(actual: &[f64], predicted: &[f64], cutoff: f64) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(ChurnError::InvalidShape {
                expected: format!("{} predictions", actual.len()),
                got: format!("{}", predicted.len()),
            });
        }
        let mut cm = ConfusionMatrix::default();
        for (&y, &p) in actual.iter().zip(predicted) {
            match (y > 0.5, p > cutoff) {
                (false, false) => cm.true_negatives += 1,
                (false, true) => cm.false_positives += 1,
                (true, false) => cm.false_negatives += 1,
                (true, true) => cm.true_positives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negatives + self.true_positives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>8} {:>8}", "actual", "pred 0", "pred 1")?;
        writeln!(f, "{:>10} {:>8} {:>8}", 0, self.true_negatives, self.false_positives)?;
        write!(f, "{:>10} {:>8} {:>8}", 1, self.false_negatives, self.true_positives)
    }
}

/// Price of each outcome.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostMatrix {
    pub true_negative: f64,
    /// Retention incentive spent on a customer who would have stayed.
    pub false_positive: f64,
    /// Customer lost without an offer.
    pub false_negative: f64,
    /// Incentive spent on a customer who is retained.
    pub true_positive: f64,
}

impl Default for CostMatrix {
    fn default() -> Self {
        Self {
            true_negative: 0.0,
            false_positive: 100.0,
            false_negative: 500.0,
            true_positive: 100.0,
        }
    }
}

impl CostMatrix {
    pub fn cost(&self, cm: &ConfusionMatrix) -> f64 {
        self.true_negative * cm.true_negatives as f64
            + self.false_positive * cm.false_positives as f64
            + self.false_negative * cm.false_negatives as f64
            + self.true_positive * cm.true_positives as f64
    }
}

/// Total cost at every cutoff from 0.01 to 0.99.
#[derive(Clone, Debug, PartialEq)]
pub struct CutoffSweep {
    pub cutoffs: Vec<f64>,
    pub costs: Vec<f64>,
    /// Cheapest cutoff; the lowest one wins ties.
    pub best_cutoff: f64,
    pub best_cost: f64,
}

pub fn optimal_cutoff(actual: &[f64], predicted: &[f64], costs: &CostMatrix) -> Result<CutoffSweep> {
    if actual.is_empty() {
        return Err(ChurnError::EmptyData(
            "no predictions to evaluate".to_string(),
        ));
    }
    let cutoffs: Vec<f64> = (1..100).map(|i| i as f64 / 100.0).collect();
    let totals = cutoffs
        .iter()
        .map(|&c| Ok(costs.cost(&ConfusionMatrix::at_cutoff(actual, predicted, c)?)))
        .collect::<Result<Vec<f64>>>()?;

    let (best, best_cost) = totals
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(bi, bc), (i, &c)| if c < bc { (i, c) } else { (bi, bc) });

    Ok(CutoffSweep {
        best_cutoff: cutoffs[best],
        best_cost,
        cutoffs,
        costs: totals,
    })
}

/// Summary of one scored test partition.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// At cutoff 0.5.
    pub confusion: ConfusionMatrix,
    pub sweep: CutoffSweep,
    /// At the cheapest cutoff.
    pub best_confusion: ConfusionMatrix,
}

pub fn evaluate(actual: &[f64], predicted: &[f64], costs: &CostMatrix) -> Result<Evaluation> {
    let confusion = ConfusionMatrix::at_cutoff(actual, predicted, 0.5)?;
    let sweep = optimal_cutoff(actual, predicted, costs)?;
    let best_confusion = ConfusionMatrix::at_cutoff(actual, predicted, sweep.best_cutoff)?;
    Ok(Evaluation {
        confusion,
        sweep,
        best_confusion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTUAL: [f64; 6] = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
    const PREDICTED: [f64; 6] = [0.1, 0.4, 0.6, 0.3, 0.7, 0.9];

    #[test]
    fn test_confusion_at_half() {
        let cm = ConfusionMatrix::at_cutoff(&ACTUAL, &PREDICTED, 0.5).unwrap();
        assert_eq!(
            cm,
            ConfusionMatrix {
                true_negatives: 2,
                false_positives: 1,
                false_negatives: 1,
                true_positives: 2,
            }
        );
        assert_eq!(cm.total(), 6);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);
        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_cutoff_is_strict() {
        let cm = ConfusionMatrix::at_cutoff(&[1.0], &[0.5], 0.5).unwrap();
        assert_eq!(cm.false_negatives, 1);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ConfusionMatrix::at_cutoff(&[1.0], &[], 0.5).is_err());
    }

    #[test]
    fn test_cost_matrix_default() {
        let cm = ConfusionMatrix::at_cutoff(&ACTUAL, &PREDICTED, 0.5).unwrap();
        // FP 100 + FN 500 + 2 TP * 100
        assert_eq!(CostMatrix::default().cost(&cm), 800.0);
    }

    #[test]
    fn test_optimal_cutoff_prefers_catching_churners() {
        let sweep = optimal_cutoff(&ACTUAL, &PREDICTED, &CostMatrix::default()).unwrap();
        assert_eq!(sweep.cutoffs.len(), 99);
        assert_eq!(sweep.costs.len(), 99);
        // From 0.10 to 0.29 every churner is flagged: 3 TP + 2 FP = 500
        assert_eq!(sweep.best_cost, 500.0);
        assert!((sweep.best_cutoff - 0.1).abs() < 1e-12);
        assert_eq!(sweep.costs[0], 600.0);
    }

    #[test]
    fn test_evaluate() {
        let eval = evaluate(&ACTUAL, &PREDICTED, &CostMatrix::default()).unwrap();
        assert_eq!(eval.confusion.true_positives, 2);
        assert_eq!(eval.best_confusion.false_negatives, 0);
        assert!(evaluate(&[], &[], &CostMatrix::default()).is_err());
    }

    #[test]
    fn test_display() {
        let cm = ConfusionMatrix::at_cutoff(&ACTUAL, &PREDICTED, 0.5).unwrap();
        let text = cm.to_string();
        assert!(text.contains("pred 1"));
        assert_eq!(text.lines().count(), 3);
    }
}
