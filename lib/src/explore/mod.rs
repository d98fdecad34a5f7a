//! Exploratory summaries of a loaded customer table.
//!
//! Nothing here feeds the model; the output exists for a human deciding
//! which columns to keep. [`Summary::build`] collects everything the
//! `explore` command prints and [`Summary::render`] formats it.

mod stats;

pub use stats::{
    correlation_matrix, describe, histogram, mean, quantile, std_dev, summarize,
    CorrelationMatrix, Histogram, NumericSummary, RedundantPair,
};

use crate::dataset::Table;
use crate::error::{ChurnError, Result};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Count and share of rows for one category.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyRow {
    pub category: String,
    pub count: usize,
    pub share: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyTable {
    pub column: String,
    /// Ordered by category.
    pub rows: Vec<FrequencyRow>,
}

/// Category frequencies of a categorical column.
pub fn frequency_table(table: &Table, column: &str) -> Result<FrequencyTable> {
    let values = table.categorical(column)?;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_default() += 1;
    }
    let total = values.len().max(1) as f64;
    Ok(FrequencyTable {
        column: column.to_string(),
        rows: counts
            .into_iter()
            .map(|(category, count)| FrequencyRow {
                category: category.to_string(),
                count,
                share: count as f64 / total,
            })
            .collect(),
    })
}

/// Distribution of a categorical column within each label value.
///
/// `shares[[i, j]]` is the fraction of rows with label `labels[j]` whose
/// category is `categories[i]`; every column sums to one.
#[derive(Clone, Debug, PartialEq)]
pub struct Crosstab {
    pub column: String,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub shares: Array2<f64>,
}

pub fn label_crosstab(table: &Table, column: &str, label: &str) -> Result<Crosstab> {
    let values = table.categorical(column)?;
    let targets = table.categorical(label)?;

    let categories: Vec<String> = sorted_unique(values);
    let labels: Vec<String> = sorted_unique(targets);
    let mut counts = Array2::<f64>::zeros((categories.len(), labels.len()));
    for (v, t) in values.iter().zip(targets) {
        let i = position(&categories, v);
        let j = position(&labels, t);
        counts[[i, j]] += 1.0;
    }
    for mut col in counts.columns_mut() {
        let total = col.sum();
        if total > 0.0 {
            col /= total;
        }
    }

    Ok(Crosstab {
        column: column.to_string(),
        categories,
        labels,
        shares: counts,
    })
}

/// Mean of every numeric column within each label value.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupedMeans {
    pub labels: Vec<String>,
    pub columns: Vec<String>,
    /// `labels.len() x columns.len()`.
    pub means: Array2<f64>,
}

pub fn grouped_means(table: &Table, label: &str) -> Result<GroupedMeans> {
    let targets = table.categorical(label)?;
    let labels = sorted_unique(targets);
    let numeric: Vec<(&str, &[f64])> = table
        .columns()
        .iter()
        .filter_map(|c| c.data.as_numeric().map(|v| (c.name.as_str(), v)))
        .collect();

    let mut sums = Array2::<f64>::zeros((labels.len(), numeric.len()));
    let mut counts = vec![0usize; labels.len()];
    for (row, t) in targets.iter().enumerate() {
        let i = position(&labels, t);
        counts[i] += 1;
        for (j, (_, values)) in numeric.iter().enumerate() {
            sums[[i, j]] += values[row];
        }
    }
    for (i, mut row) in sums.rows_mut().into_iter().enumerate() {
        row /= counts[i] as f64;
    }

    Ok(GroupedMeans {
        labels,
        columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
        means: sums,
    })
}

fn sorted_unique(values: &[String]) -> Vec<String> {
    let mut out = values.to_vec();
    out.sort();
    out.dedup();
    out
}

fn position(sorted: &[String], value: &str) -> usize {
    sorted.partition_point(|c| c.as_str() < value)
}

/// Everything the exploratory report shows.
#[derive(Clone, Debug)]
pub struct Summary {
    pub n_rows: usize,
    pub n_columns: usize,
    pub frequencies: Vec<FrequencyTable>,
    pub numeric: Vec<NumericSummary>,
    pub histograms: Vec<(String, Histogram)>,
    pub crosstabs: Vec<Crosstab>,
    pub grouped: Option<GroupedMeans>,
    pub correlation: CorrelationMatrix,
    pub redundant: Vec<RedundantPair>,
}

impl Summary {
    /// Builds the report. Crosstabs and grouped means need `label`.
    pub fn build(table: &Table, label: Option<&str>, bins: usize, threshold: f64) -> Result<Self> {
        if table.is_empty() {
            return Err(ChurnError::EmptyData(
                "nothing to summarize in an empty table".to_string(),
            ));
        }
        let label = label.filter(|l| table.has_column(l));

        let mut frequencies = Vec::new();
        let mut crosstabs = Vec::new();
        let mut histograms = Vec::new();
        for column in table.columns() {
            match column.data.as_numeric() {
                Some(values) => histograms.push((column.name.clone(), histogram(values, bins)?)),
                None => {
                    frequencies.push(frequency_table(table, &column.name)?);
                    if let Some(label) = label.filter(|l| *l != column.name) {
                        crosstabs.push(label_crosstab(table, &column.name, label)?);
                    }
                }
            }
        }

        let correlation = correlation_matrix(table);
        let redundant = correlation.redundant_pairs(threshold);
        Ok(Summary {
            n_rows: table.n_rows(),
            n_columns: table.n_columns(),
            frequencies,
            numeric: describe(table),
            histograms,
            crosstabs,
            grouped: label.map(|l| grouped_means(table, l)).transpose()?,
            correlation,
            redundant,
        })
    }

    /// Plain-text rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{} rows x {} columns", self.n_rows, self.n_columns)?;

        for freq in &self.frequencies {
            writeln!(out, "\n== {} ==", freq.column)?;
            for row in &freq.rows {
                writeln!(out, "  {:<12} {:>6} {:>7.3}", row.category, row.count, row.share)?;
            }
        }

        writeln!(out, "\n== numeric columns ==")?;
        writeln!(
            out,
            "  {:<16} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )?;
        for s in &self.numeric {
            writeln!(
                out,
                "  {:<16} {:>6} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3}",
                s.column, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
            )?;
        }

        for (column, h) in &self.histograms {
            let counts: Vec<String> = h.counts.iter().map(usize::to_string).collect();
            writeln!(out, "  hist {:<16} [{}]", column, counts.join(" "))?;
        }

        for ct in &self.crosstabs {
            writeln!(out, "\n== {} by {} ==", ct.column, ct.labels.join(" / "))?;
            for (i, category) in ct.categories.iter().enumerate() {
                let shares: Vec<String> =
                    ct.shares.row(i).iter().map(|s| format!("{:.3}", s)).collect();
                writeln!(out, "  {:<12} {}", category, shares.join(" "))?;
            }
        }

        if let Some(g) = &self.grouped {
            writeln!(out, "\n== numeric means by label ==")?;
            for (j, column) in g.columns.iter().enumerate() {
                let means: Vec<String> =
                    g.means.column(j).iter().map(|m| format!("{:>9.3}", m)).collect();
                writeln!(out, "  {:<16} {}", column, means.join(" "))?;
            }
        }

        if !self.redundant.is_empty() {
            writeln!(out, "\n== strongly correlated pairs ==")?;
            for pair in &self.redundant {
                writeln!(out, "  {} ~ {} (r = {:.4}), drop {}", pair.keep, pair.drop, pair.r, pair.drop)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{load_churn_from_reader, synthetic, CHURN_LABEL, REDUNDANT_CHARGE_COLUMNS};
    use crate::dataset::Column;

    fn small() -> Table {
        Table::new(vec![
            Column::categorical("Int'l Plan", vec!["no", "yes", "no", "no"]),
            Column::numeric("CustServ Calls", vec![1.0, 5.0, 2.0, 4.0]),
            Column::categorical("Churn?", vec!["False.", "True.", "False.", "True."]),
        ])
        .unwrap()
    }

    #[test]
    fn test_frequency_table() {
        let freq = frequency_table(&small(), "Int'l Plan").unwrap();
        assert_eq!(freq.rows.len(), 2);
        assert_eq!(freq.rows[0].category, "no");
        assert_eq!(freq.rows[0].count, 3);
        assert!((freq.rows[1].share - 0.25).abs() < 1e-12);
        assert!(frequency_table(&small(), "CustServ Calls").is_err());
    }

    #[test]
    fn test_label_crosstab_columns_sum_to_one() {
        let ct = label_crosstab(&small(), "Int'l Plan", "Churn?").unwrap();
        assert_eq!(ct.labels, vec!["False.", "True."]);
        // False.: both "no"; True.: one each
        assert_eq!(ct.shares.column(0).to_vec(), vec![1.0, 0.0]);
        assert_eq!(ct.shares.column(1).to_vec(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_grouped_means() {
        let g = grouped_means(&small(), "Churn?").unwrap();
        assert_eq!(g.columns, vec!["CustServ Calls"]);
        assert!((g.means[[0, 0]] - 1.5).abs() < 1e-12);
        assert!((g.means[[1, 0]] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_summary_flags_charge_columns() {
        let csv = synthetic::churn_csv(400, 3);
        let table = load_churn_from_reader(csv.as_bytes()).unwrap();
        let summary = Summary::build(&table, Some(CHURN_LABEL), 10, 0.99).unwrap();

        let dropped: Vec<&str> = summary.redundant.iter().map(|p| p.drop.as_str()).collect();
        for charge in REDUNDANT_CHARGE_COLUMNS {
            assert!(dropped.contains(&charge), "{} not flagged", charge);
        }
        assert!(summary.grouped.is_some());
        assert!(summary.crosstabs.iter().any(|c| c.column == "State"));

        let text = summary.render();
        assert!(text.starts_with("400 rows"));
        assert!(text.contains("strongly correlated pairs"));
    }

    #[test]
    fn test_summary_without_label() {
        let summary = Summary::build(&small(), None, 4, 0.9).unwrap();
        assert!(summary.grouped.is_none());
        assert!(summary.crosstabs.is_empty());
        assert_eq!(summary.frequencies.len(), 2);
    }

    #[test]
    fn test_summary_empty_table() {
        let empty = Table::new(vec![Column::numeric("x", vec![])]).unwrap();
        assert!(matches!(
            Summary::build(&empty, None, 4, 0.9),
            Err(ChurnError::EmptyData(_))
        ));
    }
}
