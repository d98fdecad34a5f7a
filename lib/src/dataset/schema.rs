//! Column layout of the customer file.

use serde::{Deserialize, Serialize};

/// Name of the binary churn label column.
pub const CHURN_LABEL: &str = "Churn?";

/// Label value marking a churned customer.
pub const CHURN_POSITIVE: &str = "True.";

/// Charge columns that are a fixed multiple of the matching minutes column.
///
/// Exploration shows each pair correlates at r = 1.0, so the workflow prunes
/// the charges before encoding.
pub const REDUNDANT_CHARGE_COLUMNS: [&str; 4] =
    ["Day Charge", "Eve Charge", "Night Charge", "Intl Charge"];

/// How a column is read and what the cleaner does with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Parsed as `f64` and passed through unchanged.
    Numeric,
    /// Kept as text and one-hot encoded.
    Categorical,
    /// Small-cardinality integer code; parsed as a number, then retyped as
    /// categorical so it is not treated as a magnitude.
    Code,
    /// Unique per-row key with no predictive value; dropped by the cleaner.
    Identifier,
    /// Binary target; optional when loading inference data.
    Label,
}

/// A named column and its kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered description of a delimited input file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Schema of the telecom churn file: one row per customer, 21 columns.
    pub fn churn() -> Self {
        use ColumnKind::*;
        let columns = [
            ("State", Categorical),
            ("Account Length", Numeric),
            ("Area Code", Code),
            ("Phone", Identifier),
            ("Int'l Plan", Categorical),
            ("VMail Plan", Categorical),
            ("VMail Message", Numeric),
            ("Day Mins", Numeric),
            ("Day Calls", Numeric),
            ("Day Charge", Numeric),
            ("Eve Mins", Numeric),
            ("Eve Calls", Numeric),
            ("Eve Charge", Numeric),
            ("Night Mins", Numeric),
            ("Night Calls", Numeric),
            ("Night Charge", Numeric),
            ("Intl Mins", Numeric),
            ("Intl Calls", Numeric),
            ("Intl Charge", Numeric),
            ("CustServ Calls", Numeric),
            (CHURN_LABEL, Label),
        ];
        Self::new(
            columns
                .into_iter()
                .map(|(name, kind)| ColumnSpec::new(name, kind))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns the label column name, if the schema has one.
    pub fn label(&self) -> Option<&str> {
        self.columns_of(ColumnKind::Label).next()
    }

    /// Iterates over the names of columns of the given kind, in file order.
    pub fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| c.name.as_str())
    }
}
