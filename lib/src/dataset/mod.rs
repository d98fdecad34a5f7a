//! Loading, cleaning and partitioning the customer record set.
//!
//! # Core Concepts
//!
//! - **Schema**: the fixed column layout of the input file and what the
//!   cleaner does with each column.
//! - **Table**: column-oriented record set, numeric or categorical columns.
//! - **FeatureMatrix**: encoded numeric rows, label in column 0 when present.
//! - **Partitions**: seeded 70/20/10 train/validation/test split.
//!
//! # Example
//!
//! ```no_run
//! use churnflow::dataset::{load_churn, split, SplitRatios, DEFAULT_SEED};
//! use churnflow::preprocessing::{ChurnEncoder, Transformer};
//!
//! let table = load_churn("churn.txt")?;
//! let encoded = ChurnEncoder::churn().fit_transform(&table)?;
//! let parts = split(&encoded, SplitRatios::default(), DEFAULT_SEED)?;
//! println!("{:?}", parts.sizes());
//! # Ok::<(), churnflow::ChurnError>(())
//! ```

mod matrix;
mod schema;
mod split;
mod table;

pub mod synthetic;

pub use matrix::FeatureMatrix;
pub use schema::{
    ColumnKind, ColumnSpec, Schema, CHURN_LABEL, CHURN_POSITIVE, REDUNDANT_CHARGE_COLUMNS,
};
pub use split::{permutation, split, Partitions, SplitRatios, DEFAULT_SEED};
pub use table::{Column, ColumnData, Table};

use crate::error::Result;
use std::io::Read;
use std::path::Path;

/// Applies the schema's cleaning rules in place.
///
/// Identifier columns are dropped and code columns are retyped as
/// categorical. Label and feature columns are untouched.
pub fn clean(table: &mut Table, schema: &Schema) -> Result<()> {
    for name in schema.columns_of(ColumnKind::Identifier) {
        if table.has_column(name) {
            table.drop_column(name)?;
        }
    }
    for name in schema.columns_of(ColumnKind::Code) {
        table.retype_as_categorical(name)?;
    }
    Ok(())
}

/// Reads and cleans a churn file from disk.
pub fn load_churn<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let schema = Schema::churn();
    let mut table = Table::from_csv_path(path, &schema)?;
    clean(&mut table, &schema)?;
    tracing::info!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        "loaded customer records"
    );
    Ok(table)
}

/// Reads and cleans churn-formatted text from any reader.
pub fn load_churn_from_reader<R: Read>(reader: R) -> Result<Table> {
    let schema = Schema::churn();
    let mut table = Table::from_csv_reader(reader, &schema)?;
    clean(&mut table, &schema)?;
    Ok(table)
}
