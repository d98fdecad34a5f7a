//! Headerless CSV payloads exchanged with the remote services.
//!
//! Training channels and inference requests share one format: one row per
//! line, comma separated, no header and no row index. Prediction responses
//! come back as delimited decimals.

use crate::dataset::FeatureMatrix;
use crate::error::{ChurnError, Result};
use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// MIME type of every payload.
pub const CONTENT_TYPE: &str = "text/csv";

/// Writes the matrix rows as headerless CSV.
pub fn write_csv<W: Write>(matrix: &FeatureMatrix, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    let mut record = Vec::with_capacity(matrix.n_columns());
    for row in matrix.data().rows() {
        record.clear();
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_bytes(matrix: &FeatureMatrix) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(matrix.n_rows() * matrix.n_columns() * 6);
    write_csv(matrix, &mut buf)?;
    Ok(buf)
}

pub fn write_csv_file<P: AsRef<Path>>(matrix: &FeatureMatrix, path: P) -> Result<()> {
    let file = File::create(path)?;
    write_csv(matrix, BufWriter::new(file))
}

/// Parses delimited decimal predictions.
///
/// Commas and any whitespace separate values; empty fields are skipped.
pub fn parse_predictions(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                ChurnError::MalformedResponse(format!("not a prediction: {:?}", tok))
            })
        })
        .collect()
}

/// Appends one response to the running prediction text.
pub fn join_predictions(acc: &mut String, response: &str) {
    let response = response.trim();
    if response.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push(',');
    }
    acc.push_str(response);
}
