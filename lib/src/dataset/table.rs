//! Column-oriented in-memory record set.

use crate::dataset::schema::{ColumnKind, Schema};
use crate::error::{ChurnError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Values of a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[String]> {
        match self {
            ColumnData::Numeric(_) => None,
            ColumnData::Categorical(v) => Some(v),
        }
    }

    fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// A named column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// A record set: one row per customer, columns in file order.
///
/// All columns share the same row count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Builds a table, checking that every column has the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
            return Err(ChurnError::InvalidShape {
                expected: format!("{} rows", n_rows),
                got: format!("{} rows in column '{}'", bad.data.len(), bad.name),
            });
        }
        Ok(Self { columns, n_rows })
    }

    /// Reads a headered delimited file laid out as `schema`.
    ///
    /// Only schema columns are kept, in schema order. Numeric and code
    /// columns are parsed as `f64`; everything else stays text. A missing
    /// label column is tolerated so inference files can be loaded with the
    /// training schema.
    pub fn from_csv_reader<R: Read>(reader: R, schema: &Schema) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut layout = Vec::with_capacity(schema.columns().len());
        for spec in schema.columns() {
            match headers.iter().position(|h| h == spec.name) {
                Some(idx) => layout.push((spec, idx)),
                None if spec.kind == ColumnKind::Label => continue,
                None => return Err(ChurnError::MissingColumn(spec.name.clone())),
            }
        }

        let mut data: Vec<ColumnData> = layout
            .iter()
            .map(|(spec, _)| match spec.kind {
                ColumnKind::Numeric | ColumnKind::Code => ColumnData::Numeric(Vec::new()),
                _ => ColumnData::Categorical(Vec::new()),
            })
            .collect();

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            for ((spec, idx), column) in layout.iter().zip(data.iter_mut()) {
                let cell = record.get(*idx).unwrap_or("");
                match column {
                    ColumnData::Numeric(values) => {
                        let value = cell.parse::<f64>().map_err(|_| ChurnError::Parse {
                            column: spec.name.clone(),
                            row,
                            value: cell.to_string(),
                        })?;
                        values.push(value);
                    }
                    ColumnData::Categorical(values) => values.push(cell.to_string()),
                }
            }
        }

        let columns = layout
            .into_iter()
            .zip(data)
            .map(|((spec, _), data)| Column {
                name: spec.name.clone(),
                data,
            })
            .collect();
        Self::new(columns)
    }

    /// Reads a headered delimited file from disk.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file), schema)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns a numeric column's values.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        let column = self
            .column(name)
            .ok_or_else(|| ChurnError::MissingColumn(name.to_string()))?;
        column.data.as_numeric().ok_or_else(|| {
            ChurnError::InvalidParameter(format!("column '{}' is not numeric", name))
        })
    }

    /// Returns a categorical column's values.
    pub fn categorical(&self, name: &str) -> Result<&[String]> {
        let column = self
            .column(name)
            .ok_or_else(|| ChurnError::MissingColumn(name.to_string()))?;
        column.data.as_categorical().ok_or_else(|| {
            ChurnError::InvalidParameter(format!("column '{}' is not categorical", name))
        })
    }

    /// Removes a column and returns it.
    pub fn drop_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ChurnError::MissingColumn(name.to_string()))?;
        Ok(self.columns.remove(idx))
    }

    /// Removes every named column; all must exist.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            self.drop_column(name.as_ref())?;
        }
        Ok(())
    }

    /// Reinterprets a numeric column as categorical in place.
    ///
    /// Integral values are rendered without a fractional part, so area code
    /// `415.0` becomes the category `"415"`. Already-categorical columns are
    /// left untouched.
    pub fn retype_as_categorical(&mut self, name: &str) -> Result<()> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ChurnError::MissingColumn(name.to_string()))?;
        if let ColumnData::Numeric(values) = &column.data {
            let labels = values.iter().map(|&v| format_category(v)).collect();
            column.data = ColumnData::Categorical(labels);
        }
        Ok(())
    }

    /// Returns a new table holding the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(ChurnError::InvalidParameter(format!(
                "row index {} out of bounds for {} rows",
                bad, self.n_rows
            )));
        }
        Ok(Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(indices),
                })
                .collect(),
            n_rows: indices.len(),
        })
    }
}

fn format_category(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::schema::ColumnSpec;

    fn tiny_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::new("State", ColumnKind::Categorical),
            ColumnSpec::new("Area Code", ColumnKind::Code),
            ColumnSpec::new("Phone", ColumnKind::Identifier),
            ColumnSpec::new("Day Mins", ColumnKind::Numeric),
            ColumnSpec::new("Churn?", ColumnKind::Label),
        ])
    }

    const TINY: &str = "State,Area Code,Phone,Day Mins,Churn?\n\
                        KS,415,382-4657,265.1,False.\n\
                        OH,408,371-7191,161.6,True.\n";

    #[test]
    fn test_from_csv_reader_types() {
        let table = Table::from_csv_reader(TINY.as_bytes(), &tiny_schema()).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_columns(), 5);
        assert_eq!(table.numeric("Day Mins").unwrap(), &[265.1, 161.6]);
        assert_eq!(table.numeric("Area Code").unwrap(), &[415.0, 408.0]);
        assert_eq!(table.categorical("Churn?").unwrap(), &["False.", "True."]);
    }

    #[test]
    fn test_from_csv_reader_ignores_extra_and_reorders() {
        let csv = "Day Mins,Extra,State,Phone,Area Code\n1.5,x,KS,1,415\n";
        let table = Table::from_csv_reader(csv.as_bytes(), &tiny_schema()).unwrap();
        assert_eq!(table.column_names(), vec!["State", "Area Code", "Phone", "Day Mins"]);
    }

    #[test]
    fn test_from_csv_reader_missing_label_is_allowed() {
        let csv = "State,Area Code,Phone,Day Mins\nKS,415,1,2.0\n";
        let table = Table::from_csv_reader(csv.as_bytes(), &tiny_schema()).unwrap();
        assert!(!table.has_column("Churn?"));
    }

    #[test]
    fn test_from_csv_reader_missing_feature_column() {
        let csv = "State,Phone,Day Mins,Churn?\nKS,1,2.0,True.\n";
        let result = Table::from_csv_reader(csv.as_bytes(), &tiny_schema());
        assert!(matches!(result, Err(ChurnError::MissingColumn(c)) if c == "Area Code"));
    }

    #[test]
    fn test_from_csv_reader_parse_error_reports_cell() {
        let csv = "State,Area Code,Phone,Day Mins,Churn?\nKS,415,1,lots,True.\n";
        let result = Table::from_csv_reader(csv.as_bytes(), &tiny_schema());
        match result {
            Err(ChurnError::Parse { column, row, value }) => {
                assert_eq!(column, "Day Mins");
                assert_eq!(row, 0);
                assert_eq!(value, "lots");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_csv_path_missing_file() {
        let result = Table::from_csv_path("/definitely/not/here.csv", &tiny_schema());
        assert!(matches!(result, Err(ChurnError::Io(_))));
    }

    #[test]
    fn test_drop_and_retype() {
        let mut table = Table::from_csv_reader(TINY.as_bytes(), &tiny_schema()).unwrap();
        table.drop_column("Phone").unwrap();
        table.retype_as_categorical("Area Code").unwrap();
        assert!(!table.has_column("Phone"));
        assert_eq!(table.categorical("Area Code").unwrap(), &["415", "408"]);
        assert!(table.drop_column("Phone").is_err());
    }

    #[test]
    fn test_retype_non_integral_keeps_fraction() {
        let mut table = Table::new(vec![Column::numeric("x", vec![1.5, 2.0])]).unwrap();
        table.retype_as_categorical("x").unwrap();
        assert_eq!(table.categorical("x").unwrap(), &["1.5", "2"]);
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = Table::new(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::numeric("b", vec![1.0]),
        ]);
        assert!(matches!(result, Err(ChurnError::InvalidShape { .. })));
    }

    #[test]
    fn test_take_rows() {
        let table = Table::from_csv_reader(TINY.as_bytes(), &tiny_schema()).unwrap();
        let taken = table.take_rows(&[1, 1, 0]).unwrap();
        assert_eq!(taken.n_rows(), 3);
        assert_eq!(taken.categorical("State").unwrap(), &["OH", "OH", "KS"]);
        assert!(table.take_rows(&[2]).is_err());
    }

    #[test]
    fn test_typed_accessors_reject_wrong_kind() {
        let table = Table::from_csv_reader(TINY.as_bytes(), &tiny_schema()).unwrap();
        assert!(table.numeric("State").is_err());
        assert!(table.categorical("Day Mins").is_err());
    }
}
