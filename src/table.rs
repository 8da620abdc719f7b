use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Cell texts that mean "no value", as the usual CSV tooling writes them.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One cell of a benchmark result table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    /// Empty or NA cell. Skipped by every reduction.
    Missing,
}

impl Value {
    /// Classify a raw cell: numbers win, empty cells and NA markers are
    /// missing, the rest is text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || NA_MARKERS.contains(&raw) {
            return Value::Missing;
        }
        match raw.parse::<f64>() {
            Ok(number) if number.is_nan() => Value::Missing,
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Total order used for sweep keys: numbers ascending, then text, then missing.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Number(_), _) => Ordering::Less,
            (_, Value::Number(_)) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Text(_), Value::Missing) => Ordering::Less,
            (Value::Missing, Value::Text(_)) => Ordering::Greater,
            (Value::Missing, Value::Missing) => Ordering::Equal,
        }
    }

    /// Hashable identity of the value, with `-0.0` folded into `0.0`.
    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Value::Number(number) if *number == 0.0 => ValueKey::Number(0),
            Value::Number(number) => ValueKey::Number(number.to_bits()),
            Value::Text(text) => ValueKey::Text(text.clone()),
            Value::Missing => ValueKey::Missing,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{number}"),
            Value::Text(text) => write!(f, "{text}"),
            Value::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Number(u64),
    Text(String),
    Missing,
}

/// A delimited table held in memory, header names preserved verbatim.
///
/// Columns are not validated up front; asking for an absent column returns
/// [`Error::Schema`] at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from already-typed rows. Short rows are padded with
    /// [`Value::Missing`].
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| Error::io(path, err))?;
        let table = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "loaded table"
        );
        Ok(table)
    }

    /// Parse comma-separated text with a header row.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Value::parse).collect());
        }

        Ok(Self::from_rows(columns, rows))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| Error::Schema {
                column: name.to_string(),
                available: self.columns.join(", "),
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// All cells of a column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// A column that must be numeric. Missing cells come back as `None`;
    /// text cells are a [`Error::Type`].
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let index = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| match &cells[index] {
                Value::Number(number) => Ok(Some(*number)),
                Value::Missing => Ok(None),
                Value::Text(text) => Err(Error::Type {
                    column: name.to_string(),
                    row: row + 1,
                    value: text.clone(),
                }),
            })
            .collect()
    }

    /// Keep the rows whose numeric `column` satisfies `keep`.
    /// Rows with a missing cell are dropped.
    pub fn filter<F>(&self, column: &str, keep: F) -> Result<Table>
    where
        F: Fn(f64) -> bool,
    {
        let values = self.numeric(column)?;
        let rows = self
            .rows
            .iter()
            .zip(values)
            .filter(|(_, value)| value.map(&keep).unwrap_or(false))
            .map(|(row, _)| row.clone())
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_cells() {
        assert_eq!(Value::parse(" 42 "), Value::Number(42.0));
        assert_eq!(Value::parse("1e3"), Value::Number(1000.0));
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("pr-array"), Value::Text("pr-array".into()));
    }

    #[test]
    fn na_markers_are_missing() {
        for raw in ["NaN", "nan", "NA", "N/A", "null", "<NA>"] {
            assert_eq!(Value::parse(raw), Value::Missing, "{raw}");
        }
        assert_eq!(Value::parse("inf"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn negative_zero_shares_key_with_zero() {
        assert_eq!(Value::Number(-0.0).key(), Value::Number(0.0).key());
    }

    #[test]
    fn numbers_sort_before_text() {
        let mut values = vec![
            Value::Text("write".into()),
            Value::Number(8.0),
            Value::Missing,
            Value::Number(2.0),
            Value::Text("read".into()),
        ];
        values.sort_by(Value::total_cmp);
        assert_eq!(
            values,
            vec![
                Value::Number(2.0),
                Value::Number(8.0),
                Value::Text("read".into()),
                Value::Text("write".into()),
                Value::Missing,
            ]
        );
    }

    #[test]
    fn display_drops_trailing_zero() {
        assert_eq!(Value::Number(4.0).to_string(), "4");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
    }
}
