//! Materialized query results.

use chrono::NaiveDateTime;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Parse SQLite text stored in a datetime column.
    ///
    /// Accepts the `YYYY-MM-DD HH:MM:SS[.ffffff]` layout written by most ETL
    /// tools, the ISO `T` separator, and bare dates.
    pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(t) = NaiveDateTime::parse_from_str(text, fmt) {
                return Some(t);
            }
        }
        chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::Real(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Timestamp(t) => serializer.collect_str(&t.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Ordered rows, each a mapping from column name to [`Scalar`].
///
/// Cells are stored positionally against `columns`; [`Row::get`] resolves by
/// name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Scalar],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Scalar> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Scalar)> {
        let (columns, values): (&'a [String], &'a [Scalar]) = (self.columns, self.values);
        columns.iter().map(String::as_str).zip(values.iter())
    }
}

impl QueryResult {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Values beyond the column count are dropped, missing ones
    /// are filled with `Null`.
    pub fn push_row(&mut self, mut values: Vec<Scalar>) {
        values.resize(self.columns.len(), Scalar::Null);
        self.rows.push(values);
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

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> QueryResult {
        QueryResult {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Vec<&Scalar> {
        self.rows().filter_map(|r| r.get(column)).collect()
    }

    /// Fixed-width text table, one line per row, with a leading row index.
    pub fn render_text(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result: no columns".to_string();
        }
        if self.rows.is_empty() {
            return format!("Empty result\nColumns: [{}]", self.columns.join(", "));
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect();
        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = " ".repeat(index_width);
        for (name, w) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {name:>w$}"));
        }
        for (i, row) in cells.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{i:<index_width$}"));
            for (cell, w) in row.iter().zip(&widths) {
                out.push_str(&format!("  {cell:>w$}"));
            }
        }
        out
    }
}

struct RowMap<'a>(Row<'a>);

impl Serialize for RowMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.columns.len()))?;
        for (name, value) in self.0.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<RowMap<'_>> = self.rows().map(RowMap).collect();
        let mut s = serializer.serialize_struct("QueryResult", 2)?;
        s.serialize_field("columns", &self.columns)?;
        s.serialize_field("rows", &rows)?;
        s.end()
    }
}
