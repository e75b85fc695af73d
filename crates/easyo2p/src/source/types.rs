//! Catalog row and value types.

use chrono::NaiveDateTime;

use crate::error::{MigrateError, Result};

/// A single value read from the source catalog or from a bulk data query.
///
/// Numeric values are carried as their decimal text rendering so that
/// arbitrary-precision Oracle NUMBER data survives the round trip into an
/// INSERT literal without floating-point artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Number(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Numeric value from an integer, for building result sets by hand.
    pub fn int(value: i64) -> Self {
        SqlValue::Number(value.to_string())
    }

    /// Text value from anything string-like.
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the textual content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Interpret the value as an integer, if it is numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Number(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// An ordered result set with named columns, as returned by the catalog.
///
/// Column names are stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        let columns = columns.into_iter().map(|c| c.to_lowercase()).collect();
        Self { columns, rows }
    }

    /// Build a result set from static column names, for tests and adapters.
    pub fn with_columns(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the rows as name-addressable records.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// A borrowed view over one row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [SqlValue],
}

impl<'a> Record<'a> {
    /// All values in column order.
    pub fn values(&self) -> &'a [SqlValue] {
        self.values
    }

    /// Look up a value by column name.
    pub fn value(&self, name: &str) -> Result<&'a SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| MigrateError::catalog(format!("column '{}' not in result set", name)))
    }

    /// Required text column.
    pub fn text(&self, name: &str) -> Result<&'a str> {
        self.opt_text(name)?
            .ok_or_else(|| MigrateError::catalog(format!("column '{}' is unexpectedly NULL", name)))
    }

    /// Nullable text column.
    pub fn opt_text(&self, name: &str) -> Result<Option<&'a str>> {
        match self.value(name)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s.as_str())),
            other => Err(MigrateError::catalog(format!(
                "column '{}' is not text: {:?}",
                name, other
            ))),
        }
    }

    /// Required integer column.
    pub fn int(&self, name: &str) -> Result<i64> {
        self.opt_int(name)?
            .ok_or_else(|| MigrateError::catalog(format!("column '{}' is unexpectedly NULL", name)))
    }

    /// Nullable integer column.
    pub fn opt_int(&self, name: &str) -> Result<Option<i64>> {
        match self.value(name)? {
            SqlValue::Null => Ok(None),
            other => other.as_i64().map(Some).ok_or_else(|| {
                MigrateError::catalog(format!("column '{}' is not numeric: {:?}", name, other))
            }),
        }
    }
}
