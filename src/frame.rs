//! Tabular data exchanged with the database.
//!
//! `Frame` is the in-memory table returned by reads and accepted by the bulk
//! operations. The bulk operations only rely on the [`Tabular`] trait, so other
//! row/column containers can be synchronized by implementing it.

use crate::core::{BridgeError, Result, SqlValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Read access to row/column structured data.
pub trait Tabular {
    fn column_names(&self) -> &[String];

    fn row_count(&self) -> usize;

    fn row(&self, index: usize) -> Option<&[SqlValue]>;

    fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|c| c == name)
    }

    fn iter_rows(&self) -> TabularRows<'_, Self> {
        TabularRows {
            source: self,
            next: 0,
        }
    }
}

/// Iterator over the rows of a [`Tabular`], in order.
pub struct TabularRows<'a, T: Tabular + ?Sized> {
    source: &'a T,
    next: usize,
}

impl<'a, T: Tabular + ?Sized> Iterator for TabularRows<'a, T> {
    type Item = &'a [SqlValue];

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.source.row(self.next)?;
        self.next += 1;
        Some(row)
    }
}

/// Rows of values under an ordered list of column names.
///
/// A frame may be unlabeled (rows without column names) until [`Frame::label`]
/// attaches names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

fn check_width(rows: &[Vec<SqlValue>], width: usize) -> Result<()> {
    match rows.iter().position(|r| r.len() != width) {
        Some(i) => Err(BridgeError::Contract(format!(
            "row {} has {} values but the frame has {} columns",
            i,
            rows[i].len(),
            width
        ))),
        None => Ok(()),
    }
}

impl Frame {
    /// Builds a labeled frame; every row must have one value per column.
    pub fn new<C: Into<String>>(
        columns: impl IntoIterator<Item = C>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_width(&rows, columns.len())?;
        Ok(Frame { columns, rows })
    }

    /// Builds a frame with no column names; rows must share one width.
    pub fn unlabeled(rows: Vec<Vec<SqlValue>>) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        check_width(&rows, width)?;
        Ok(Frame {
            columns: Vec::new(),
            rows,
        })
    }

    /// An empty frame with the given columns.
    pub fn with_columns<C: Into<String>>(columns: impl IntoIterator<Item = C>) -> Self {
        Frame {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of values per row.
    pub fn width(&self) -> usize {
        if self.columns.is_empty() {
            self.rows.first().map(Vec::len).unwrap_or(0)
        } else {
            self.columns.len()
        }
    }

    pub fn is_labeled(&self) -> bool {
        !self.columns.is_empty() || self.width() == 0
    }

    /// Attaches column names, replacing any existing ones.
    pub fn label<C: Into<String>>(&mut self, names: impl IntoIterator<Item = C>) -> Result<()> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if !self.rows.is_empty() && names.len() != self.width() {
            return Err(BridgeError::Schema(format!(
                "{} column names for rows of width {}",
                names.len(),
                self.width()
            )));
        }
        self.columns = names;
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        let index = self
            .column_index(from)
            .ok_or_else(|| BridgeError::Contract(format!("no column named '{}'", from)))?;
        self.columns[index] = to.to_string();
        Ok(())
    }

    pub fn push_row(&mut self, row: Vec<SqlValue>) -> Result<()> {
        let width = if self.rows.is_empty() && self.columns.is_empty() {
            row.len()
        } else {
            self.width()
        };
        check_width(std::slice::from_ref(&row), width)?;
        self.rows.push(row);
        Ok(())
    }

    /// Value at `row` under column `column`.
    pub fn value(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Row `index` as an owned tuple of values.
    pub fn row_tuple(&self, index: usize) -> Option<Vec<SqlValue>> {
        self.rows.get(index).cloned()
    }

    /// Row `index` as a column-name to value map.
    pub fn record(&self, index: usize) -> Option<BTreeMap<String, SqlValue>> {
        let row = self.rows.get(index)?;
        Some(self.columns.iter().cloned().zip(row.iter().cloned()).collect())
    }

    /// All rows keyed by row index.
    pub fn records(&self) -> BTreeMap<usize, BTreeMap<String, SqlValue>> {
        (0..self.rows.len())
            .filter_map(|i| self.record(i).map(|r| (i, r)))
            .collect()
    }

    /// A new frame with only `columns`, in the given order.
    pub fn select<C: AsRef<str>>(&self, columns: &[C]) -> Result<Frame> {
        let indexes = columns
            .iter()
            .map(|c| {
                self.column_index(c.as_ref())
                    .ok_or_else(|| BridgeError::Contract(format!("no column named '{}'", c.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Frame::new(columns.iter().map(|c| c.as_ref().to_string()), rows)
    }

    /// Exports the rows as a JSON array of objects.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        if !self.is_labeled() {
            return Err(BridgeError::Schema("cannot export an unlabeled frame".to_string()));
        }
        let objects = self
            .rows
            .iter()
            .map(|row| -> Result<serde_json::Value> {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| -> Result<(String, serde_json::Value)> {
                        Ok((c.clone(), serde_json::to_value(v)?))
                    })
                    .collect::<Result<_>>()?;
                Ok(serde_json::Value::Object(object))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::Value::Array(objects))
    }
}

impl Tabular for Frame {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> Option<&[SqlValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}
