//! Tabular result payload.
//!
//! A `Table` is what a literature database hands back after fetching: one row
//! per record, one column per field. Cells are JSON values so that sources
//! with differently shaped records (citation counts, keyword lists, missing
//! abstracts) fit in the same type and survive a round trip through the disk
//! cache unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from JSON-object records.
    ///
    /// Columns are the union of all record keys in first-seen order. Cells a
    /// record does not provide are `null`.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut table = Self::default();
        for record in records {
            table.push_record(record);
        }
        table
    }

    /// Append one record, widening the table if it introduces new fields.
    pub fn push_record(&mut self, mut record: Map<String, Value>) {
        for key in record.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
            }
        }

        let row = self
            .columns
            .iter()
            .map(|c| record.remove(c).unwrap_or(Value::Null))
            .collect();
        self.rows.push(row);
    }

    /// All values of a column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
