//! Table block contents
//!
//! Rows are a row-major 2-D string grid. The grid always has at least one row
//! and one column; deleting the last one is a no-op.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    rows: Vec<Vec<String>>,
}

impl Default for TableData {
    fn default() -> Self {
        Self::empty(2, 2)
    }
}

impl TableData {
    pub fn empty(rows: usize, columns: usize) -> Self {
        let rows = rows.max(1);
        let columns = columns.max(1);
        Self {
            rows: vec![vec![String::new(); columns]; rows],
        }
    }

    /// Build from persisted rows, padding ragged rows to a rectangle
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect();
        if rows.is_empty() {
            rows.push(vec![String::new(); columns]);
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Returns false when the coordinates are out of range
    pub fn set_cell(&mut self, row: usize, column: usize, text: impl Into<String>) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(cell) => {
                *cell = text.into();
                true
            }
            None => false,
        }
    }

    /// Insert an empty row after `after` (or at the end when out of range)
    pub fn add_row(&mut self, after: Option<usize>) {
        let columns = self.column_count().max(1);
        let index = after
            .map(|i| (i + 1).min(self.rows.len()))
            .unwrap_or(self.rows.len());
        self.rows.insert(index, vec![String::new(); columns]);
    }

    pub fn delete_row(&mut self, index: usize) -> bool {
        if self.rows.len() <= 1 || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    pub fn add_column(&mut self, after: Option<usize>) {
        let columns = self.column_count();
        let index = after.map(|i| (i + 1).min(columns)).unwrap_or(columns);
        for row in &mut self.rows {
            row.insert(index, String::new());
        }
    }

    pub fn delete_column(&mut self, index: usize) -> bool {
        if self.column_count() <= 1 || index >= self.column_count() {
            return false;
        }
        for row in &mut self.rows {
            row.remove(index);
        }
        true
    }
}
