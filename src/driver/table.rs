//! Row/column text storage behind the GCP driver

use super::layout::Column;

/// Rectangular table of text cells with typed column definitions
#[derive(Debug, Clone, PartialEq)]
pub struct GcpTable {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl GcpTable {
    pub fn new(columns: Vec<Column>) -> Self {
        GcpTable { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Index of the column with the given name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Append an empty row and return its index
    pub fn append_row(&mut self) -> usize {
        self.rows.push(vec![String::new(); self.columns.len()]);
        self.rows.len() - 1
    }

    pub fn delete_row(&mut self, row: usize) -> bool {
        if row < self.rows.len() {
            self.rows.remove(row);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Cell parsed as a number; `None` when empty or not numeric
    pub fn numeric(&self, row: usize, column: usize) -> Option<f64> {
        self.cell(row, column)?.trim().parse::<f64>().ok()
    }

    /// Store a value; returns `false` when the cell does not exist
    pub fn set_cell(&mut self, row: usize, column: usize, value: &str) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(cell) => {
                *cell = value.to_string();
                true
            }
            None => false,
        }
    }
}
