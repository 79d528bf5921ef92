//! Table types.

/// A table found on a page: ordered rows of ordered cells.
///
/// No header or schema is inferred; the first row is just a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Rows in top-to-bottom order
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A table row. A cell with no text is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    /// Cells in left-to-right order
    pub cells: Vec<Option<String>>,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    /// Create a row where every cell has text.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Get a cell's text, if the cell exists and is non-empty.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }
}
