//! Table status rows.
//!
//! `SHOW TABLE STATUS` returns a wide row whose column order is owned by the
//! server and has changed between engine versions. Cells are therefore kept
//! alongside their column names and looked up by name.

use crate::error::{CollectError, Result};

/// Column carrying the next identifier the table will assign.
pub const AUTO_INCREMENT_COLUMN: &str = "Auto_increment";

/// Find the index of `name` in a column list.
pub fn find_column(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|c| c == name)
}

/// One row of table status, as text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl TableStatus {
    /// Create a row from column names and their cells.
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(CollectError::shape(format!(
                "table status has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Raw cell for a column, failing if the column is absent.
    pub fn get_by_name(&self, name: &str) -> Result<Option<&str>> {
        let index = find_column(&self.columns, name).ok_or_else(|| CollectError::MissingColumn {
            column: name.to_string(),
            context: "table status",
        })?;
        Ok(self.values[index].as_deref())
    }

    /// Next auto-increment value for the table.
    pub fn auto_increment(&self) -> Result<u64> {
        let cell = self
            .get_by_name(AUTO_INCREMENT_COLUMN)?
            .ok_or_else(|| CollectError::parse(format!("{} is NULL", AUTO_INCREMENT_COLUMN)))?;
        cell.trim().parse::<u64>().map_err(|e| {
            CollectError::parse(format!(
                "{} value '{}' is not an unsigned integer: {}",
                AUTO_INCREMENT_COLUMN, cell, e
            ))
        })
    }
}
