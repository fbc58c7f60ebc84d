//! Column metadata used to resolve display names.

use serde::{Deserialize, Serialize};

/// A dataset column as described by the column metadata table.
///
/// Only the id and the name matter here; any other metadata present in the
/// payload is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column identifier, referenced as `field` in filter trees.
    pub id: String,
    /// Human-readable column name.
    pub name: String,
}

impl Column {
    /// Creates a column entry.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Looks up the name of the column with the given id.
pub fn resolve_column_name(columns: &[Column], id: &str) -> Option<String> {
    columns
        .iter()
        .find(|column| column.id == id)
        .map(|column| column.name.clone())
}
