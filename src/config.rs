use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::Table;

/// Per-object-class settings from the collection config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Object class (or derived table) name.
    pub key: String,
    /// Columns dropped from the table when removal is enabled.
    #[serde(default)]
    pub remove_properties: Vec<String>,
}

/// Tables configuration shared with the collector:
/// `{ "remove_properties_flag": 1, "tables": [{ "key": .., "remove_properties": [..] }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TablesConfig {
    #[serde(default)]
    pub remove_properties_flag: u8,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl TablesConfig {
    /// Loads the configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&source)?)
    }

    pub fn removal_enabled(&self) -> bool {
        self.remove_properties_flag == 1
    }

    /// Columns to drop from the table named `name`.
    pub fn removed_for(&self, name: &str) -> &[String] {
        self.tables
            .iter()
            .find(|table| table.key == name)
            .map(|table| table.remove_properties.as_slice())
            .unwrap_or(&[])
    }

    /// Drops configured columns from `table`. Columns the table does not
    /// carry are ignored; a disabled flag returns the table unchanged.
    pub fn apply(&self, table: &Table) -> Table {
        if !self.removal_enabled() {
            return table.clone();
        }
        let removed = self.removed_for(&table.name);
        if removed.is_empty() {
            return table.clone();
        }
        debug!(table = %table.name, columns = ?removed, "removing configured properties");
        table.drop_columns(removed)
    }
}
