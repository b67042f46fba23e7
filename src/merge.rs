//! Combines derived workbooks from several fabrics into one workbook.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::{Result, ToolError};
use crate::io::{excel_read, excel_write};
use crate::model::{Table, TableSet, Value};

/// Column prepended to every merged sheet, holding the source environment.
pub const PREFIX_COLUMN: &str = "prefix";

fn name_parts(path: &Path) -> Vec<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.split('_').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Environment token of `apic_<env>_<datatype>_<stamp>.xlsx`, empty when
/// the name has fewer parts.
pub fn environment_prefix(path: &Path) -> String {
    let parts = name_parts(path);
    if parts.len() >= 4 {
        parts[1].clone()
    } else {
        String::new()
    }
}

/// Default output name `<apic>_merged_<datatype>_<stamp>.xlsx`, taken from
/// the first input.
pub fn merged_file_name(first: &Path, stamp: &str) -> String {
    let parts = name_parts(first);
    let (apic, datatype) = if parts.len() >= 4 {
        (parts[0].as_str(), parts[2].as_str())
    } else {
        ("merged", "data")
    };
    format!("{apic}_merged_{datatype}_{stamp}.xlsx")
}

/// Concatenates same-named tables across sources, each row tagged with its
/// source prefix. Sheets keep the order in which they are first seen.
pub fn merge_tables(sources: &[(String, TableSet)]) -> Vec<Table> {
    let mut merged: Vec<Table> = Vec::new();
    for (prefix, tables) in sources {
        for table in tables.iter() {
            let tagged = prefixed(table, prefix);
            match merged.iter_mut().find(|t| t.name == table.name) {
                Some(existing) => *existing = existing.concat(&tagged),
                None => merged.push(tagged),
            }
        }
    }
    merged
}

fn prefixed(table: &Table, prefix: &str) -> Table {
    let mut columns = vec![PREFIX_COLUMN.to_string()];
    columns.extend(table.columns.iter().filter(|c| *c != PREFIX_COLUMN).cloned());
    let rows = table.rows.iter().map(|row| {
        let mut row = row.clone();
        row.insert(PREFIX_COLUMN.to_string(), Value::text(prefix));
        row
    });
    Table::from_rows(table.name.clone(), &columns, rows)
}

/// Reads every input workbook and writes the merged result to `output`.
#[instrument(level = "info", skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub fn merge_workbooks(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.exists() {
            return Err(ToolError::MissingInput(input.clone()));
        }
        let tables = excel_read::read_tables(input)?;
        sources.push((environment_prefix(input), tables));
    }

    let merged = merge_tables(&sources);
    info!(sheets = merged.len(), "merged workbooks");
    excel_write::write_tables(output, &merged)
}
