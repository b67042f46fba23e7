use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Table as ExcelTable, TableColumn, Workbook};
use tracing::debug;

use crate::error::Result;
use crate::model::{Table, Value};

/// Longest sheet name Excel accepts.
const MAX_SHEET_NAME: usize = 31;

/// Writes each table to its own sheet, header row first. Non-empty sheets
/// are wrapped in an Excel table with autofilter.
pub fn write_tables(path: &Path, tables: &[Table]) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let mut sheet_names = SheetNameRegistry::default();

    for table in tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(sheet_names.assign(&table.name))?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            for (col_idx, column) in table.columns.iter().enumerate() {
                match row.get(column) {
                    Some(Value::Number(value)) => {
                        worksheet.write_number(excel_row, col_idx as u16, *value)?;
                    }
                    Some(Value::Text(value)) => {
                        worksheet.write_string(excel_row, col_idx as u16, value)?;
                    }
                    Some(Value::Null) | None => {}
                }
            }
        }

        if !table.rows.is_empty() && !table.columns.is_empty() {
            let columns: Vec<TableColumn> = table
                .columns
                .iter()
                .map(|header| TableColumn::new().set_header(header))
                .collect();
            let mut excel_table = ExcelTable::new();
            excel_table.set_autofilter(true).set_columns(&columns);
            let col_end = (table.columns.len() as u16).saturating_sub(1);
            worksheet.add_table(0, 0, table.rows.len() as u32, col_end, &excel_table)?;
        }
        debug!(sheet = %table.name, rows = table.len(), "sheet written");
    }

    workbook_writer.save(path)?;
    Ok(())
}

#[derive(Debug, Default)]
struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let mut prefix = base.clone();
            truncate_chars(&mut prefix, MAX_SHEET_NAME - suffix.len());
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let mut sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() {
        sanitized = "Sheet".to_string();
    }
    truncate_chars(&mut sanitized, MAX_SHEET_NAME);
    sanitized
}

fn truncate_chars(value: &mut String, max: usize) {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
}
