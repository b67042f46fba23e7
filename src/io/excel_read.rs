use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::{Record, Table, TableSet, Value};

/// Reads every sheet of a workbook into a [`TableSet`]. The first row of a
/// sheet holds column names; each following non-empty row becomes a record.
pub fn read_tables(path: &Path) -> Result<TableSet> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let names = workbook.sheet_names().to_owned();

    let mut tables = TableSet::new();
    for name in names {
        let range = read_sheet(&mut workbook, &name)?;
        let table = range_to_table(&name, &range)?;
        debug!(sheet = %name, rows = table.len(), columns = table.columns.len(), "read sheet");
        tables.insert(table);
    }
    Ok(tables)
}

fn read_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::MissingTable(name.to_string()))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn range_to_table(name: &str, range: &calamine::Range<DataType>) -> Result<Table> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row.iter().map(|cell| cell_to_string(Some(cell))).collect(),
        None => Vec::new(),
    };
    let columns: Vec<&String> = headers.iter().filter(|header| !header.is_empty()).collect();
    if let Some(duplicate) = columns
        .iter()
        .enumerate()
        .find(|(idx, header)| columns[..*idx].contains(*header))
        .map(|(_, header)| header)
    {
        return Err(ToolError::InvalidWorkbook(format!(
            "sheet '{name}' repeats column '{duplicate}'"
        )));
    }

    let mut table = Table::new(name, &columns);
    for row in rows {
        let record: Record = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(col_idx, header)| (header.clone(), cell_to_value(row.get(col_idx))))
            .collect();
        if record.values().all(Value::is_null) {
            continue;
        }
        table.push(record);
    }
    Ok(table)
}

fn cell_to_value(cell: Option<&DataType>) -> Value {
    match cell {
        Some(DataType::Float(value)) => Value::Number(*value),
        Some(DataType::Int(value)) => Value::Number(*value as f64),
        other => Value::from_optional(Some(cell_to_string(other))),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
