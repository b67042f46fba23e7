use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// A single cell value read from an object-class table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Absent or empty cell.
    #[default]
    Null,
    /// Plain string value.
    Text(String),
    /// Numeric value, as spreadsheets store it.
    Number(f64),
}

impl Value {
    /// Builds a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Builds a text value, mapping an empty string to [`Value::Null`].
    pub fn from_optional(value: Option<String>) -> Self {
        match value {
            Some(value) if !value.is_empty() => Value::Text(value),
            _ => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String form of the value, `None` for nulls. Whole numbers render
    /// without a fractional part so `1101.0` reads as `1101`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(value) => Some(value.clone()),
            Value::Number(value) => Some(format_number(*value)),
        }
    }

    /// Key used when matching rows across tables. Nulls never match.
    pub fn join_key(&self) -> Option<String> {
        self.as_text()
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(value) if value.fract() == 0.0 => Some(*value as i64),
            Value::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Natural ordering: integers first in numeric order, then every other
    /// value by its string form, nulls last.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            _ => match (self.as_integer(), other.as_integer()) {
                (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => self.as_text().cmp(&other.as_text()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(value) => f.write_str(value),
            Value::Number(value) => f.write_str(&format_number(*value)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One row of an object-class table, field name → value.
pub type Record = BTreeMap<String, Value>;

/// A named table with an ordered column list. Every record carries exactly
/// the table's columns; missing fields are stored as [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, columns: &[S]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Creates a table from rows, conforming every row to the column set.
    pub fn from_rows<S: AsRef<str>>(
        name: impl Into<String>,
        columns: &[S],
        rows: impl IntoIterator<Item = Record>,
    ) -> Self {
        let mut table = Self::new(name, columns);
        for row in rows {
            table.push(row);
        }
        table
    }

    /// Appends a record, dropping unknown fields and filling missing ones.
    pub fn push(&mut self, mut record: Record) {
        let row = self
            .columns
            .iter()
            .map(|column| (column.clone(), record.remove(column).unwrap_or_default()))
            .collect();
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fails with [`ToolError::MissingColumn`] on the first absent column.
    pub fn require_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c.as_ref())) {
            Some(column) => Err(ToolError::MissingColumn {
                table: self.name.clone(),
                column: column.as_ref().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or_default())
            .collect()
    }

    /// Returns a copy under a different name.
    pub fn named(&self, name: impl Into<String>) -> Table {
        Table {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Projects to the given columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        self.require_columns(columns)?;
        Ok(Table::from_rows(self.name.clone(), columns, self.rows.iter().cloned()))
    }

    /// Renames columns; pairs naming absent columns are ignored.
    pub fn rename(&self, renames: &[(&str, &str)]) -> Table {
        let lookup = |column: &str| -> String {
            renames
                .iter()
                .find(|(from, _)| *from == column)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| column.to_string())
        };
        let columns: Vec<String> = self.columns.iter().map(|c| lookup(c.as_str())).collect();
        let rows = self.rows.iter().map(|row| {
            row.iter()
                .map(|(key, value)| (lookup(key.as_str()), value.clone()))
                .collect::<Record>()
        });
        Table::from_rows(self.name.clone(), &columns, rows)
    }

    /// Drops the given columns, ignoring any the table does not carry.
    pub fn drop_columns<S: AsRef<str>>(&self, columns: &[S]) -> Table {
        let kept: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !columns.iter().any(|d| d.as_ref() == c.as_str()))
            .cloned()
            .collect();
        Table::from_rows(self.name.clone(), &kept, self.rows.iter().cloned())
    }

    /// Stable sort by the given columns using natural value ordering.
    pub fn sort_by<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        self.require_columns(columns)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|lhs, rhs| compare_on(lhs, rhs, columns));
        Ok(Table {
            rows,
            ..self.clone()
        })
    }

    /// Adds (or replaces) a column computed from each record.
    pub fn with_column<F>(&self, column: &str, derive: F) -> Table
    where
        F: Fn(&Record) -> Value,
    {
        let mut columns = self.columns.clone();
        if !self.has_column(column) {
            columns.push(column.to_string());
        }
        let rows = self.rows.iter().map(|row| {
            let mut row = row.clone();
            let value = derive(&row);
            row.insert(column.to_string(), value);
            row
        });
        Table::from_rows(self.name.clone(), &columns, rows)
    }

    /// Appends the rows of `other`; the column list is the union, left first.
    pub fn concat(&self, other: &Table) -> Table {
        let mut columns = self.columns.clone();
        for column in &other.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        let rows = self.rows.iter().chain(other.rows.iter()).cloned();
        Table::from_rows(self.name.clone(), &columns, rows)
    }

    /// Rows as display strings in column order, as written to a sheet.
    pub fn to_cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| row.get(c).map(Value::to_string).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// Compares two records column by column with natural ordering.
pub fn compare_on<S: AsRef<str>>(lhs: &Record, rhs: &Record, columns: &[S]) -> Ordering {
    let null = Value::Null;
    for column in columns {
        let column = column.as_ref();
        let ordering = lhs
            .get(column)
            .unwrap_or(&null)
            .natural_cmp(rhs.get(column).unwrap_or(&null));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// All object-class tables collected from one source, in sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a table under its own name, replacing one of the same name.
    pub fn insert(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Fetches a table the pipeline cannot run without.
    pub fn require(&self, name: &str) -> Result<&Table> {
        self.get(name)
            .ok_or_else(|| ToolError::MissingTable(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut set = TableSet::new();
        for table in iter {
            set.insert(table);
        }
        set
    }
}

/// Builds a record from `(field, value)` pairs.
pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
