//! Per-object-class table normalization.
//!
//! A [`Normalization`] projects a raw table to the columns a pipeline
//! needs, derives key columns from DNs through the decomposer, applies
//! regex rewrites, renames, and sorts. Every step produces a new table.

use regex::Regex;
use tracing::debug;

use crate::dn::RulesetKind;
use crate::error::Result;
use crate::model::{Table, Value};

/// Populates columns from fields decomposed out of a DN column.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRule {
    pub source: String,
    pub kind: RulesetKind,
    /// `(ruleset field, target column)` pairs. A target may overwrite the
    /// source column.
    pub fields: Vec<(String, String)>,
}

/// Regex replacement applied to every value of `source`, written to
/// `target`. Nulls stay null; a value rewritten to nothing becomes null.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub source: String,
    pub target: String,
    pub pattern: String,
    pub replacement: String,
}

/// Declarative description of how one raw table is normalized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalization {
    pub name: String,
    pub projection: Vec<String>,
    pub keys: Vec<KeyRule>,
    pub rewrites: Vec<Rewrite>,
    pub renames: Vec<(String, String)>,
    pub output: Option<Vec<String>>,
    pub sort_by: Vec<String>,
}

impl Normalization {
    /// Starts a normalization whose result is named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Columns the source table must carry; every other column is dropped.
    pub fn project(mut self, columns: &[&str]) -> Self {
        self.projection = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn key(mut self, source: &str, kind: RulesetKind, fields: &[(&str, &str)]) -> Self {
        self.keys.push(KeyRule {
            source: source.to_string(),
            kind,
            fields: fields
                .iter()
                .map(|(field, target)| (field.to_string(), target.to_string()))
                .collect(),
        });
        self
    }

    pub fn rewrite(mut self, source: &str, target: &str, pattern: &str, replacement: &str) -> Self {
        self.rewrites.push(Rewrite {
            source: source.to_string(),
            target: target.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        });
        self
    }

    pub fn rename(mut self, renames: &[(&str, &str)]) -> Self {
        self.renames
            .extend(renames.iter().map(|(from, to)| (from.to_string(), to.to_string())));
        self
    }

    /// Final column selection, after keys, rewrites and renames.
    pub fn output(mut self, columns: &[&str]) -> Self {
        self.output = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn sort_by(mut self, columns: &[&str]) -> Self {
        self.sort_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Applies the normalization; see [`normalize`].
    pub fn apply(&self, table: &Table) -> Result<Table> {
        normalize(table, self)
    }
}

/// Normalizes `table`. A projected column the table lacks is a schema
/// error; DNs that match no rule leave their derived columns null.
pub fn normalize(table: &Table, plan: &Normalization) -> Result<Table> {
    let mut current = table.select(&plan.projection)?.named(plan.name.clone());

    for key in &plan.keys {
        current.require_columns(&[&key.source])?;
        let decomposed: Vec<_> = current
            .rows
            .iter()
            .map(|row| {
                row.get(&key.source)
                    .and_then(Value::as_text)
                    .map(|dn| key.kind.ruleset().decompose(&dn))
            })
            .collect();
        for (field, target) in &key.fields {
            let values: Vec<Value> = decomposed
                .iter()
                .map(|fields| {
                    fields
                        .as_ref()
                        .and_then(|fields| fields.get(field).cloned())
                        .unwrap_or_default()
                })
                .collect();
            current = set_column(&current, target, values);
        }
    }

    for rewrite in &plan.rewrites {
        current.require_columns(&[&rewrite.source])?;
        let pattern = Regex::new(&rewrite.pattern)?;
        current = current.with_column(&rewrite.target, |row| {
            let source = row.get(&rewrite.source).and_then(Value::as_text);
            Value::from_optional(
                source.map(|value| {
                    pattern
                        .replace_all(&value, rewrite.replacement.as_str())
                        .into_owned()
                }),
            )
        });
    }

    if !plan.renames.is_empty() {
        let renames: Vec<(&str, &str)> = plan
            .renames
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        current = current.rename(&renames);
    }

    if let Some(output) = &plan.output {
        current = current.select(output)?;
    }

    if !plan.sort_by.is_empty() {
        current = current.sort_by(&plan.sort_by)?;
    }

    debug!(table = %current.name, rows = current.len(), columns = current.columns.len(), "normalized table");
    Ok(current)
}

fn set_column(table: &Table, column: &str, values: Vec<Value>) -> Table {
    let mut columns = table.columns.clone();
    if !table.has_column(column) {
        columns.push(column.to_string());
    }
    let rows = table.rows.iter().zip(values).map(|(row, value)| {
        let mut row = row.clone();
        row.insert(column.to_string(), value);
        row
    });
    Table::from_rows(table.name.clone(), &columns, rows)
}
