//! Relational joins and key-grouped aggregation over [`Table`]s.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::Result;
use crate::model::{Record, Table, Value, compare_on};

/// Suffix given to a left-side column whose name collides with the right.
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix given to a right-side column whose name collides with the left.
pub const RIGHT_SUFFIX: &str = "_y";

/// Join semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only rows whose key matches on both sides.
    Inner,
    /// Every left row; right fields null when unmatched.
    Left,
    /// Every row from both sides; output sorted by key.
    Outer,
}

/// Key columns on each side, matched position by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl JoinKeys {
    /// Same-named key columns on both sides.
    pub fn on(columns: &[&str]) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        Self {
            left: columns.clone(),
            right: columns,
        }
    }

    /// Differently named key columns, `left_on` / `right_on` style.
    pub fn columns(left: &[&str], right: &[&str]) -> Self {
        Self {
            left: left.iter().map(|c| c.to_string()).collect(),
            right: right.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn is_shared(&self, right_column: &str) -> bool {
        self.left
            .iter()
            .zip(&self.right)
            .any(|(left, right)| left == right && right == right_column)
    }
}

fn key_of(row: &Record, columns: &[String]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| row.get(column).and_then(Value::join_key))
        .collect()
}

/// Output naming for both sides, with pandas-style collision suffixes.
struct ColumnLayout {
    left: Vec<(String, String)>,
    right: Vec<(String, String)>,
}

impl ColumnLayout {
    fn new(left: &Table, right: &Table, keys: &JoinKeys) -> Self {
        let right_kept: Vec<&String> = right
            .columns
            .iter()
            .filter(|column| !keys.is_shared(column))
            .collect();
        let left_layout = left
            .columns
            .iter()
            .map(|column| {
                let shared_key = keys.left.contains(column) && keys.is_shared(column);
                let collides = !shared_key && right_kept.contains(&column);
                let output = if collides {
                    format!("{column}{LEFT_SUFFIX}")
                } else {
                    column.clone()
                };
                (column.clone(), output)
            })
            .collect();
        let right_layout = right_kept
            .into_iter()
            .map(|column| {
                let output = if left.has_column(column) {
                    format!("{column}{RIGHT_SUFFIX}")
                } else {
                    column.clone()
                };
                (column.clone(), output)
            })
            .collect();
        Self {
            left: left_layout,
            right: right_layout,
        }
    }

    fn columns(&self) -> Vec<String> {
        self.left
            .iter()
            .chain(&self.right)
            .map(|(_, output)| output.clone())
            .collect()
    }
}

/// Joins two tables on the given keys.
///
/// Null keys never match. Inner and left joins keep left row order, each
/// left row followed by its matches in right row order; an outer join
/// appends unmatched right rows and then sorts stably by key. Shared key
/// columns appear once, filled from whichever side is present. Many-to-many
/// keys fan out; that is the expected result, not an error.
pub fn join(left: &Table, right: &Table, keys: &JoinKeys, how: JoinKind) -> Result<Table> {
    left.require_columns(&keys.left)?;
    right.require_columns(&keys.right)?;

    let layout = ColumnLayout::new(left, right, keys);
    let shared: Vec<(String, String)> = keys
        .left
        .iter()
        .zip(&keys.right)
        .filter(|(l, r)| l == r)
        .map(|(l, r)| (l.clone(), r.clone()))
        .collect();

    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (position, row) in right.rows.iter().enumerate() {
        if let Some(key) = key_of(row, &keys.right) {
            index.entry(key).or_default().push(position);
        }
    }

    let combine = |l: Option<&Record>, r: Option<&Record>| -> Record {
        let mut out = Record::new();
        for (source, output) in &layout.left {
            let value = l.and_then(|row| row.get(source)).cloned().unwrap_or_default();
            out.insert(output.clone(), value);
        }
        for (source, output) in &layout.right {
            let value = r.and_then(|row| row.get(source)).cloned().unwrap_or_default();
            out.insert(output.clone(), value);
        }
        for (key, _) in &shared {
            if out.get(key).is_none_or(Value::is_null) {
                if let Some(value) = r.and_then(|row| row.get(key)) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    };

    let mut rows: Vec<(Vec<Value>, Record)> = Vec::new();
    let mut matched_right: HashSet<usize> = HashSet::new();
    let sort_key = |l: Option<&Record>, r: Option<&Record>| -> Vec<Value> {
        keys.left
            .iter()
            .zip(&keys.right)
            .map(|(lk, rk)| {
                l.and_then(|row| row.get(lk))
                    .filter(|value| !value.is_null())
                    .or_else(|| r.and_then(|row| row.get(rk)))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    };

    for l in &left.rows {
        let matches = key_of(l, &keys.left).and_then(|key| index.get(&key));
        match matches {
            Some(positions) => {
                for &position in positions {
                    matched_right.insert(position);
                    let r = &right.rows[position];
                    rows.push((sort_key(Some(l), Some(r)), combine(Some(l), Some(r))));
                }
            }
            None if how != JoinKind::Inner => {
                rows.push((sort_key(Some(l), None), combine(Some(l), None)));
            }
            None => {}
        }
    }

    if how == JoinKind::Outer {
        for (position, r) in right.rows.iter().enumerate() {
            if !matched_right.contains(&position) {
                rows.push((sort_key(None, Some(r)), combine(None, Some(r))));
            }
        }
        rows.sort_by(|(lhs, _), (rhs, _)| {
            lhs.iter()
                .zip(rhs)
                .map(|(a, b)| a.natural_cmp(b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    debug!(
        left = %left.name,
        right = %right.name,
        ?how,
        left_rows = left.len(),
        right_rows = right.len(),
        rows = rows.len(),
        "joined tables"
    );

    Ok(Table::from_rows(
        left.name.clone(),
        &layout.columns(),
        rows.into_iter().map(|(_, row)| row),
    ))
}

/// Options for [`group_concat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConcat {
    pub separator: String,
    pub unique: bool,
    pub sort: bool,
}

impl Default for GroupConcat {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            unique: true,
            sort: true,
        }
    }
}

/// Collapses rows sharing a group key into one row whose `value_column`
/// holds the joined values of the group.
///
/// Values are sorted before joining (when `sort` is set) so the result does
/// not depend on input row order. Rows with a null group key are dropped,
/// null values are skipped, and output rows are ordered by group key.
pub fn group_concat(
    table: &Table,
    group_by: &[&str],
    value_column: &str,
    options: &GroupConcat,
) -> Result<Table> {
    table.require_columns(group_by)?;
    table.require_columns(&[value_column])?;

    let group_columns: Vec<String> = group_by.iter().map(|c| c.to_string()).collect();
    let mut groups: Vec<(Record, Vec<Value>)> = Vec::new();
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();

    for row in &table.rows {
        let Some(key) = key_of(row, &group_columns) else {
            continue;
        };
        let slot = *positions.entry(key).or_insert_with(|| {
            let key_record = group_columns
                .iter()
                .map(|column| (column.clone(), row.get(column).cloned().unwrap_or_default()))
                .collect();
            groups.push((key_record, Vec::new()));
            groups.len() - 1
        });
        if let Some(value) = row.get(value_column).filter(|value| !value.is_null()) {
            groups[slot].1.push(value.clone());
        }
    }

    let mut rows: Vec<Record> = groups
        .into_iter()
        .map(|(mut key_record, mut values)| {
            if options.sort {
                values.sort_by(|a, b| a.natural_cmp(b));
            }
            let mut seen = HashSet::new();
            let joined: Vec<String> = values
                .iter()
                .filter_map(Value::as_text)
                .filter(|value| !options.unique || seen.insert(value.clone()))
                .collect();
            let cell = if joined.is_empty() {
                Value::Null
            } else {
                Value::Text(joined.join(&options.separator))
            };
            key_record.insert(value_column.to_string(), cell);
            key_record
        })
        .collect();
    rows.sort_by(|lhs, rhs| compare_on(lhs, rhs, group_by));

    let mut columns: Vec<&str> = group_by.to_vec();
    columns.push(value_column);
    Ok(Table::from_rows(table.name.clone(), &columns, rows))
}
