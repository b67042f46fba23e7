//! Range notation expansion.
//!
//! Access port selectors store compact ranges: a node field such as
//! `1103-1104` and a port label such as `p16-17` or `p1-p2`, whose bare
//! numeric form (`16-17`) sits in a second field. An [`ExpansionPlan`]
//! groups ranged fields: fields inside one [`RangeGroup`] describe the same
//! range and are zipped by position, while separate groups are combined as
//! a Cartesian product, first group outermost.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{RangeError, Result};
use crate::model::{Record, Table, Value, compare_on};

static INTEGER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").expect("invalid integer range pattern"));
static PREFIXED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)(\d+)(?:-([A-Za-z]*)(\d+))?$").expect("invalid prefixed range pattern")
});

/// Declared shape of a range-eligible field. The shape decides how a `-`
/// inside the value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Bare integers: `1101`, `1103-1104`.
    Integer,
    /// Letter prefix followed by integers: `p31`, `p16-17`, `p1-p2`.
    Prefixed,
}

impl FieldShape {
    /// Most units a single value of this shape may expand to.
    pub fn max_units(self) -> u64 {
        match self {
            FieldShape::Integer => 65_536,
            FieldShape::Prefixed => 1_024,
        }
    }
}

/// A single unit or an inclusive range parsed from one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeToken {
    pub prefix: String,
    pub start: u64,
    pub end: u64,
}

impl RangeToken {
    /// Parses `value` according to `shape`. `field` only labels errors.
    pub fn parse(field: &str, value: &str, shape: FieldShape) -> std::result::Result<Self, RangeError> {
        let value = value.trim();
        let malformed = || RangeError::Malformed {
            field: field.to_string(),
            value: value.to_string(),
        };

        let (prefix, start, end) = match shape {
            FieldShape::Integer => {
                let caps = INTEGER_TOKEN.captures(value).ok_or_else(malformed)?;
                let start: u64 = caps[1].parse().map_err(|_| malformed())?;
                let end = match caps.get(2) {
                    Some(end) => end.as_str().parse().map_err(|_| malformed())?,
                    None => start,
                };
                (String::new(), start, end)
            }
            FieldShape::Prefixed => {
                let caps = PREFIXED_TOKEN.captures(value).ok_or_else(malformed)?;
                let prefix = caps[1].to_string();
                if let Some(end_prefix) = caps.get(3) {
                    let end_prefix = end_prefix.as_str();
                    if !end_prefix.is_empty() && !end_prefix.eq_ignore_ascii_case(&prefix) {
                        return Err(RangeError::PrefixMismatch {
                            field: field.to_string(),
                            value: value.to_string(),
                        });
                    }
                }
                let start: u64 = caps[2].parse().map_err(|_| malformed())?;
                let end = match caps.get(4) {
                    Some(end) => end.as_str().parse().map_err(|_| malformed())?,
                    None => start,
                };
                (prefix, start, end)
            }
        };

        if start > end {
            return Err(RangeError::Reversed {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        if end - start >= shape.max_units() {
            return Err(RangeError::TooLarge {
                field: field.to_string(),
                value: value.to_string(),
                limit: shape.max_units(),
            });
        }
        Ok(Self { prefix, start, end })
    }

    pub fn is_range(&self) -> bool {
        self.start != self.end
    }

    pub fn len(&self) -> usize {
        self.end
            .checked_sub(self.start)
            .and_then(|span| span.checked_add(1))
            .and_then(|units| usize::try_from(units).ok())
            .unwrap_or(0)
    }

    /// The discrete units covered, in ascending order.
    pub fn units(&self) -> Vec<String> {
        (self.start..=self.end)
            .map(|n| format!("{}{n}", self.prefix))
            .collect()
    }
}

/// Fields that expand together, zipped by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeGroup {
    pub fields: Vec<(String, FieldShape)>,
}

impl RangeGroup {
    /// One `(field, unit)` list per position of the zipped sequences. A
    /// null field is a single null unit, so records whose DN matched no
    /// rule pass through once with null keys.
    fn combinations(&self, record: &Record) -> std::result::Result<Vec<Vec<(String, Value)>>, RangeError> {
        let mut sequences = Vec::with_capacity(self.fields.len());
        for (field, shape) in &self.fields {
            let value = record.get(field).ok_or_else(|| RangeError::MissingValue {
                field: field.clone(),
            })?;
            let units = match value.as_text() {
                Some(text) => RangeToken::parse(field, &text, *shape)?
                    .units()
                    .into_iter()
                    .map(Value::Text)
                    .collect(),
                None => vec![Value::Null],
            };
            sequences.push(units);
        }

        let lengths: Vec<usize> = sequences.iter().map(Vec::len).collect();
        if lengths.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(RangeError::LengthMismatch {
                fields: self.fields.iter().map(|(field, _)| field.clone()).collect(),
                lengths,
            });
        }

        let width = lengths.first().copied().unwrap_or(0);
        Ok((0..width)
            .map(|position| {
                self.fields
                    .iter()
                    .zip(&sequences)
                    .map(|((field, _), units)| (field.clone(), units[position].clone()))
                    .collect()
            })
            .collect())
    }
}

/// Which fields of a record carry range notation, and how they relate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionPlan {
    pub groups: Vec<RangeGroup>,
    pub order_by: Vec<String>,
}

impl ExpansionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field that expands on its own.
    pub fn independent(mut self, field: &str, shape: FieldShape) -> Self {
        self.groups.push(RangeGroup {
            fields: vec![(field.to_string(), shape)],
        });
        self
    }

    /// Adds fields that describe the same range and expand in lockstep.
    pub fn zipped(mut self, fields: &[(&str, FieldShape)]) -> Self {
        self.groups.push(RangeGroup {
            fields: fields
                .iter()
                .map(|(field, shape)| (field.to_string(), *shape))
                .collect(),
        });
        self
    }

    /// Columns the expanded table is sorted by.
    pub fn order_by(mut self, columns: &[&str]) -> Self {
        self.order_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    fn fields(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|group| group.fields.iter().map(|(field, _)| field.as_str()))
            .collect()
    }
}

/// Expands one record into one record per combination of its ranged
/// fields. Non-ranged fields are copied verbatim. A ranged field absent
/// from the record is an error; a null one expands to itself.
pub fn expand(record: &Record, plan: &ExpansionPlan) -> std::result::Result<Vec<Record>, RangeError> {
    let mut expanded = vec![record.clone()];
    for group in &plan.groups {
        let combinations = group.combinations(record)?;
        expanded = expanded
            .iter()
            .flat_map(|base| {
                combinations.iter().map(move |combination| {
                    let mut row = base.clone();
                    for (field, unit) in combination {
                        row.insert(field.clone(), unit.clone());
                    }
                    row
                })
            })
            .collect();
    }
    Ok(expanded)
}

/// A record left out of an expanded table.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    pub error: RangeError,
}

/// Result of expanding a whole table.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub table: Table,
    pub skipped: Vec<SkippedRecord>,
}

/// Expands every record of `table`. Records with malformed ranges are
/// skipped and reported; the rest of the table still expands. Missing
/// ranged columns are a schema error.
pub fn expand_table(table: &Table, plan: &ExpansionPlan) -> Result<Expansion> {
    table.require_columns(&plan.fields())?;
    table.require_columns(&plan.order_by)?;

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for (index, record) in table.rows.iter().enumerate() {
        match expand(record, plan) {
            Ok(expanded) => rows.extend(expanded),
            Err(error) => {
                warn!(table = %table.name, index, %error, "skipping record with malformed range");
                skipped.push(SkippedRecord { index, error });
            }
        }
    }

    rows.sort_by(|lhs, rhs| compare_on(lhs, rhs, &plan.order_by));
    debug!(
        table = %table.name,
        input = table.len(),
        output = rows.len(),
        skipped = skipped.len(),
        "expanded range notation"
    );
    if !skipped.is_empty() {
        warn!(table = %table.name, skipped = skipped.len(), "records skipped during range expansion");
    }

    Ok(Expansion {
        table: Table::from_rows(table.name.clone(), &table.columns, rows),
        skipped,
    })
}
