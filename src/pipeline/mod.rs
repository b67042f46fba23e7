//! Fixed reconciliation pipelines turning collected object-class tables into
//! derived relational tables.

pub mod contract;
pub mod interface;

use std::fmt;

use crate::error::Result;
use crate::model::{Table, TableSet};

/// The derived workbooks this crate knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineKind {
    Interface,
    Contract,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 2] = [PipelineKind::Interface, PipelineKind::Contract];

    /// Runs the pipeline over `tables`.
    pub fn run(self, tables: &TableSet, options: &PipelineOptions) -> Result<PipelineOutput> {
        match self {
            PipelineKind::Interface => interface::run(tables, options),
            PipelineKind::Contract => contract::run(tables, options),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Interface => write!(f, "interface"),
            PipelineKind::Contract => write!(f, "contract"),
        }
    }
}

/// Switches shared by every pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Also emit the intermediate normalized tables.
    pub troubleshoot: bool,
}

/// Derived tables in output order, plus row-level issues met on the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineOutput {
    pub tables: Vec<Table>,
    pub skipped_records: usize,
}

impl PipelineOutput {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }
}
