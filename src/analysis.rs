//! Per-workbook orchestration: read the collected tables, run the
//! requested pipelines, and write one derived workbook per pipeline.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, info, instrument};

use crate::config::TablesConfig;
use crate::error::{Result, ToolError};
use crate::io::{excel_read, excel_write};
use crate::pipeline::{PipelineKind, PipelineOptions};

static INPUT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:cisco)?apic_([^_]+)_\d{8}_\d{4}\.xlsx$").expect("invalid input name pattern")
});

/// Environment token of a collected workbook name such as
/// `ciscoapic_n1_20241016_1335.xlsx` → `n1`.
pub fn environment_from_file_name(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    INPUT_NAME
        .captures(name)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ToolError::InvalidFileName(name.to_string()))
}

/// `apic_<env>_<pipeline>_<batch>.xlsx`
pub fn output_file_name(environment: &str, kind: PipelineKind, batch: &str) -> String {
    format!("apic_{environment}_{kind}_{batch}.xlsx")
}

/// Local-time batch stamp shared by every output of one run.
pub fn batch_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M").to_string()
}

/// Everything needed to analyse one collected workbook.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub pipelines: Vec<PipelineKind>,
    pub batch: String,
    pub options: PipelineOptions,
    pub tables_config: TablesConfig,
}

/// Outcome of one workbook: files written and pipelines that failed.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PipelineKind, ToolError)>,
    pub skipped_records: usize,
}

/// Analyses one workbook. Unreadable input or an unrecognised file name
/// abort; a pipeline missing its tables or columns fails on its own while
/// the other pipelines still run.
#[instrument(level = "info", skip_all, fields(input = %request.input.display(), batch = %request.batch))]
pub fn analyse_workbook(request: &AnalysisRequest) -> Result<AnalysisReport> {
    if !request.input.exists() {
        return Err(ToolError::MissingInput(request.input.clone()));
    }
    let environment = environment_from_file_name(&request.input)?;
    let tables = excel_read::read_tables(&request.input)?;
    info!(environment = %environment, tables = tables.len(), "loaded collected tables");

    let mut report = AnalysisReport::default();
    for &kind in &request.pipelines {
        let output = match kind.run(&tables, &request.options) {
            Ok(output) => output,
            Err(err) => {
                error!(pipeline = %kind, error = %err, "pipeline failed");
                report.failed.push((kind, err));
                continue;
            }
        };

        let derived: Vec<_> = output
            .tables
            .iter()
            .map(|table| request.tables_config.apply(table))
            .collect();
        let path = request
            .output_dir
            .join(output_file_name(&environment, kind, &request.batch));
        excel_write::write_tables(&path, &derived)?;
        info!(pipeline = %kind, output = %path.display(), sheets = derived.len(), "wrote derived workbook");

        report.skipped_records += output.skipped_records;
        report.written.push(path);
    }
    Ok(report)
}
