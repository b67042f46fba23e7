use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fabric_recon::analysis::{self, AnalysisRequest};
use fabric_recon::config::TablesConfig;
use fabric_recon::merge;
use fabric_recon::pipeline::{PipelineKind, PipelineOptions};
use fabric_recon::{Result, ToolError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(cli) {
        error!(%error, "run failed");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyse(args) => execute_analyse(args),
        Command::Merge(args) => execute_merge(args),
    }
}

fn execute_analyse(args: AnalyseArgs) -> Result<()> {
    let tables_config = match &args.tables_config {
        Some(path) => TablesConfig::load(path)?,
        None => TablesConfig::default(),
    };
    let batch = args.batch.clone().unwrap_or_else(analysis::batch_stamp);
    let pipelines = args.pipeline.kinds();
    let options = PipelineOptions {
        troubleshoot: args.troubleshoot,
    };

    let total = args.input.len();
    let mut written = Vec::new();
    let mut failures = 0usize;
    for (idx, input) in args.input.into_iter().enumerate() {
        info!("{}/{}, process {}", idx + 1, total, input.display());
        let request = AnalysisRequest {
            input,
            output_dir: args.output_dir.clone(),
            pipelines: pipelines.clone(),
            batch: batch.clone(),
            options,
            tables_config: tables_config.clone(),
        };
        match analysis::analyse_workbook(&request) {
            Ok(report) => {
                if report.skipped_records > 0 {
                    warn!(skipped = report.skipped_records, "records skipped during expansion");
                }
                failures += report.failed.len();
                written.extend(report.written);
            }
            Err(err) => {
                error!(input = %request.input.display(), error = %err, "input skipped");
                failures += 1;
            }
        }
    }

    info!(outputs = ?written, failures, "analysis complete");
    Ok(())
}

fn execute_merge(args: MergeArgs) -> Result<()> {
    let Some(first) = args.input.first() else {
        return Err(ToolError::MissingInput(PathBuf::new()));
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(merge::merged_file_name(first, &analysis::batch_stamp())));
    merge::merge_workbooks(&args.input, &output)?;
    info!(output = %output.display(), "merged file saved");
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile collected fabric object tables into interface and contract maps."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build derived workbooks from collected object-class workbooks.
    Analyse(AnalyseArgs),
    /// Merge derived workbooks of several fabrics into one.
    Merge(MergeArgs),
}

#[derive(clap::Args)]
struct AnalyseArgs {
    /// Collected workbooks, e.g. ciscoapic_n1_20241016_1335.xlsx.
    #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
    input: Vec<PathBuf>,

    /// Directory receiving the derived workbooks.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Which derived workbooks to build.
    #[arg(long, value_enum, default_value_t = PipelineChoice::All)]
    pipeline: PipelineChoice,

    /// Batch stamp used in output names; defaults to the current time.
    #[arg(long)]
    batch: Option<String>,

    /// Tables configuration JSON with remove_properties lists.
    #[arg(long)]
    tables_config: Option<PathBuf>,

    /// Also export intermediate normalized tables.
    #[arg(long)]
    troubleshoot: bool,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Derived workbooks named apic_<env>_<datatype>_<stamp>.xlsx.
    #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
    input: Vec<PathBuf>,

    /// Output path; defaults to <apic>_merged_<datatype>_<stamp>.xlsx.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PipelineChoice {
    Interface,
    Contract,
    All,
}

impl PipelineChoice {
    fn kinds(self) -> Vec<PipelineKind> {
        match self {
            PipelineChoice::Interface => vec![PipelineKind::Interface],
            PipelineChoice::Contract => vec![PipelineKind::Contract],
            PipelineChoice::All => PipelineKind::ALL.to_vec(),
        }
    }
}
