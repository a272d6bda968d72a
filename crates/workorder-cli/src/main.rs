//! `workorder` - turn PCL work orders into searchable, self-named PDFs.
//!
//! ```text
//! workorder process --config workorder.json
//! workorder process --config workorder.json --strategy text-only --workers 0 --json
//! workorder rename ./scans --dry-run
//! workorder extract page.txt --assignee "John Smith"
//! workorder check-config workorder.json
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use workorder::worker::available_workers;
use workorder::{
    document_filename, load_config, validate_config, AssemblyStrategy, BatchRunner,
    FieldExtractor, KnownAssignees, PipelineConfig, RenameUtility,
};

const AFTER_HELP: &str = "\
EXTERNAL TOOLS:
  process needs GhostPCL (gpcl6), poppler (pdftoppm, pdfinfo) and, with
  the cli OCR engine, the tesseract executable on PATH or configured by
  absolute path in the config file.

EXIT STATUS:
  0  every document completed, was skipped or renamed cleanly
  1  at least one document failed or hit a name conflict
  2  the command itself could not run (bad config, unreadable directory)

LOGGING:
  RUST_LOG overrides -v / -q, e.g. RUST_LOG=workorder=trace.";

#[derive(Parser)]
#[command(
    name = "workorder",
    version,
    about = "Convert PCL work orders into searchable PDFs named after their content",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Log debug details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit log lines as JSON objects on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every .pcl file of the input directory
    Process(ProcessArgs),

    /// Rename searchable PDFs to <work order>.pdf
    Rename(RenameArgs),

    /// Run field extraction on a plain-text file
    Extract(ExtractArgs),

    /// Validate a config file and print the effective settings
    CheckConfig {
        /// Path to the JSON config file
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Path to the JSON config file
    #[arg(short, long, env = "WORKORDER_CONFIG", value_name = "FILE")]
    config: PathBuf,

    /// Override the configured input directory
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Override the configured assembly strategy
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Concurrent documents; 0 means one per CPU
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct RenameArgs {
    /// Directory holding the PDFs
    #[arg(value_name = "DIR")]
    directory: PathBuf,

    /// Report what would be renamed without touching any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the rename report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Plain-text file, e.g. OCR output
    #[arg(value_name = "TEXT_FILE")]
    text_file: PathBuf,

    /// Known assignee name (repeatable)
    #[arg(short, long = "assignee", value_name = "NAME")]
    assignees: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Page images with an invisible text layer
    FullFidelity,
    /// Recognized text on blank pages
    TextOnly,
}

impl From<StrategyArg> for AssemblyStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::FullFidelity => AssemblyStrategy::FullFidelity,
            StrategyArg::TextOnly => AssemblyStrategy::TextOnly,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_json) {
        eprintln!("Failed to initialise logging: {e:#}");
    }

    let outcome = match cli.command {
        Command::Process(args) => process(args),
        Command::Rename(args) => rename(args),
        Command::Extract(args) => extract(args),
        Command::CheckConfig { config } => check_config(config),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool, json: bool) -> Result<()> {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("a global tracing subscriber is already installed")?;

    tracing_log::LogTracer::init().context("failed to bridge log records into tracing")?;
    Ok(())
}

/// Returns `Ok(false)` when the batch finished with failures or conflicts.
fn process(args: ProcessArgs) -> Result<bool> {
    let mut config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Some(input) = args.input {
        config.input_directory = input.display().to_string();
    }
    if let Some(output) = args.output {
        config.output_directory = output.display().to_string();
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(workers) = args.workers {
        config.worker_count = if workers == 0 {
            available_workers()
        } else {
            workers
        };
    }
    validate_config(&config).context("invalid settings after command-line overrides")?;

    let pipeline_config = Arc::new(PipelineConfig::from_config(&config));
    std::fs::create_dir_all(&pipeline_config.output_directory).with_context(|| {
        format!(
            "creating output directory {}",
            pipeline_config.output_directory.display()
        )
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::Relaxed) {
            return;
        }
        warn!("Interrupt received, finishing documents already in progress");
    })
    .context("installing Ctrl-C handler")?;

    info!(
        "Processing {} with {} worker(s), strategy {}",
        pipeline_config.input_directory.display(),
        pipeline_config.worker_count,
        pipeline_config.strategy.as_str()
    );

    let report = BatchRunner::new(pipeline_config)
        .with_shutdown(shutdown)
        .run()
        .context("scanning input directory")?;

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("serializing batch report")?;
        println!("{out}");
    } else {
        for document in &report.documents {
            println!("{}: {}", document.source_path.display(), document.outcome);
            for warning in &document.warnings {
                println!("    warning: {warning}");
            }
        }
        println!("{}", report.summary());
        if report.interrupted {
            println!("Interrupted: remaining documents were skipped");
        }
    }

    Ok(!report.has_problems())
}

fn rename(args: RenameArgs) -> Result<bool> {
    let report = RenameUtility::new()
        .dry_run(args.dry_run)
        .run(&args.directory)
        .with_context(|| format!("reading {}", args.directory.display()))?;

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("serializing rename report")?;
        println!("{out}");
    } else {
        println!("{}", report.summary());
    }

    Ok(!report.has_problems())
}

fn extract(args: ExtractArgs) -> Result<bool> {
    let text = std::fs::read_to_string(&args.text_file)
        .with_context(|| format!("reading {}", args.text_file.display()))?;

    let extractor = FieldExtractor::new(KnownAssignees::new(args.assignees));
    let record = extractor.extract(&text);
    let filename = document_filename(&record);

    let out = serde_json::to_string_pretty(&json!({
        "record": record,
        "filename": filename,
    }))
    .context("serializing extracted record")?;
    println!("{out}");

    Ok(true)
}

fn check_config(path: PathBuf) -> Result<bool> {
    let config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;
    let pipeline_config = PipelineConfig::from_config(&config);

    println!("{} is valid", path.display());
    println!("  input:      {}", pipeline_config.input_directory.display());
    println!("  output:     {}", pipeline_config.output_directory.display());
    println!("  workers:    {}", pipeline_config.worker_count);
    println!("  strategy:   {}", pipeline_config.strategy.as_str());
    println!("  renderer:   {}", config.renderer.program);
    println!(
        "  rasterizer: {} at {} dpi",
        config.rasterizer.program, config.rasterizer.dpi
    );
    println!(
        "  ocr:        {:?} ({}, psm {})",
        config.ocr.engine, config.ocr.language, config.ocr.page_segmentation_mode
    );
    println!("  assignees:  {}", pipeline_config.assignees.len());

    Ok(true)
}
