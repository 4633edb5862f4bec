// src/main.rs
mod config;
mod extractors;
mod pipeline;
mod sanitizer;
mod storage;
mod ted;
mod utils;
mod validation;

use clap::Parser;
use config::{PipelineConfig, Strictness};
use pipeline::NoticePipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::StorageManager;
use utils::AppError;
use validation::{LookupTables, SchemaValidator};

/// Extracts, sanitizes and validates TED procurement notices.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory holding YYYY-MM partitions of notice XML files
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Only process these years (all when omitted)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    years: Vec<u32>,

    /// Only process these months, 1-12 (all when omitted)
    #[arg(long, num_args = 1.., value_delimiter = ',', value_parser = clap::value_parser!(u32).range(1..=12))]
    months: Vec<u32>,

    /// JSON file of lookup tables; membership checks are skipped without it
    #[arg(short, long)]
    lookups: Option<PathBuf>,

    /// Output directory for records and reports
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// How cardinality and value-shape violations are handled
    #[arg(long, value_enum, default_value_t = Strictness::Standard)]
    strictness: Strictness,

    /// Processing budget per document, in milliseconds
    #[arg(long, default_value_t = 5000)]
    budget_ms: u64,

    /// Also write the pruned raw extraction record of each document
    #[arg(long)]
    dump_raw: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging("info");

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting run with args: {:?}", args);

    // 3. Check the input root and budget before doing any work
    if !args.input_dir.is_dir() {
        return Err(AppError::missing_input(args.input_dir));
    }
    if args.budget_ms == 0 {
        return Err(AppError::Config("--budget-ms must be greater than zero".to_string()));
    }

    // 4. Load lookup tables (optional)
    let lookups = match &args.lookups {
        Some(path) => LookupTables::from_path(path)?,
        None => {
            tracing::warn!("No lookup tables given; only structural checks will run");
            LookupTables::default()
        }
    };

    // 5. Build the pipeline and storage
    let config = PipelineConfig {
        strictness: args.strictness,
        document_budget: Duration::from_millis(args.budget_ms),
        keep_raw: args.dump_raw,
    };
    let pipeline = NoticePipeline::new(config, SchemaValidator::new(Arc::new(lookups)));
    let storage = StorageManager::new(&args.output_dir)?;

    // 6. Discover notice files in the selected partitions
    let files = ted::corpus::discover(&args.input_dir, &args.years, &args.months)?;
    tracing::info!("Found {} notices under {}", files.len(), args.input_dir.display());
    if files.is_empty() {
        return Err(AppError::Config(format!(
            "No notice files found under {} for the selected partitions",
            args.input_dir.display()
        )));
    }

    // 7. Process each notice, then persist records, reports and the run summary
    let outcome = pipeline.run(&files).await;
    let summary = storage.save_outcome(&outcome, args.strictness)?;

    tracing::info!(
        "Processing finished. Processed: {} (flagged: {}), Failures: {}, Diagnostics: {}",
        summary.processed,
        summary.flagged,
        summary.failed,
        summary.diagnostics
    );

    // Nothing usable came out of the run
    if summary.processed == 0 && summary.failed > 0 {
        return Err(AppError::Processing(format!("All {} notices failed", summary.failed)));
    }

    Ok(())
}
