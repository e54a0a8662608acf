//! FitTally - respirator fit-test aggregation
//!
//! A CLI tool that reads per-trial fit-test CSV files, groups them by
//! exercise and writes threshold-coloured subject × variant tables.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, bad config, unreadable data directory)
//!   3 - A selection axis resolved to nothing
//!   4 - No usable data in the selection

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod report;
mod scanner;
mod selection;

use analysis::AggregationEngine;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{AggregationOutcome, Report, ReportMetadata};
use scanner::{DataScanner, ScanResult};
use selection::Selection;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_NOTHING_SELECTED: i32 = 3;
const EXIT_NO_DATA: i32 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let (config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("FitTally v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run_aggregation(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fittally.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize thresholds, shading and the variant palette.");
    Ok(())
}

/// Initialize logging at the resolved level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete aggregation workflow. Returns the process exit code.
async fn run_aggregation(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Scan and classify the data directory
    let scanner = DataScanner::new(&config.general.data_dir);
    println!("📂 Scanning data directory: {}", scanner.data_dir().display());
    let scan = scanner.scan()?;

    if scan.files.is_empty() {
        println!("   No trial files matching SUBJECT_VARIANT._Action_EXERCISE.csv found.");
        return Ok(EXIT_NO_DATA);
    }

    let options = scan.options();
    println!(
        "   {} trial file(s): {} subject(s), {} variant(s), {} exercise(s)",
        scan.files.len(),
        options.subjects.len(),
        options.variants.len(),
        options.exercises.len()
    );

    // Step 2: Resolve the selection
    let selection = Selection::resolve(&args.subjects, &args.variants, &args.exercises, &options);
    debug!("Selection: {:?}", selection);

    // Handle --dry-run: report what would be loaded and exit
    if args.dry_run {
        return Ok(handle_dry_run(&scan, &selection));
    }

    // Step 3: Load, group and tabulate
    let mut engine = AggregationEngine::new(config.color_assigner());
    if !args.quiet {
        engine = engine.with_progress(progress_bar()?);
    }

    println!("\n🔬 Loading and aggregating trials...");
    let concurrency = config.general.concurrency;
    let outcome = if concurrency == 1 {
        engine.run(&scan, &selection)
    } else {
        engine.run_concurrent(&scan, &selection, concurrency).await
    };

    let result = match outcome {
        AggregationOutcome::NothingSelected { axis } => {
            println!("   No {} selected. Nothing to do.", axis);
            return Ok(EXIT_NOTHING_SELECTED);
        }
        AggregationOutcome::Completed(result) => result,
    };

    if result.matched_nothing() {
        println!("   No files match the selection.");
        return Ok(EXIT_NO_DATA);
    }

    if result.is_empty() {
        println!("   No usable data in the selected files.");
        for skipped in &result.skipped {
            println!("     ⏭️  {} ({})", skipped.path, skipped.reason);
        }
        return Ok(EXIT_NO_DATA);
    }

    // Step 4: Build the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let thresholds = config.thresholds;

    let metadata = ReportMetadata {
        data_dir: scanner.data_dir().display().to_string(),
        analysis_date: Utc::now(),
        files_considered: result.files_considered,
        files_loaded: result.files_loaded,
        files_skipped: result.skipped.len(),
        thresholds: (thresholds.low, thresholds.high),
        duration_seconds: duration,
    };

    let totals = analysis::aggregator::band_totals(&result.exercises);
    let exercise_count = result.exercises.len();

    let report = Report {
        metadata,
        exercises: result.exercises,
        skipped: result.skipped,
    };

    // Step 5: Render and save
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, args.view),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Aggregation Summary:");
    println!(
        "   Files loaded: {} of {}",
        report.metadata.files_loaded, report.metadata.files_considered
    );
    println!("   Files skipped: {}", report.metadata.files_skipped);
    println!("   Exercises: {}", exercise_count);
    println!(
        "   Cells - 🟢 Pass: {} | 🟡 Borderline: {} | 🔴 Fail: {} | ⬜ No data: {}",
        totals.pass, totals.borderline, totals.fail, totals.no_data
    );
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Aggregation complete! Report saved to: {}",
        output_path.display()
    );

    Ok(0)
}

/// Handle --dry-run: print the classification and selection, load nothing.
fn handle_dry_run(scan: &ScanResult, selection: &Selection) -> i32 {
    println!("\n🔍 Dry run: classifying files (nothing is loaded)...\n");

    for file in &scan.files {
        let marker = if selection.matches(&file.key) { "✔" } else { " " };
        println!("     {} 📄 {}", marker, file.key);
    }
    for skipped in &scan.unclassified {
        println!("       ⏭️  {} ({})", skipped.path, skipped.reason);
    }

    if let Some(axis) = selection.empty_axis() {
        println!("\n   No {} selected. Nothing would be loaded.", axis);
        return EXIT_NOTHING_SELECTED;
    }

    let selected = selection.apply(&scan.files);
    println!(
        "\n   {} of {} file(s) would be loaded.",
        selected.len(),
        scan.files.len()
    );
    println!("\n✅ Dry run complete. No files were loaded.");
    0
}

/// Progress bar for per-file loading.
fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Where the configuration came from, logged once logging is up.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    /// The default file exists but could not be used.
    Fallback(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => {
                info!("Loaded default config from {}", CONFIG_FILE_NAME)
            }
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    let (mut config, source) = if let Some(ref config_path) = args.config {
        // Explicit config path must load
        (
            Config::load(config_path)?,
            ConfigSource::Explicit(config_path.clone()),
        )
    } else {
        // Try default location
        match Config::load_default() {
            Ok(Some(config)) => (config, ConfigSource::DefaultFile),
            Ok(None) => (Config::default(), ConfigSource::Builtin),
            Err(e) => (Config::default(), ConfigSource::Fallback(e)),
        }
    };

    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;
    Ok((config, source))
}
