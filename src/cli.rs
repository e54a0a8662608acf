//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// FitTally - respirator fit-test aggregation
///
/// Reads a directory of per-trial fit-test CSV files named
/// `SUBJECT_VARIANT._Action_EXERCISE.csv` and writes one threshold-coloured
/// cross-tab table per exercise.
///
/// Examples:
///   fittally --data-dir Data
///   fittally --subjects alice,bob --exercises cough --format json
///   fittally --view tables --output tables.md
///   fittally --dry-run
///   fittally --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the trial CSV files
    ///
    /// Defaults to the config file setting, or `Data`.
    #[arg(short, long, value_name = "DIR", env = "FITTALLY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Subjects to include (comma-separated, `all` or `none`)
    #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = "all")]
    pub subjects: Vec<String>,

    /// Variants (masks) to include (comma-separated, `all` or `none`)
    #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = "all")]
    pub variants: Vec<String>,

    /// Exercises to include (comma-separated, `all` or `none`)
    #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = "all")]
    pub exercises: Vec<String>,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting, or `fittally_report.md`.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Report layout (plots: tables plus series listings, tables: tables only)
    #[arg(long, default_value = "plots", value_name = "VIEW")]
    pub view: ViewMode,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fittally.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of files loaded concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Dry run: scan and classify files without loading them
    ///
    /// Shows which files the selection would load and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .fittally.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Layout of the Markdown report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewMode {
    /// Tables plus per-series listings (default)
    #[default]
    #[value(alias = "plot", alias = "p")]
    Plots,
    /// Tables only
    #[value(alias = "table", alias = "t")]
    Tables,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate concurrency
        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate data directory if provided
        if let Some(ref dir) = self.data_dir {
            if !dir.exists() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Data path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data_dir: None,
            subjects: vec!["all".to_string()],
            variants: vec!["all".to_string()],
            exercises: vec!["all".to_string()],
            output: None,
            format: OutputFormat::Markdown,
            view: ViewMode::Plots,
            config: None,
            verbose: false,
            quiet: false,
            concurrency: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_selection_lists() {
        let args = Args::try_parse_from([
            "fittally",
            "--subjects",
            "Alice,Bob",
            "--exercises",
            "none",
            "--view",
            "t",
        ])
        .unwrap();
        assert_eq!(args.subjects, vec!["Alice", "Bob"]);
        assert_eq!(args.variants, vec!["all"]);
        assert_eq!(args.exercises, vec!["none"]);
        assert_eq!(args.view, ViewMode::Tables);
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/definitely/not/a/real/dir"));
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }
}
