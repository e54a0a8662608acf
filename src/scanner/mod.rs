//! Data directory scanner.
//!
//! Lists the top level of the data directory, classifies every `.csv`
//! entry by its file name, and collects the subjects, variants and
//! exercises available for selection.

pub mod classifier;

pub use classifier::{classify, Classification};

use crate::models::{ClassifiedFile, SkipReason, SkippedFile};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of scanning a data directory.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Files whose names matched the trial pattern, sorted by file name.
    pub files: Vec<ClassifiedFile>,
    /// `.csv` files whose names did not match.
    pub unclassified: Vec<SkippedFile>,
}

/// Distinct values found on each selection axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableOptions {
    pub subjects: BTreeSet<String>,
    pub variants: BTreeSet<String>,
    pub exercises: BTreeSet<String>,
}

impl ScanResult {
    /// Collect the distinct subjects, variants and exercises.
    pub fn options(&self) -> AvailableOptions {
        let mut options = AvailableOptions::default();
        for file in &self.files {
            options.subjects.insert(file.key.subject.clone());
            options.variants.insert(file.key.variant.clone());
            options.exercises.insert(file.key.exercise.clone());
        }
        options
    }
}

/// Scanner for a directory of trial CSV files.
pub struct DataScanner {
    data_dir: PathBuf,
}

impl DataScanner {
    /// Create a new scanner rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Scan the directory.
    ///
    /// Fails only when the directory itself is missing or unreadable;
    /// individual entries that cannot be inspected are logged and ignored.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.data_dir.exists() {
            anyhow::bail!("Data directory not found: {}", self.data_dir.display());
        }
        if !self.data_dir.is_dir() {
            anyhow::bail!("Data path is not a directory: {}", self.data_dir.display());
        }
        std::fs::read_dir(&self.data_dir).with_context(|| {
            format!("Failed to read data directory: {}", self.data_dir.display())
        })?;

        let mut result = ScanResult::default();

        let walker = WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Cannot inspect entry in {}: {}", self.data_dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if !is_csv(&name) {
                continue;
            }

            match classify(&name) {
                Classification::Matched(key) => {
                    debug!("Classified {} as {}", name, key);
                    result.files.push(ClassifiedFile {
                        path: entry.into_path(),
                        key,
                    });
                }
                Classification::Unclassified => {
                    warn!("Skipping {}: name does not match the trial pattern", name);
                    result.unclassified.push(SkippedFile {
                        path: entry.path().display().to_string(),
                        reason: SkipReason::Unclassified,
                    });
                }
            }
        }

        Ok(result)
    }
}

fn is_csv(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}
