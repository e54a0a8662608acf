//! Aggregation engine.
//!
//! Runs the whole pipeline for one invocation: apply the selection, load
//! every selected file, group the surviving series, assign colours and
//! build one summary table per exercise. A file that fails to load is
//! recorded in the skip manifest and never stops the run.

use crate::analysis::colors::ColorAssigner;
use crate::analysis::grouping::{ExerciseGroup, GroupIndex};
use crate::loader::{load_series, LoadError};
use crate::models::{
    AggregationOutcome, AggregationResult, AnnotatedSeries, BandCounts, ClassifiedFile,
    ExerciseSummary, LegendEntry, SeriesRecord, SkipReason, SkippedFile, SummaryTable,
};
use crate::scanner::ScanResult;
use crate::selection::Selection;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Outcome of loading one selected file.
pub type Loaded = (ClassifiedFile, Result<SeriesRecord, LoadError>);

/// Orchestrates loading, grouping, colouring and tabulation.
pub struct AggregationEngine {
    colors: ColorAssigner,
    progress: ProgressBar,
}

impl AggregationEngine {
    /// Create an engine with the given colour configuration.
    pub fn new(colors: ColorAssigner) -> Self {
        Self {
            colors,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-file loading progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run the pipeline, loading files one after another.
    pub fn run(&self, scan: &ScanResult, selection: &Selection) -> AggregationOutcome {
        let selected = match self.select(scan, selection) {
            Ok(files) => files,
            Err(outcome) => return outcome,
        };

        let loaded: Vec<Loaded> = selected
            .into_iter()
            .map(|file| {
                let outcome = load_series(&file.path, file.key.clone());
                self.progress.inc(1);
                (file, outcome)
            })
            .collect();

        self.progress.finish_and_clear();
        AggregationOutcome::Completed(self.aggregate(loaded, scan.unclassified.clone()))
    }

    /// Run the pipeline, loading up to `concurrency` files at a time on the
    /// blocking worker pool.
    ///
    /// Loads are merged back in selection order before grouping, so the
    /// result is identical to [`AggregationEngine::run`].
    pub async fn run_concurrent(
        &self,
        scan: &ScanResult,
        selection: &Selection,
        concurrency: usize,
    ) -> AggregationOutcome {
        let selected = match self.select(scan, selection) {
            Ok(files) => files,
            Err(outcome) => return outcome,
        };

        let loaded: Vec<Loaded> = stream::iter(selected.into_iter().map(|file| {
            let progress = self.progress.clone();
            async move {
                let path = file.path.clone();
                let key = file.key.clone();
                let outcome = tokio::task::spawn_blocking(move || load_series(&path, key))
                    .await
                    .unwrap_or_else(|e| Err(LoadError::Aborted(e.to_string())));
                progress.inc(1);
                (file, outcome)
            }
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

        self.progress.finish_and_clear();
        AggregationOutcome::Completed(self.aggregate(loaded, scan.unclassified.clone()))
    }

    /// Apply the selection, short-circuiting when an axis is empty.
    fn select(
        &self,
        scan: &ScanResult,
        selection: &Selection,
    ) -> Result<Vec<ClassifiedFile>, AggregationOutcome> {
        if let Some(axis) = selection.empty_axis() {
            info!("No {} selected, nothing to do", axis);
            return Err(AggregationOutcome::NothingSelected { axis });
        }

        let selected: Vec<ClassifiedFile> =
            selection.apply(&scan.files).into_iter().cloned().collect();
        info!(
            "{} of {} classified file(s) match the selection",
            selected.len(),
            scan.files.len()
        );
        self.progress.set_length(selected.len() as u64);
        Ok(selected)
    }

    /// Fold per-file load outcomes into the final result.
    pub fn aggregate(
        &self,
        loaded: Vec<Loaded>,
        mut skipped: Vec<SkippedFile>,
    ) -> AggregationResult {
        let files_considered = loaded.len();
        let mut records = Vec::with_capacity(loaded.len());

        for (file, outcome) in loaded {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping {}: {}", file.path.display(), e);
                    skipped.push(SkippedFile {
                        path: file.path.display().to_string(),
                        reason: SkipReason::from(&e),
                    });
                }
            }
        }

        let files_loaded = records.len();
        let index = GroupIndex::build(records);
        debug!("Grouped series into {} exercise(s)", index.len());
        let exercises: Vec<ExerciseSummary> = index
            .into_groups()
            .map(|group| self.summarize(group))
            .collect();

        info!(
            "Aggregated {} series into {} exercise(s); {} file(s) skipped",
            files_loaded,
            exercises.len(),
            skipped.len()
        );

        AggregationResult {
            exercises,
            skipped,
            files_considered,
            files_loaded,
        }
    }

    /// Build the summary for one exercise group.
    fn summarize(&self, group: ExerciseGroup) -> ExerciseSummary {
        let cells = group.cells();
        let subjects: Vec<String> = group.subjects().into_iter().collect();
        let variants = self.colors.palette().sort_variants(group.variants());

        let mut cell_text = Vec::with_capacity(subjects.len());
        let mut cell_bands = Vec::with_capacity(subjects.len());
        for subject in &subjects {
            let mut text_row = Vec::with_capacity(variants.len());
            let mut band_row = Vec::with_capacity(variants.len());
            for variant in &variants {
                let value = cells
                    .get(&(subject.clone(), variant.clone()))
                    .map(|cell| cell.value());
                text_row.push(value.map(|v| format!("{:.0}", v)).unwrap_or_default());
                band_row.push(self.colors.band_for(value));
            }
            cell_text.push(text_row);
            cell_bands.push(band_row);
        }

        let counts = BandCounts::from_bands(cell_bands.iter().flatten());

        let legend = variants
            .iter()
            .map(|variant| LegendEntry {
                variant: variant.clone(),
                color: self.colors.legend_swatch(variant),
            })
            .collect();

        let colors = self.colors.assign_series(&group.records);
        let series = group
            .records
            .into_iter()
            .zip(colors)
            .map(|(record, (color, shade))| AnnotatedSeries {
                record,
                color,
                shade,
            })
            .collect();

        ExerciseSummary {
            exercise: group.exercise,
            series,
            table: SummaryTable {
                subjects,
                variants,
                cell_text,
                cell_bands,
            },
            legend,
            counts,
        }
    }
}
