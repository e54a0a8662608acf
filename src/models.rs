//! Data models for fit-test aggregation.
//!
//! This module contains the core data structures shared by the loader,
//! the aggregation engine and the report renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identity of one trial, as encoded in its file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialKey {
    /// Person wearing the equipment.
    pub subject: String,
    /// Equipment / mask identifier.
    pub variant: String,
    /// Exercise performed during the trial.
    pub exercise: String,
}

impl TrialKey {
    pub fn new(
        subject: impl Into<String>,
        variant: impl Into<String>,
        exercise: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            variant: variant.into(),
            exercise: exercise.into(),
        }
    }

    /// Rebuild the canonical file name for this trial.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}._Action_{}.csv",
            self.subject, self.variant, self.exercise
        )
    }

    /// Short series label used in legends ("subject_variant").
    pub fn label(&self) -> String {
        format!("{}_{}", self.subject, self.variant)
    }
}

impl fmt::Display for TrialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.subject, self.variant, self.exercise)
    }
}

/// A file whose name matched the trial naming pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// Metadata parsed from the file name.
    pub key: TrialKey,
}

/// One cleaned reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the first valid reading of the trial.
    pub elapsed_seconds: u32,
    /// Fit factor, always strictly positive.
    pub fit_factor: f64,
}

/// Time-ordered readings with elapsed time relative to the start of the trial.
///
/// Elapsed times are non-decreasing and the first one is zero; every fit
/// factor is strictly positive. The only way to build one is
/// [`CleanedSeries::from_absolute`], which enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedSeries {
    samples: Vec<Sample>,
}

impl CleanedSeries {
    /// Build a series from readings stamped with absolute seconds-of-day.
    ///
    /// Non-positive or non-finite fit factors are dropped. Returns `None`
    /// when nothing survives.
    pub fn from_absolute(readings: impl IntoIterator<Item = (u32, f64)>) -> Option<Self> {
        let mut readings: Vec<(u32, f64)> = readings
            .into_iter()
            .filter(|(_, ff)| ff.is_finite() && *ff > 0.0)
            .collect();

        // Stable: equal timestamps keep file order
        readings.sort_by_key(|(secs, _)| *secs);

        let start = readings.first()?.0;
        let samples = readings
            .into_iter()
            .map(|(secs, fit_factor)| Sample {
                elapsed_seconds: secs - start,
                fit_factor,
            })
            .collect();

        Some(Self { samples })
    }

    #[allow(dead_code)] // Accessor for plotting backends
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Elapsed time of the last reading.
    pub fn duration_seconds(&self) -> u32 {
        self.samples.last().map(|s| s.elapsed_seconds).unwrap_or(0)
    }

    pub fn fit_factors(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.fit_factor)
    }
}

/// One loaded trial: identity, cleaned readings and summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub key: TrialKey,
    pub series: CleanedSeries,
    /// Arithmetic mean of the fit factors (used for banding).
    pub mean: f64,
    /// Geometric mean of the fit factors (reported only).
    pub geometric_mean: f64,
}

/// Threshold band of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// At or above the high threshold.
    Pass,
    /// Between the thresholds.
    Borderline,
    /// Below the low threshold.
    Fail,
    /// No data for this cell.
    NoData,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Pass => write!(f, "Pass"),
            Band::Borderline => write!(f, "Borderline"),
            Band::Fail => write!(f, "Fail"),
            Band::NoData => write!(f, "No data"),
        }
    }
}

impl Band {
    /// Returns an emoji representation of the band.
    pub fn emoji(&self) -> &'static str {
        match self {
            Band::Pass => "🟢",
            Band::Borderline => "🟡",
            Band::Fail => "🔴",
            Band::NoData => "",
        }
    }
}

/// An RGBA colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(1.0, 1.0, 1.0, 0.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            1.0,
        )
    }

    /// Linear interpolation towards `other` (`t` in `0.0..=1.0`).
    pub fn lerp(&self, other: &Rgba, t: f64) -> Rgba {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Perceived brightness (ITU-R BT.601 luma weights).
    pub fn brightness(&self) -> f64 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0.0
    }

    /// `#rrggbb` hex string (alpha ignored).
    pub fn to_hex(&self) -> String {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

/// A loaded series with its display colour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedSeries {
    #[serde(flatten)]
    pub record: SeriesRecord,
    /// Display colour for plotting.
    pub color: Rgba,
    /// Shade intensity within the variant's colour family.
    pub shade: f64,
}

/// Cross-tab table of cell values for one exercise.
///
/// `cell_text` and `cell_bands` are row-major: one row per subject, one
/// column per variant, aligned to the two axes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryTable {
    pub subjects: Vec<String>,
    pub variants: Vec<String>,
    pub cell_text: Vec<Vec<String>>,
    pub cell_bands: Vec<Vec<Band>>,
}

impl SummaryTable {
    /// Look up a cell by axis labels.
    #[allow(dead_code)] // Lookup by labels
    pub fn cell(&self, subject: &str, variant: &str) -> Option<(&str, Band)> {
        let row = self.subjects.iter().position(|s| s == subject)?;
        let col = self.variants.iter().position(|v| v == variant)?;
        Some((self.cell_text[row][col].as_str(), self.cell_bands[row][col]))
    }
}

/// Legend swatch for one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendEntry {
    pub variant: String,
    pub color: Rgba,
}

/// Count of table cells per band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub pass: usize,
    pub borderline: usize,
    pub fail: usize,
    pub no_data: usize,
}

impl BandCounts {
    /// Tally a sequence of bands.
    pub fn from_bands<'a>(bands: impl IntoIterator<Item = &'a Band>) -> Self {
        let mut counts = Self::default();
        for band in bands {
            match band {
                Band::Pass => counts.pass += 1,
                Band::Borderline => counts.borderline += 1,
                Band::Fail => counts.fail += 1,
                Band::NoData => counts.no_data += 1,
            }
        }
        counts
    }

    /// Cells that carry a value.
    pub fn filled(&self) -> usize {
        self.pass + self.borderline + self.fail
    }

    pub fn add(&mut self, other: &BandCounts) {
        self.pass += other.pass;
        self.borderline += other.borderline;
        self.fail += other.fail;
        self.no_data += other.no_data;
    }
}

/// Everything a renderer needs for one exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub exercise: String,
    /// Series in encounter order.
    pub series: Vec<AnnotatedSeries>,
    pub table: SummaryTable,
    pub legend: Vec<LegendEntry>,
    pub counts: BandCounts,
}

/// Why a file was left out of the aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// File name does not follow the trial naming pattern.
    Unclassified,
    /// Required columns are absent.
    MissingColumns { missing: Vec<String> },
    /// No valid rows remained after cleaning.
    NoUsableData,
    /// The file could not be opened or read.
    Unreadable { message: String },
    /// The CSV structure could not be parsed.
    Csv { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unclassified => write!(f, "name does not match the trial pattern"),
            SkipReason::MissingColumns { missing } => {
                write!(f, "missing column(s): {}", missing.join(", "))
            }
            SkipReason::NoUsableData => write!(f, "no usable data"),
            SkipReason::Unreadable { message } => write!(f, "unreadable: {}", message),
            SkipReason::Csv { message } => write!(f, "malformed CSV: {}", message),
        }
    }
}

/// A file left out of the aggregation, for the diagnostics manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of one completed aggregation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationResult {
    /// One summary per exercise with data, sorted by exercise label.
    pub exercises: Vec<ExerciseSummary>,
    /// Files left out, in the order they were encountered.
    pub skipped: Vec<SkippedFile>,
    /// Selected files handed to the loader.
    pub files_considered: usize,
    /// Files that produced a series.
    pub files_loaded: usize,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// True when no classified file matched the selection at all.
    pub fn matched_nothing(&self) -> bool {
        self.files_considered == 0
    }

    #[allow(dead_code)] // Lookup by exercise label
    pub fn exercise(&self, name: &str) -> Option<&ExerciseSummary> {
        self.exercises.iter().find(|e| e.exercise == name)
    }
}

/// Selection axis, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionAxis {
    Subjects,
    Variants,
    Exercises,
}

impl fmt::Display for SelectionAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionAxis::Subjects => write!(f, "subjects"),
            SelectionAxis::Variants => write!(f, "variants"),
            SelectionAxis::Exercises => write!(f, "exercises"),
        }
    }
}

/// Terminal outcome of an aggregation run.
#[derive(Debug, Clone)]
pub enum AggregationOutcome {
    /// A selection axis resolved to the empty set; no work was done.
    NothingSelected { axis: SelectionAxis },
    /// The run completed (the result may still be empty).
    Completed(AggregationResult),
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Directory the trials were read from.
    pub data_dir: String,
    /// Date and time of the run.
    pub analysis_date: DateTime<Utc>,
    /// Selected files handed to the loader.
    pub files_considered: usize,
    /// Files that produced a series.
    pub files_loaded: usize,
    /// Files left out (including unclassified names).
    pub files_skipped: usize,
    /// Low / high band thresholds in effect.
    pub thresholds: (f64, f64),
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete fit-test report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub exercises: Vec<ExerciseSummary>,
    pub skipped: Vec<SkippedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_key_file_name() {
        let key = TrialKey::new("Alice", "FFP3", "Cough");
        assert_eq!(key.file_name(), "Alice_FFP3._Action_Cough.csv");
        assert_eq!(key.label(), "Alice_FFP3");
    }

    #[test]
    fn test_cleaned_series_shifts_to_zero() {
        let series =
            CleanedSeries::from_absolute(vec![(3610, 20.0), (3600, 10.0), (3605, 15.0)]).unwrap();
        let elapsed: Vec<u32> = series.samples().iter().map(|s| s.elapsed_seconds).collect();
        assert_eq!(elapsed, vec![0, 5, 10]);
        assert_eq!(series.duration_seconds(), 10);
        assert_eq!(series.fit_factors().collect::<Vec<_>>(), vec![10.0, 15.0, 20.0]);
    }

    #[test]
    fn test_cleaned_series_drops_non_positive() {
        let series =
            CleanedSeries::from_absolute(vec![(10, 0.0), (20, -3.0), (30, 5.0), (40, f64::NAN)])
                .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.samples()[0].elapsed_seconds, 0);

        assert!(CleanedSeries::from_absolute(vec![(10, 0.0), (20, -1.0)]).is_none());
        assert!(CleanedSeries::from_absolute(Vec::new()).is_none());
    }

    #[test]
    fn test_cleaned_series_stable_on_equal_times() {
        let series = CleanedSeries::from_absolute(vec![(5, 2.0), (5, 1.0), (4, 3.0)]).unwrap();
        let ff: Vec<f64> = series.fit_factors().collect();
        assert_eq!(ff, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_rgba_hex_and_brightness() {
        assert_eq!(Rgba::from_rgb8(255, 128, 0).to_hex(), "#ff8000");
        assert_eq!(Rgba::BLACK.brightness(), 0.0);
        assert!((Rgba::WHITE.brightness() - 1.0).abs() < 1e-12);
        assert!(Rgba::TRANSPARENT.is_transparent());
    }

    #[test]
    fn test_rgba_lerp_endpoints() {
        let a = Rgba::BLACK;
        let b = Rgba::WHITE;
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5).r, 0.5);
    }

    #[test]
    fn test_band_counts() {
        let bands = [Band::Pass, Band::Fail, Band::Fail, Band::NoData];
        let counts = BandCounts::from_bands(bands.iter());
        assert_eq!(counts.pass, 1);
        assert_eq!(counts.fail, 2);
        assert_eq!(counts.no_data, 1);
        assert_eq!(counts.filled(), 3);
    }

    #[test]
    fn test_summary_table_lookup() {
        let table = SummaryTable {
            subjects: vec!["Alice".into(), "Bob".into()],
            variants: vec!["FFP3".into()],
            cell_text: vec![vec!["1500".into()], vec!["50".into()]],
            cell_bands: vec![vec![Band::Pass], vec![Band::Fail]],
        };
        assert_eq!(table.cell("Bob", "FFP3"), Some(("50", Band::Fail)));
        assert_eq!(table.cell("Carol", "FFP3"), None);
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::MissingColumns {
            missing: vec!["Time".into(), "FitFactor".into()],
        };
        assert_eq!(reason.to_string(), "missing column(s): Time, FitFactor");
    }
}
