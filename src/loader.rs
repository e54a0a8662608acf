//! Trial CSV loading and cleaning.
//!
//! A trial file carries a `Time` column (`HH:MM:SS`) and a `FitFactor`
//! column; any other columns are ignored. Rows with an unparsable time or a
//! missing, zero or negative fit factor are dropped.

use crate::analysis::aggregator::{arithmetic_mean, geometric_mean};
use crate::models::{CleanedSeries, SeriesRecord, SkipReason, TrialKey};
use chrono::{NaiveTime, Timelike};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the time-of-day column.
pub const TIME_COLUMN: &str = "Time";

/// Name of the fit factor column.
pub const FIT_FACTOR_COLUMN: &str = "FitFactor";

/// Why a single file could not produce a series.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("no usable data after cleaning")]
    NoUsableData,

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("loader task failed: {0}")]
    Aborted(String),
}

impl From<&LoadError> for SkipReason {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::Io { source, .. } => SkipReason::Unreadable {
                message: source.to_string(),
            },
            LoadError::MissingColumns { missing } => SkipReason::MissingColumns {
                missing: missing.clone(),
            },
            LoadError::NoUsableData => SkipReason::NoUsableData,
            LoadError::Csv(e) => SkipReason::Csv {
                message: e.to_string(),
            },
            LoadError::Aborted(message) => SkipReason::Unreadable {
                message: message.clone(),
            },
        }
    }
}

/// Parse a `HH:MM:SS` clock reading into seconds since midnight.
pub fn parse_clock(value: &str) -> Option<u32> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M:%S").ok()?;
    // chrono encodes a `:60` leap second as second 59 plus an extra second of nanos
    if time.nanosecond() >= 1_000_000_000 {
        return None;
    }
    Some(time.hour() * 3600 + time.minute() * 60 + time.second())
}

/// Parse a fit factor; only finite, strictly positive values are usable.
pub fn parse_fit_factor(value: &str) -> Option<f64> {
    let ff: f64 = value.trim().parse().ok()?;
    (ff.is_finite() && ff > 0.0).then_some(ff)
}

/// Load one trial file.
pub fn load_series(path: &Path, key: TrialKey) -> Result<SeriesRecord, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record = read_series(file, key)?;
    debug!(
        "Loaded {}: {} samples, mean {:.1}, gm {:.1}",
        path.display(),
        record.series.len(),
        record.mean,
        record.geometric_mean
    );
    Ok(record)
}

/// Read and clean a trial from any CSV source.
pub fn read_series<R: Read>(source: R, key: TrialKey) -> Result<SeriesRecord, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let time_idx = headers.iter().position(|h| h == TIME_COLUMN);
    let ff_idx = headers.iter().position(|h| h == FIT_FACTOR_COLUMN);

    let (time_idx, ff_idx) = match (time_idx, ff_idx) {
        (Some(t), Some(f)) => (t, f),
        (t, f) => {
            let mut missing = Vec::new();
            if t.is_none() {
                missing.push(TIME_COLUMN.to_string());
            }
            if f.is_none() {
                missing.push(FIT_FACTOR_COLUMN.to_string());
            }
            return Err(LoadError::MissingColumns { missing });
        }
    };

    let mut readings = Vec::new();
    let mut dropped = 0usize;
    for row in reader.records() {
        let row = row?;
        let secs = row.get(time_idx).and_then(parse_clock);
        let ff = row.get(ff_idx).and_then(parse_fit_factor);
        match (secs, ff) {
            (Some(secs), Some(ff)) => readings.push((secs, ff)),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("{}: dropped {} invalid row(s)", key, dropped);
    }

    let series = CleanedSeries::from_absolute(readings).ok_or(LoadError::NoUsableData)?;
    let values: Vec<f64> = series.fit_factors().collect();
    let mean = arithmetic_mean(&values).ok_or(LoadError::NoUsableData)?;
    let geometric_mean = geometric_mean(&values).ok_or(LoadError::NoUsableData)?;

    Ok(SeriesRecord {
        key,
        series,
        mean,
        geometric_mean,
    })
}
