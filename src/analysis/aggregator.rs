//! Summary statistics.
//!
//! Means over fit factors, cell averaging, and cross-exercise tallies used
//! by the report.

use crate::models::{Band, BandCounts, ExerciseSummary};

/// Arithmetic mean; `None` for an empty slice.
pub fn arithmetic_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Geometric mean (`exp(mean(ln x))`); `None` for an empty slice or any
/// non-positive value.
pub fn geometric_mean(values: &[f64]) -> Option<f64> {
    if values.iter().any(|v| *v <= 0.0) {
        return None;
    }
    let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
    arithmetic_mean(&logs).map(f64::exp)
}

/// Value of a cell built from per-series means.
///
/// Duplicate trials for the same subject and variant are folded into one
/// value by averaging their means; a single mean is returned unchanged.
pub fn mean_of_means(means: &[f64]) -> Option<f64> {
    match means {
        [single] => Some(*single),
        _ => arithmetic_mean(means),
    }
}

/// Total band counts across all exercises.
pub fn band_totals(exercises: &[ExerciseSummary]) -> BandCounts {
    let mut totals = BandCounts::default();
    for exercise in exercises {
        totals.add(&exercise.counts);
    }
    totals
}

/// A filled cell located by exercise, subject and variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRef<'a> {
    pub exercise: &'a str,
    pub subject: &'a str,
    pub variant: &'a str,
    pub text: &'a str,
    pub band: Band,
}

/// Every failing cell across all exercises, in table order.
pub fn failing_cells(exercises: &[ExerciseSummary]) -> Vec<CellRef<'_>> {
    let mut cells = Vec::new();
    for exercise in exercises {
        let table = &exercise.table;
        for (row, subject) in table.subjects.iter().enumerate() {
            for (col, variant) in table.variants.iter().enumerate() {
                let band = table.cell_bands[row][col];
                if band == Band::Fail {
                    cells.push(CellRef {
                        exercise: &exercise.exercise,
                        subject,
                        variant,
                        text: &table.cell_text[row][col],
                        band,
                    });
                }
            }
        }
    }
    cells
}
