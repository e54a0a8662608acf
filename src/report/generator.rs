//! Markdown and JSON report generation.
//!
//! This module renders the per-exercise summaries produced by the
//! aggregation engine into a Markdown document or a JSON dump.

use crate::analysis::aggregator::{band_totals, failing_cells};
use crate::analysis::colors::text_color;
use crate::cli::ViewMode;
use crate::models::{Band, ExerciseSummary, Report, ReportMetadata, SkippedFile};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, view: ViewMode) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# FitTally Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.exercises));
    output.push_str(&generate_exercises_section(&report.exercises, view));
    output.push_str(&generate_skipped_section(&report.skipped));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Files Considered:** {}\n",
        metadata.files_considered
    ));
    section.push_str(&format!("- **Files Loaded:** {}\n", metadata.files_loaded));
    if metadata.files_skipped > 0 {
        section.push_str(&format!("- **Files Skipped:** {}\n", metadata.files_skipped));
    }
    let (low, high) = metadata.thresholds;
    section.push_str(&format!(
        "- **Thresholds:** fail < {}, pass ≥ {}\n",
        low, high
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Exercises](#exercises)\n");

    for exercise in &report.exercises {
        toc.push_str(&format!(
            "  - [{}](#{})\n",
            exercise.exercise,
            anchor(&exercise.exercise)
        ));
    }

    if !report.skipped.is_empty() {
        toc.push_str("- [Skipped Files](#skipped-files)\n");
    }

    toc.push('\n');

    toc
}

fn anchor(label: &str) -> String {
    label.replace(['/', '.', ' ', '_'], "-").to_lowercase()
}

/// Generate the summary section.
fn generate_summary_section(exercises: &[ExerciseSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    // Band breakdown
    let totals = band_totals(exercises);
    section.push_str("### Band Breakdown\n\n");
    section.push_str(&format!(
        "| {} Pass | {} Borderline | {} Fail | **Cells** |\n",
        Band::Pass.emoji(),
        Band::Borderline.emoji(),
        Band::Fail.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        totals.pass,
        totals.borderline,
        totals.fail,
        totals.filled()
    ));

    // Per exercise
    if !exercises.is_empty() {
        section.push_str("### By Exercise\n\n");
        section.push_str("| Exercise | Series | Pass | Borderline | Fail |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
        for exercise in exercises {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                exercise.exercise,
                exercise.series.len(),
                exercise.counts.pass,
                exercise.counts.borderline,
                exercise.counts.fail
            ));
        }
        section.push('\n');
    }

    // Failing cells
    let failing = failing_cells(exercises);
    if !failing.is_empty() {
        section.push_str("### Failing Cells\n\n");
        section.push_str("| Exercise | Subject | Variant | Fit Factor |\n");
        section.push_str("|:---|:---|:---|:---:|\n");
        for cell in failing {
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                cell.exercise, cell.subject, cell.variant, cell.text
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the exercises section.
fn generate_exercises_section(exercises: &[ExerciseSummary], view: ViewMode) -> String {
    let mut section = String::new();

    section.push_str("## Exercises\n\n");

    if exercises.is_empty() {
        section.push_str("No exercise produced usable data.\n\n");
        return section;
    }

    section.push_str(&generate_band_key());

    for exercise in exercises {
        section.push_str(&generate_exercise_block(exercise, view));
    }

    section
}

/// Cell fill and text colour for each band.
fn generate_band_key() -> String {
    let mut key = String::new();

    key.push_str("| Band | Fill | Text |\n");
    key.push_str("|:---|:---:|:---:|\n");
    for band in [Band::Pass, Band::Borderline, Band::Fail] {
        let fill = band.fill();
        let text = text_color(&fill).map(|c| c.to_hex()).unwrap_or_default();
        key.push_str(&format!(
            "| {} {} | `{}` | `{}` |\n",
            band.emoji(),
            band,
            fill.to_hex(),
            text
        ));
    }
    key.push('\n');

    key
}

/// Generate the block for a single exercise.
fn generate_exercise_block(exercise: &ExerciseSummary, view: ViewMode) -> String {
    let mut block = String::new();
    let table = &exercise.table;

    block.push_str(&format!(
        "### {} {{#{}}}\n\n",
        exercise.exercise,
        anchor(&exercise.exercise)
    ));

    // Legend
    let swatches: Vec<String> = exercise
        .legend
        .iter()
        .map(|entry| format!("{} `{}`", entry.variant, entry.color.to_hex()))
        .collect();
    block.push_str(&format!("**Variant Colours:** {}\n\n", swatches.join(" · ")));

    // Cross-tab table
    block.push_str("| Subject |");
    for variant in &table.variants {
        block.push_str(&format!(" {} |", variant));
    }
    block.push_str("\n|:---|");
    for _ in &table.variants {
        block.push_str(":---:|");
    }
    block.push('\n');

    for (row, subject) in table.subjects.iter().enumerate() {
        block.push_str(&format!("| **{}** |", subject));
        for (col, text) in table.cell_text[row].iter().enumerate() {
            let band = table.cell_bands[row][col];
            if band == Band::NoData {
                block.push_str(" |");
            } else {
                block.push_str(&format!(" {} {} |", band.emoji(), text));
            }
        }
        block.push('\n');
    }
    block.push('\n');

    if view == ViewMode::Plots {
        block.push_str(&generate_series_table(exercise));
    }

    block.push_str("---\n\n");

    block
}

/// Generate the per-series listing for one exercise.
fn generate_series_table(exercise: &ExerciseSummary) -> String {
    let mut section = String::new();

    section.push_str("#### Series\n\n");
    section.push_str("| Series | Colour | Samples | Duration (s) | Mean | Geo. Mean |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");

    for series in &exercise.series {
        let record = &series.record;
        section.push_str(&format!(
            "| `{}` | `{}` | {} | {} | {:.1} | {:.1} |\n",
            record.key.label(),
            series.color.to_hex(),
            record.series.len(),
            record.series.duration_seconds(),
            record.mean,
            record.geometric_mean
        ));
    }
    section.push('\n');

    section
}

/// Generate the skipped-file manifest.
fn generate_skipped_section(skipped: &[SkippedFile]) -> String {
    if skipped.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Skipped Files\n\n");
    section.push_str("| File | Reason |\n");
    section.push_str("|:---|:---|\n");
    for file in skipped {
        section.push_str(&format!("| `{}` | {} |\n", file.path, file.reason));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by FitTally*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
