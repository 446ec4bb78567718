//! Raw chart ingestion.
//!
//! Locates chart CSV files, streams their records through the cleaning
//! pass and keeps the rows for the target chart type and year.

pub mod clean;

pub use clean::{clean_record, ChartFilter, RawChartRecord};

use crate::models::{ChartRow, IngestStats};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File name the public chart dataset ships its table under.
pub const DATASET_FILE: &str = "charts.csv";

const PROGRESS_EVERY: u64 = 100_000;

/// Resolve the input path into the CSV files to read.
///
/// A file is used as-is. A directory is searched recursively: files named
/// `charts.csv` win, otherwise every `*.csv` file is used, sorted by path.
pub fn resolve_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!("Input not found: {}", path.display());
    }

    let mut csv_files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    csv_files.sort();

    let dataset_files: Vec<PathBuf> = csv_files
        .iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some(DATASET_FILE))
        .cloned()
        .collect();

    let selected = if dataset_files.is_empty() {
        csv_files
    } else {
        dataset_files
    };

    if selected.is_empty() {
        anyhow::bail!("No CSV files found under {}", path.display());
    }

    debug!("Resolved {} input file(s) under {}", selected.len(), path.display());
    Ok(selected)
}

/// Read and clean chart rows from CSV data, keeping rows the filter accepts.
pub fn read_chart_rows<R: Read>(
    reader: R,
    filter: &ChartFilter,
    stats: &mut IngestStats,
    progress: &ProgressBar,
) -> Result<Vec<ChartRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut rows = Vec::new();

    for result in rdr.deserialize::<RawChartRecord>() {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                stats.malformed += 1;
                continue;
            }
        };

        stats.records += 1;
        if stats.records % PROGRESS_EVERY == 0 {
            progress.set_message(format!("{} records read, {} kept", stats.records, stats.kept));
        }

        let row = match clean_record(raw) {
            Ok(row) => row,
            Err(reason) => {
                stats.record_drop(reason);
                continue;
            }
        };

        if !filter.matches_chart(&row) {
            stats.other_chart += 1;
            continue;
        }
        if !filter.matches_year(&row) {
            stats.other_year += 1;
            continue;
        }

        stats.kept += 1;
        rows.push(row);
    }

    Ok(rows)
}

/// Load every input file and return the rows for the filter's chart and year.
pub fn load_chart_rows(
    paths: &[PathBuf],
    filter: &ChartFilter,
    show_progress: bool,
) -> Result<(Vec<ChartRow>, IngestStats)> {
    let progress = if show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut stats = IngestStats::default();
    let mut rows = Vec::new();

    for path in paths {
        info!("Reading: {}", path.display());
        progress.set_message(format!("reading {}", path.display()));

        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        let mut file_rows = read_chart_rows(file, filter, &mut stats, &progress)
            .with_context(|| format!("Failed to read chart rows from {}", path.display()))?;

        stats.files += 1;
        rows.append(&mut file_rows);
    }

    progress.finish_and_clear();

    if stats.dropped() > 0 {
        debug!(
            "Dropped {} rows: {} bad date, {} missing region, {} missing chart, {} missing rank",
            stats.dropped(),
            stats.bad_date,
            stats.missing_region,
            stats.missing_chart,
            stats.bad_rank
        );
    }
    info!(
        "Kept {} of {} records ({} other chart, {} other year)",
        stats.kept, stats.records, stats.other_chart, stats.other_year
    );

    Ok((rows, stats))
}
