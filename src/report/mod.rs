//! Report generation modules.
//!
//! Renders backfill run summaries and view results as Markdown or JSON.

pub mod generator;

pub use generator::*;

use crate::models::IngestStats;
use crate::store::MergeOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Summary of one backfill run.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillReport {
    pub run_date: DateTime<Utc>,
    pub year: i32,
    pub chart: String,
    pub inputs: Vec<PathBuf>,
    pub exports_dir: PathBuf,
    pub ingest: IngestStats,
    /// Regions with at least one qualifying row.
    pub regions: usize,
    pub country_year_rows: usize,
    pub top_track_rows: usize,
    pub artist_rows: usize,
    pub dry_run: bool,
    /// One entry per table written; empty on a dry run.
    pub tables: Vec<MergeOutcome>,
    pub duration_seconds: f64,
}
