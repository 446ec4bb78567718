//! Data models for the chart aggregator.
//!
//! This module contains the cleaned chart observation and the three
//! yearly summary rows that end up in the persisted exports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Region value that stands for the worldwide aggregate.
pub const GLOBAL_REGION: &str = "Global";

/// Returns true for the worldwide "Global" sentinel region.
pub fn is_global(region: &str) -> bool {
    region == GLOBAL_REGION
}

/// One cleaned (track, region, date) observation from a daily chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    /// Chart day.
    pub date: NaiveDate,
    /// Country name or "Global".
    pub region: String,
    /// Chart type, e.g. "top200".
    pub chart: String,
    /// Chart position (1 = best).
    pub rank: u32,
    /// Stream count for the day, if reported.
    pub streams: Option<u64>,
    /// Track title.
    pub title: Option<String>,
    /// Artist credit as printed on the chart.
    pub artist: Option<String>,
    /// Stable track URL.
    pub url: Option<String>,
}

impl ChartRow {
    /// Stable track identifier: the URL, or the title when no URL is present.
    pub fn track_key(&self) -> Option<&str> {
        self.url.as_deref().or(self.title.as_deref())
    }
}

/// Per (region, year) chart statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryYearSummary {
    pub region: String,
    pub year: i32,
    /// Number of chart rows observed.
    pub chart_rows: u64,
    /// Distinct track keys.
    pub unique_tracks: u64,
    /// Distinct artists.
    pub unique_artists: u64,
    /// Sum of reported streams (rows without streams are excluded).
    pub total_streams: u64,
    /// Mean of reported streams; `None` when no row reported streams.
    pub avg_streams: Option<f64>,
}

/// A track's yearly performance within one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTrackYear {
    pub region: String,
    pub year: i32,
    pub track_key: String,
    pub title: String,
    pub artist: String,
    /// Summed yearly streams.
    pub streams: u64,
    /// Best (lowest) chart position reached.
    pub best_rank: u32,
    /// Distinct chart days.
    pub days_on_chart: u64,
    /// 1-based position within the region-year by descending streams.
    pub rank_year: u32,
}

/// An artist's yearly performance within one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistYear {
    pub region: String,
    pub year: i32,
    pub artist: String,
    pub streams: u64,
    /// Distinct track keys credited to the artist.
    pub track_count: u64,
    pub days_on_chart: u64,
    pub best_rank: u32,
    pub rank_year: u32,
}

/// Why a raw record did not become a [`ChartRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Date missing or unparseable.
    BadDate,
    MissingRegion,
    MissingChart,
    /// Rank missing or not a positive integer.
    BadRank,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::BadDate => write!(f, "unparseable date"),
            DropReason::MissingRegion => write!(f, "missing region"),
            DropReason::MissingChart => write!(f, "missing chart"),
            DropReason::BadRank => write!(f, "missing rank"),
        }
    }
}

/// Counters collected while reading raw chart files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Files read.
    pub files: usize,
    /// Records decoded from CSV.
    pub records: u64,
    /// Records the CSV reader could not decode.
    pub malformed: u64,
    pub bad_date: u64,
    pub missing_region: u64,
    pub missing_chart: u64,
    pub bad_rank: u64,
    /// Clean rows for another chart type.
    pub other_chart: u64,
    /// Clean rows dated outside the target year.
    pub other_year: u64,
    /// Rows handed to the aggregator.
    pub kept: u64,
}

impl IngestStats {
    /// Count one dropped record.
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::BadDate => self.bad_date += 1,
            DropReason::MissingRegion => self.missing_region += 1,
            DropReason::MissingChart => self.missing_chart += 1,
            DropReason::BadRank => self.bad_rank += 1,
        }
    }

    /// Total records discarded by the cleaning pass.
    pub fn dropped(&self) -> u64 {
        self.bad_date + self.missing_region + self.missing_chart + self.bad_rank
    }
}
