//! Raw chart record decoding and cleaning.

use crate::models::{ChartRow, DropReason};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// A CSV record as exported by the chart dataset. Every field is optional;
/// columns the tool does not use (such as `trend`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawChartRecord {
    pub title: Option<String>,
    pub rank: Option<String>,
    pub date: Option<String>,
    pub artist: Option<String>,
    pub url: Option<String>,
    pub region: Option<String>,
    pub chart: Option<String>,
    pub streams: Option<String>,
}

/// Which rows the aggregation run wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFilter {
    /// Calendar year to keep.
    pub year: i32,
    /// Chart type, compared case-insensitively.
    pub chart: String,
}

impl ChartFilter {
    pub fn new(year: i32, chart: &str) -> Self {
        Self {
            year,
            chart: chart.trim().to_lowercase(),
        }
    }

    pub fn matches_chart(&self, row: &ChartRow) -> bool {
        row.chart.to_lowercase() == self.chart
    }

    pub fn matches_year(&self, row: &ChartRow) -> bool {
        chrono::Datelike::year(&row.date) == self.year
    }
}

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a chart date, accepting plain dates and common timestamp shapes.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.date_naive())
}

/// Parse a chart position. Integral floats such as "3.0" are accepted;
/// zero, negatives and fractions are not.
pub fn parse_rank(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Ok(rank) = value.parse::<u32>() {
        return (rank > 0).then_some(rank);
    }

    let float = value.parse::<f64>().ok()?;
    if float.is_finite() && float >= 1.0 && float.fract() == 0.0 && float <= u32::MAX as f64 {
        Some(float as u32)
    } else {
        None
    }
}

/// Parse a stream count; anything that is not a non-negative number that
/// fits in a `u64` is absent.
pub fn parse_streams(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(streams) = value.parse::<u64>() {
        return Some(streams);
    }

    let float = value.parse::<f64>().ok()?;
    // `u64::MAX as f64` rounds up to 2^64, which is already out of range
    (float.is_finite() && float >= 0.0 && float < u64::MAX as f64).then(|| float.round() as u64)
}

fn present(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Turn a raw record into a [`ChartRow`], or say why it was dropped.
pub fn clean_record(raw: RawChartRecord) -> Result<ChartRow, DropReason> {
    let date = raw
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or(DropReason::BadDate)?;
    let region = present(raw.region).ok_or(DropReason::MissingRegion)?;
    let chart = present(raw.chart).ok_or(DropReason::MissingChart)?;
    let rank = raw
        .rank
        .as_deref()
        .and_then(parse_rank)
        .ok_or(DropReason::BadRank)?;

    Ok(ChartRow {
        date,
        region,
        chart,
        rank,
        streams: raw.streams.as_deref().and_then(parse_streams),
        title: present(raw.title),
        artist: present(raw.artist),
        url: present(raw.url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawChartRecord {
        RawChartRecord {
            title: Some("Drivers License".to_string()),
            rank: Some("1".to_string()),
            date: Some("2021-01-15".to_string()),
            artist: Some("Olivia Rodrigo".to_string()),
            url: Some("https://open.spotify.com/track/5wANPM4fQCJwkGd4rN57mH".to_string()),
            region: Some("Global".to_string()),
            chart: Some("top200".to_string()),
            streams: Some("7523428".to_string()),
        }
    }

    #[test]
    fn test_clean_record() {
        let row = clean_record(raw()).unwrap();
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2021, 1, 15).unwrap());
        assert_eq!(row.region, "Global");
        assert_eq!(row.rank, 1);
        assert_eq!(row.streams, Some(7_523_428));
    }

    #[test]
    fn test_drop_reasons() {
        let mut r = raw();
        r.date = Some("not a date".to_string());
        assert_eq!(clean_record(r), Err(DropReason::BadDate));

        let mut r = raw();
        r.region = Some("   ".to_string());
        assert_eq!(clean_record(r), Err(DropReason::MissingRegion));

        let mut r = raw();
        r.chart = None;
        assert_eq!(clean_record(r), Err(DropReason::MissingChart));

        let mut r = raw();
        r.rank = Some("".to_string());
        assert_eq!(clean_record(r), Err(DropReason::BadRank));
    }

    #[test]
    fn test_missing_streams_is_not_a_drop() {
        let mut r = raw();
        r.streams = None;
        assert_eq!(clean_record(r).unwrap().streams, None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4);
        assert_eq!(parse_date("2021-03-04"), expected);
        assert_eq!(parse_date("2021-03-04 00:00:00"), expected);
        assert_eq!(parse_date("2021-03-04T12:30:00"), expected);
        assert_eq!(parse_date("03/04/2021"), expected);
        assert_eq!(parse_date("2021-13-04"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_rank() {
        assert_eq!(parse_rank("7"), Some(7));
        assert_eq!(parse_rank(" 12 "), Some(12));
        assert_eq!(parse_rank("3.0"), Some(3));
        assert_eq!(parse_rank("0"), None);
        assert_eq!(parse_rank("-2"), None);
        assert_eq!(parse_rank("2.5"), None);
        assert_eq!(parse_rank("first"), None);
    }

    #[test]
    fn test_parse_streams() {
        assert_eq!(parse_streams("1500"), Some(1500));
        assert_eq!(parse_streams("1500.0"), Some(1500));
        assert_eq!(parse_streams("-5"), None);
        assert_eq!(parse_streams("n/a"), None);
    }

    #[test]
    fn test_parse_streams_out_of_range_is_absent() {
        assert_eq!(parse_streams("1e20"), None);
        assert_eq!(parse_streams("18446744073709551616"), None);
        assert_eq!(parse_streams("18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_streams("1e6"), Some(1_000_000));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = ChartFilter::new(2021, "TOP200");
        let mut row = clean_record(raw()).unwrap();
        assert!(filter.matches_chart(&row));
        assert!(filter.matches_year(&row));

        row.chart = "viral50".to_string();
        assert!(!filter.matches_chart(&row));

        row.date = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        assert!(!filter.matches_year(&row));
    }
}
