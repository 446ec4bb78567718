//! Per-country view of one year.

use crate::models::{is_global, CountryYearSummary};
use crate::store::Dataset;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Smallest and largest ranking sizes the world view produces.
pub const MIN_TOP: usize = 3;
pub const MAX_TOP: usize = 25;

/// Metric countries are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldMetric {
    TotalStreams,
    UniqueArtists,
    UniqueTracks,
    AvgStreams,
}

impl WorldMetric {
    /// The metric's value for one summary row; `None` for a missing mean.
    pub fn value(&self, row: &CountryYearSummary) -> Option<f64> {
        match self {
            WorldMetric::TotalStreams => Some(row.total_streams as f64),
            WorldMetric::UniqueArtists => Some(row.unique_artists as f64),
            WorldMetric::UniqueTracks => Some(row.unique_tracks as f64),
            WorldMetric::AvgStreams => row.avg_streams,
        }
    }
}

impl fmt::Display for WorldMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldMetric::TotalStreams => write!(f, "Total Streams"),
            WorldMetric::UniqueArtists => write!(f, "Unique Artists"),
            WorldMetric::UniqueTracks => write!(f, "Unique Tracks"),
            WorldMetric::AvgStreams => write!(f, "Average Streams"),
        }
    }
}

/// Headline numbers across all countries of the year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldKpis {
    pub total_streams: u64,
    pub countries: usize,
    /// Sum of per-country unique artists.
    pub unique_artists: u64,
    /// Sum of per-country unique tracks.
    pub unique_tracks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub region: String,
    pub total_streams: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldRow {
    pub region: String,
    pub metric_value: Option<f64>,
    pub total_streams: u64,
    pub unique_artists: u64,
    pub unique_tracks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldView {
    pub year: i32,
    pub metric: WorldMetric,
    pub kpis: WorldKpis,
    /// Country with the most streams.
    pub highlight: Option<Highlight>,
    pub top: Vec<WorldRow>,
}

/// Descending by metric, rows without a value last.
fn by_metric_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Build the world view for `year`. "Global" is not a country and is left out.
pub fn world_view(dataset: &Dataset, year: i32, metric: WorldMetric, top_n: usize) -> WorldView {
    let rows: Vec<&CountryYearSummary> = dataset
        .country_year
        .iter()
        .filter(|r| r.year == year && !is_global(&r.region))
        .collect();

    let kpis = WorldKpis {
        total_streams: rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.total_streams)),
        countries: rows.iter().map(|r| r.region.as_str()).collect::<HashSet<_>>().len(),
        unique_artists: rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.unique_artists)),
        unique_tracks: rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.unique_tracks)),
    };

    let highlight = rows
        .iter()
        .copied()
        .reduce(|best, r| if r.total_streams > best.total_streams { r } else { best })
        .map(|r| Highlight {
            region: r.region.clone(),
            total_streams: r.total_streams,
        });

    let mut ranked = rows;
    ranked.sort_by(|a, b| by_metric_desc(metric.value(a), metric.value(b)));

    let top = ranked
        .into_iter()
        .take(top_n.clamp(MIN_TOP, MAX_TOP))
        .map(|r| WorldRow {
            region: r.region.clone(),
            metric_value: metric.value(r),
            total_streams: r.total_streams,
            unique_artists: r.unique_artists,
            unique_tracks: r.unique_tracks,
        })
        .collect();

    WorldView {
        year,
        metric,
        kpis,
        highlight,
        top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(region: &str, year: i32, total_streams: u64, unique_artists: u64) -> CountryYearSummary {
        CountryYearSummary {
            region: region.to_string(),
            year,
            chart_rows: 10,
            unique_tracks: unique_artists * 2,
            unique_artists,
            total_streams,
            avg_streams: (total_streams > 0).then(|| total_streams as f64 / 10.0),
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            country_year: vec![
                summary("Global", 2021, 10_000, 90),
                summary("Brazil", 2021, 900, 40),
                summary("Germany", 2021, 700, 60),
                summary("Chile", 2021, 0, 5),
                summary("Brazil", 2020, 5_000, 1),
            ],
            ..Dataset::default()
        }
    }

    #[test]
    fn test_world_view_excludes_global() {
        let view = world_view(&dataset(), 2021, WorldMetric::TotalStreams, 10);

        assert_eq!(view.kpis.countries, 3);
        assert_eq!(view.kpis.total_streams, 1_600);
        assert_eq!(view.kpis.unique_artists, 105);
        assert!(view.top.iter().all(|r| r.region != "Global"));
        assert_eq!(
            view.highlight,
            Some(Highlight {
                region: "Brazil".to_string(),
                total_streams: 900
            })
        );
    }

    #[test]
    fn test_world_view_ranks_by_metric() {
        let view = world_view(&dataset(), 2021, WorldMetric::UniqueArtists, 10);
        let order: Vec<&str> = view.top.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(order, vec!["Germany", "Brazil", "Chile"]);
        assert_eq!(view.top[0].metric_value, Some(60.0));
    }

    #[test]
    fn test_missing_mean_sorts_last() {
        let view = world_view(&dataset(), 2021, WorldMetric::AvgStreams, 10);
        assert_eq!(view.top.last().map(|r| r.region.as_str()), Some("Chile"));
        assert_eq!(view.top.last().and_then(|r| r.metric_value), None);
    }

    #[test]
    fn test_top_n_is_clamped() {
        let mut data = dataset();
        for i in 0..40 {
            data.country_year.push(summary(&format!("Country {}", i), 2021, i, 1));
        }

        assert_eq!(world_view(&data, 2021, WorldMetric::TotalStreams, 1).top.len(), MIN_TOP);
        assert_eq!(world_view(&data, 2021, WorldMetric::TotalStreams, 500).top.len(), MAX_TOP);
    }

    #[test]
    fn test_unknown_year_is_empty() {
        let view = world_view(&dataset(), 1999, WorldMetric::TotalStreams, 10);
        assert!(view.top.is_empty());
        assert_eq!(view.highlight, None);
        assert_eq!(view.kpis, WorldKpis::default());
    }

    #[test]
    fn test_kpi_totals_saturate() {
        let data = Dataset {
            country_year: vec![summary("Brazil", 2021, u64::MAX, 1), summary("Chile", 2021, 7, 1)],
            ..Dataset::default()
        };

        let view = world_view(&data, 2021, WorldMetric::TotalStreams, 10);
        assert_eq!(view.kpis.total_streams, u64::MAX);
    }
}
