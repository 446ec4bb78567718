//! Top songs or artists for one region and year.

use crate::models::{ArtistYear, TopTrackYear};
use crate::store::Dataset;
use serde::Serialize;
use std::collections::BTreeSet;

pub const MIN_TOP: usize = 10;
pub const MAX_TOP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploreMode {
    Songs,
    Artists,
}

/// Headline numbers for the selected region-year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerKpis {
    pub total_streams: u64,
    pub unique_artists: u64,
    pub unique_tracks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "rows", rename_all = "snake_case")]
pub enum ExplorerRows {
    Songs(Vec<TopTrackYear>),
    Artists(Vec<ArtistYear>),
}

impl ExplorerRows {
    pub fn len(&self) -> usize {
        match self {
            ExplorerRows::Songs(rows) => rows.len(),
            ExplorerRows::Artists(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerView {
    pub region: String,
    pub year: i32,
    /// Present only when the summary table has exactly one row for the selection.
    pub kpis: Option<ExplorerKpis>,
    #[serde(flatten)]
    pub rows: ExplorerRows,
}

/// Regions available for exploration, sorted.
pub fn regions(dataset: &Dataset) -> Vec<String> {
    dataset
        .top_tracks
        .iter()
        .map(|t| t.region.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Build the explorer view for (`region`, `year`).
pub fn explore(
    dataset: &Dataset,
    region: &str,
    year: i32,
    mode: ExploreMode,
    top_n: usize,
) -> ExplorerView {
    let limit = top_n.clamp(MIN_TOP, MAX_TOP);

    let mut summaries = dataset
        .country_year
        .iter()
        .filter(|s| s.region == region && s.year == year);
    let kpis = match (summaries.next(), summaries.next()) {
        (Some(s), None) => Some(ExplorerKpis {
            total_streams: s.total_streams,
            unique_artists: s.unique_artists,
            unique_tracks: s.unique_tracks,
        }),
        _ => None,
    };

    let rows = match mode {
        ExploreMode::Songs => {
            let mut songs: Vec<TopTrackYear> = dataset
                .top_tracks
                .iter()
                .filter(|t| t.region == region && t.year == year)
                .cloned()
                .collect();
            songs.sort_by(|a, b| b.streams.cmp(&a.streams));
            songs.truncate(limit);
            ExplorerRows::Songs(songs)
        }
        ExploreMode::Artists => {
            let mut artists: Vec<ArtistYear> = dataset
                .artists
                .iter()
                .filter(|a| a.region == region && a.year == year)
                .cloned()
                .collect();
            artists.sort_by(|a, b| b.streams.cmp(&a.streams));
            artists.truncate(limit);
            ExplorerRows::Artists(artists)
        }
    };

    ExplorerView {
        region: region.to_string(),
        year,
        kpis,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryYearSummary;

    fn track(region: &str, year: i32, key: &str, streams: u64) -> TopTrackYear {
        TopTrackYear {
            region: region.to_string(),
            year,
            track_key: key.to_string(),
            title: key.to_uppercase(),
            artist: "Artist".to_string(),
            streams,
            best_rank: 1,
            days_on_chart: 1,
            rank_year: 1,
        }
    }

    fn artist(region: &str, year: i32, name: &str, streams: u64) -> ArtistYear {
        ArtistYear {
            region: region.to_string(),
            year,
            artist: name.to_string(),
            streams,
            track_count: 1,
            days_on_chart: 1,
            best_rank: 1,
            rank_year: 1,
        }
    }

    fn dataset() -> Dataset {
        let mut top_tracks = Vec::new();
        for i in 0..30u64 {
            top_tracks.push(track("Global", 2021, &format!("g{}", i), i * 100));
        }
        top_tracks.push(track("Italy", 2021, "i0", 5));
        top_tracks.push(track("Global", 2020, "old", 1_000_000));

        Dataset {
            country_year: vec![CountryYearSummary {
                region: "Global".to_string(),
                year: 2021,
                chart_rows: 73_000,
                unique_tracks: 1_200,
                unique_artists: 650,
                total_streams: 99_000,
                avg_streams: Some(1.0),
            }],
            top_tracks,
            artists: vec![
                artist("Global", 2021, "Low", 10),
                artist("Global", 2021, "High", 1_000),
                artist("Italy", 2021, "Måneskin", 500),
            ],
        }
    }

    #[test]
    fn test_explore_songs() {
        let view = explore(&dataset(), "Global", 2021, ExploreMode::Songs, 10);

        assert!(view.kpis.is_some());
        match view.rows {
            ExplorerRows::Songs(songs) => {
                assert_eq!(songs.len(), 10);
                assert_eq!(songs[0].track_key, "g29");
                assert!(songs.windows(2).all(|w| w[0].streams >= w[1].streams));
                assert!(songs.iter().all(|s| s.year == 2021));
            }
            other => panic!("expected songs, got {:?}", other),
        }
    }

    #[test]
    fn test_explore_artists() {
        let view = explore(&dataset(), "Global", 2021, ExploreMode::Artists, 25);
        match view.rows {
            ExplorerRows::Artists(artists) => {
                let names: Vec<&str> = artists.iter().map(|a| a.artist.as_str()).collect();
                assert_eq!(names, vec!["High", "Low"]);
            }
            other => panic!("expected artists, got {:?}", other),
        }
    }

    #[test]
    fn test_kpis_absent_without_summary() {
        let view = explore(&dataset(), "Italy", 2021, ExploreMode::Songs, 25);
        assert!(view.kpis.is_none());
        assert_eq!(view.rows.len(), 1);
    }

    #[test]
    fn test_top_n_is_clamped() {
        let view = explore(&dataset(), "Global", 2021, ExploreMode::Songs, 1);
        assert_eq!(view.rows.len(), MIN_TOP);
    }

    #[test]
    fn test_regions() {
        assert_eq!(regions(&dataset()), vec!["Global", "Italy"]);
    }

    #[test]
    fn test_json_shape() {
        let view = explore(&dataset(), "Italy", 2021, ExploreMode::Artists, 10);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["mode"], "artists");
        assert_eq!(json["rows"][0]["artist"], "Måneskin");
    }
}
