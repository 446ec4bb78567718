//! An artist's yearly streams across regions.

use crate::models::{is_global, ArtistYear, GLOBAL_REGION};
use crate::store::Dataset;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Artists offered for trend selection.
pub const ARTIST_CHOICES: usize = 500;

/// Regions shown when the caller selects none.
pub const FALLBACK_REGIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub streams: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub region: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsView {
    pub artist: String,
    /// Regions the artist appears in, sorted.
    pub available_regions: Vec<String>,
    pub series: Vec<TrendSeries>,
}

/// Sum streams by key, then order descending; ties keep ascending key order.
fn ranked_totals<'a>(items: impl Iterator<Item = (&'a str, u64)>) -> Vec<(&'a str, u64)> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for (key, streams) in items {
        let total = totals.entry(key).or_default();
        *total = total.saturating_add(streams);
    }

    let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Artists ranked by streams summed over every region and year.
pub fn artist_choices(dataset: &Dataset, limit: usize) -> Vec<(String, u64)> {
    ranked_totals(dataset.artists.iter().map(|a| (a.artist.as_str(), a.streams)))
        .into_iter()
        .take(limit)
        .map(|(artist, streams)| (artist.to_string(), streams))
        .collect()
}

/// Build the yearly series for `artist` in the selected regions.
///
/// Unknown regions are ignored. With `include_global` the Global baseline
/// is put first whenever the artist has Global rows. If nothing is
/// selected the artist's five biggest regions are shown.
pub fn trends(dataset: &Dataset, artist: &str, regions: &[String], include_global: bool) -> TrendsView {
    let rows: Vec<&ArtistYear> = dataset.artists.iter().filter(|a| a.artist == artist).collect();

    let available: BTreeSet<&str> = rows.iter().map(|a| a.region.as_str()).collect();

    let mut selected: Vec<&str> = Vec::new();
    for region in regions {
        let region = region.as_str();
        if available.contains(region) && !selected.contains(&region) {
            selected.push(region);
        }
    }

    if include_global && available.contains(GLOBAL_REGION) && !selected.iter().any(|r| is_global(r)) {
        selected.insert(0, GLOBAL_REGION);
    }

    if selected.is_empty() {
        selected = ranked_totals(rows.iter().map(|a| (a.region.as_str(), a.streams)))
            .into_iter()
            .take(FALLBACK_REGIONS)
            .map(|(region, _)| region)
            .collect();
    }

    let series = selected
        .iter()
        .map(|region| {
            let mut points: Vec<TrendPoint> = rows
                .iter()
                .filter(|a| a.region == *region)
                .map(|a| TrendPoint {
                    year: a.year,
                    streams: a.streams,
                })
                .collect();
            points.sort_by_key(|p| p.year);

            TrendSeries {
                region: region.to_string(),
                points,
            }
        })
        .collect();

    TrendsView {
        artist: artist.to_string(),
        available_regions: available.into_iter().map(String::from).collect(),
        series,
    }
}
