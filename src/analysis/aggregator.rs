//! Yearly chart aggregation.
//!
//! Turns cleaned daily chart rows for one year into the three yearly
//! summary tables: per-region statistics, top tracks and top artists.

use crate::models::{ArtistYear, ChartRow, CountryYearSummary, TopTrackYear};
use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

/// Tracks kept per region-year.
pub const TRACK_LIMIT: usize = 500;

/// Artists kept per region-year.
pub const ARTIST_LIMIT: usize = 200;

/// The three tables produced for one year.
#[derive(Debug, Clone, Default)]
pub struct YearlyTables {
    pub country_year: Vec<CountryYearSummary>,
    pub top_tracks: Vec<TopTrackYear>,
    pub artists: Vec<ArtistYear>,
}

/// Build all yearly tables from rows already filtered to `year` and the target chart.
pub fn aggregate(
    rows: &[ChartRow],
    year: i32,
    track_limit: usize,
    artist_limit: usize,
) -> YearlyTables {
    YearlyTables {
        country_year: summarize_country_year(rows, year),
        top_tracks: top_tracks(rows, year, track_limit),
        artists: top_artists(rows, year, artist_limit),
    }
}

#[derive(Default)]
struct RegionStats<'a> {
    chart_rows: u64,
    tracks: HashSet<&'a str>,
    artists: HashSet<&'a str>,
    streams_sum: u64,
    streams_reported: u64,
}

/// Group rows by region and compute the per-region statistics.
///
/// Rows without a stream count are left out of both the sum and the mean,
/// so a region where no row reported streams gets `total_streams == 0` and
/// `avg_streams == None`.
pub fn summarize_country_year(rows: &[ChartRow], year: i32) -> Vec<CountryYearSummary> {
    let mut regions: BTreeMap<&str, RegionStats<'_>> = BTreeMap::new();

    for row in rows {
        let stats = regions.entry(row.region.as_str()).or_default();
        stats.chart_rows += 1;

        if let Some(key) = row.track_key() {
            stats.tracks.insert(key);
        }
        if let Some(artist) = row.artist.as_deref() {
            stats.artists.insert(artist);
        }
        if let Some(streams) = row.streams {
            stats.streams_sum = stats.streams_sum.saturating_add(streams);
            stats.streams_reported += 1;
        }
    }

    regions
        .into_iter()
        .map(|(region, stats)| CountryYearSummary {
            region: region.to_string(),
            year,
            chart_rows: stats.chart_rows,
            unique_tracks: stats.tracks.len() as u64,
            unique_artists: stats.artists.len() as u64,
            total_streams: stats.streams_sum,
            avg_streams: (stats.streams_reported > 0)
                .then(|| stats.streams_sum as f64 / stats.streams_reported as f64),
        })
        .collect()
}

/// Running totals for one track or artist group.
#[derive(Default)]
struct Tally<'a> {
    streams: u64,
    best_rank: Option<u32>,
    dates: HashSet<NaiveDate>,
    tracks: HashSet<&'a str>,
}

impl<'a> Tally<'a> {
    fn add(&mut self, row: &'a ChartRow) {
        self.streams = self.streams.saturating_add(row.streams.unwrap_or(0));
        self.best_rank = Some(match self.best_rank {
            Some(best) => best.min(row.rank),
            None => row.rank,
        });
        self.dates.insert(row.date);
        if let Some(key) = row.track_key() {
            self.tracks.insert(key);
        }
    }

    /// Fold another group's totals into this one.
    fn absorb(&mut self, other: Tally<'a>) {
        self.streams = self.streams.saturating_add(other.streams);
        self.best_rank = match (self.best_rank, other.best_rank) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.dates.extend(other.dates);
        self.tracks.extend(other.tracks);
    }

    fn best_rank(&self) -> u32 {
        self.best_rank.unwrap_or(u32::MAX)
    }
}

/// All title/artist variants charted under one track key in one region.
struct TrackGroup<'a> {
    title: &'a str,
    artist: &'a str,
    /// Streams of the variant whose metadata is kept.
    label_streams: u64,
    tally: Tally<'a>,
}

/// Rank groups within each region by summed streams and keep the first `limit`.
///
/// `groups` iterates region-major, so each region's members arrive in
/// grouping order. The sort is stable: equal stream totals keep that order.
fn rank_within_regions<'a, K, T>(
    groups: BTreeMap<(&'a str, K), Tally<'a>>,
    limit: usize,
    mut build: impl FnMut(&'a str, K, Tally<'a>, u32) -> T,
) -> Vec<T>
where
    K: Ord,
{
    let mut by_region: Vec<(&'a str, Vec<(K, Tally<'a>)>)> = Vec::new();
    for ((region, key), tally) in groups {
        match by_region.last_mut() {
            Some((current, members)) if *current == region => members.push((key, tally)),
            _ => by_region.push((region, vec![(key, tally)])),
        }
    }

    let mut ranked = Vec::new();
    for (region, mut members) in by_region {
        members.sort_by(|a, b| b.1.streams.cmp(&a.1.streams));

        for (position, (key, tally)) in members.into_iter().take(limit).enumerate() {
            ranked.push(build(region, key, tally, position as u32 + 1));
        }
    }

    ranked
}

/// Top tracks per region by summed yearly streams.
///
/// Tracks are grouped by (region, track key, title, artist); rows missing
/// any of those do not form a group. Variants sharing a track key in one
/// region are then folded into a single track so the key stays unique.
/// The folded track keeps the title and artist of its most-streamed
/// variant, the first in grouping order on a tie.
pub fn top_tracks(rows: &[ChartRow], year: i32, limit: usize) -> Vec<TopTrackYear> {
    let mut variants: BTreeMap<(&str, (&str, &str, &str)), Tally<'_>> = BTreeMap::new();

    for row in rows {
        let (Some(key), Some(title), Some(artist)) =
            (row.track_key(), row.title.as_deref(), row.artist.as_deref())
        else {
            continue;
        };

        variants
            .entry((row.region.as_str(), (key, title, artist)))
            .or_default()
            .add(row);
    }

    let mut tracks: BTreeMap<(&str, &str), TrackGroup<'_>> = BTreeMap::new();
    for ((region, (key, title, artist)), tally) in variants {
        match tracks.entry((region, key)) {
            Entry::Vacant(slot) => {
                slot.insert(TrackGroup {
                    title,
                    artist,
                    label_streams: tally.streams,
                    tally,
                });
            }
            Entry::Occupied(mut slot) => {
                let group = slot.get_mut();
                if tally.streams > group.label_streams {
                    group.title = title;
                    group.artist = artist;
                    group.label_streams = tally.streams;
                }
                group.tally.absorb(tally);
            }
        }
    }

    let groups: BTreeMap<(&str, (&str, &str, &str)), Tally<'_>> = tracks
        .into_iter()
        .map(|((region, key), group)| ((region, (key, group.title, group.artist)), group.tally))
        .collect();

    rank_within_regions(groups, limit, |region, (key, title, artist), tally, rank_year| {
        TopTrackYear {
            region: region.to_string(),
            year,
            track_key: key.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            streams: tally.streams,
            best_rank: tally.best_rank(),
            days_on_chart: tally.dates.len() as u64,
            rank_year,
        }
    })
}

/// Top artists per region by summed yearly streams.
pub fn top_artists(rows: &[ChartRow], year: i32, limit: usize) -> Vec<ArtistYear> {
    let mut groups: BTreeMap<(&str, &str), Tally<'_>> = BTreeMap::new();

    for row in rows {
        let Some(artist) = row.artist.as_deref() else {
            continue;
        };
        groups
            .entry((row.region.as_str(), artist))
            .or_default()
            .add(row);
    }

    rank_within_regions(groups, limit, |region, artist, tally, rank_year| ArtistYear {
        region: region.to_string(),
        year,
        artist: artist.to_string(),
        streams: tally.streams,
        track_count: tally.tracks.len() as u64,
        days_on_chart: tally.dates.len() as u64,
        best_rank: tally.best_rank(),
        rank_year,
    })
}
