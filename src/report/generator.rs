//! Markdown and JSON rendering.

use super::BackfillReport;
use crate::views::{ExplorerRows, ExplorerView, TrendsView, WorldView};
use anyhow::Result;
use serde::Serialize;

/// Format a count with thousands separators.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v >= 0.0 => format_count(v as u64),
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// Escape pipes so free text does not break a Markdown table.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate a JSON document for any report or view.
pub fn generate_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Generate the Markdown summary of a backfill run.
pub fn generate_backfill_markdown(report: &BackfillReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Backfill {} ({})\n\n", report.year, report.chart));

    output.push_str("## Run\n\n");
    output.push_str(&format!(
        "- **Run Date:** {}\n",
        report.run_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for input in &report.inputs {
        output.push_str(&format!("- **Input:** `{}`\n", input.display()));
    }
    output.push_str(&format!("- **Exports:** `{}`\n", report.exports_dir.display()));
    if report.dry_run {
        output.push_str("- **Dry Run:** exports were not modified\n");
    }
    output.push_str(&format!("- **Duration:** {:.1}s\n\n", report.duration_seconds));

    let ingest = &report.ingest;
    output.push_str("## Input Rows\n\n");
    output.push_str("| Records | Kept | Dropped | Malformed | Other Chart | Other Year |\n");
    output.push_str("|---:|---:|---:|---:|---:|---:|\n");
    output.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} |\n\n",
        format_count(ingest.records),
        format_count(ingest.kept),
        format_count(ingest.dropped()),
        format_count(ingest.malformed),
        format_count(ingest.other_chart),
        format_count(ingest.other_year),
    ));

    output.push_str("## Aggregates\n\n");
    output.push_str(&format!("- **Regions:** {}\n", report.regions));
    output.push_str(&format!("- **Country-year rows:** {}\n", report.country_year_rows));
    output.push_str(&format!("- **Top track rows:** {}\n", report.top_track_rows));
    output.push_str(&format!("- **Artist rows:** {}\n\n", report.artist_rows));

    if !report.tables.is_empty() {
        output.push_str("## Exports Written\n\n");
        output.push_str("| Table | Before | New | After |\n");
        output.push_str("|:---|---:|---:|---:|\n");
        for table in &report.tables {
            let before = table
                .existing_rows
                .map(|n| format_count(n as u64))
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                table.table,
                before,
                format_count(table.new_rows as u64),
                format_count(table.merged_rows as u64)
            ));
        }
        output.push('\n');
    }

    output
}

/// Generate the Markdown world view.
pub fn generate_world_markdown(view: &WorldView) -> String {
    let mut output = String::new();

    output.push_str(&format!("# World View: {}\n\n", view.year));

    output.push_str(&format!(
        "| Total Streams | Countries | Unique Artists (sum) | Unique Tracks (sum) |\n\
         |---:|---:|---:|---:|\n\
         | {} | {} | {} | {} |\n\n",
        format_count(view.kpis.total_streams),
        view.kpis.countries,
        format_count(view.kpis.unique_artists),
        format_count(view.kpis.unique_tracks),
    ));

    if let Some(ref top) = view.highlight {
        output.push_str(&format!(
            "> **{} highlight:** {} led with **{}** total streams.\n\n",
            view.year,
            top.region,
            format_count(top.total_streams)
        ));
    }

    output.push_str(&format!("## Top {} Countries by {}\n\n", view.top.len(), view.metric));

    if view.top.is_empty() {
        output.push_str("No countries found for this year.\n");
        return output;
    }

    output.push_str(&format!(
        "| # | Country | {} | Total Streams | Unique Artists | Unique Tracks |\n",
        view.metric
    ));
    output.push_str("|---:|:---|---:|---:|---:|---:|\n");
    for (i, row) in view.top.iter().enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            cell(&row.region),
            format_optional(row.metric_value),
            format_count(row.total_streams),
            format_count(row.unique_artists),
            format_count(row.unique_tracks)
        ));
    }

    output
}

/// Generate the Markdown explorer view.
pub fn generate_explorer_markdown(view: &ExplorerView) -> String {
    let mut output = String::new();

    let heading = match view.rows {
        ExplorerRows::Songs(_) => "Top Songs",
        ExplorerRows::Artists(_) => "Top Artists",
    };
    output.push_str(&format!("# {} - {} ({})\n\n", heading, view.region, view.year));

    if let Some(ref kpis) = view.kpis {
        output.push_str("| Total Streams | Unique Artists | Unique Tracks |\n");
        output.push_str("|---:|---:|---:|\n");
        output.push_str(&format!(
            "| {} | {} | {} |\n\n",
            format_count(kpis.total_streams),
            format_count(kpis.unique_artists),
            format_count(kpis.unique_tracks)
        ));
    }

    if view.rows.is_empty() {
        output.push_str("No rows for this selection.\n");
        return output;
    }

    match &view.rows {
        ExplorerRows::Songs(songs) => {
            output.push_str("| # | Track | Artist | Streams | Best Rank | Days Charted |\n");
            output.push_str("|---:|:---|:---|---:|---:|---:|\n");
            for (i, song) in songs.iter().enumerate() {
                output.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    i + 1,
                    cell(&song.title),
                    cell(&song.artist),
                    format_count(song.streams),
                    song.best_rank,
                    song.days_on_chart
                ));
            }
        }
        ExplorerRows::Artists(artists) => {
            output.push_str("| # | Artist | Streams | Best Rank | Tracks | Days Charted |\n");
            output.push_str("|---:|:---|---:|---:|---:|---:|\n");
            for (i, artist) in artists.iter().enumerate() {
                output.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    i + 1,
                    cell(&artist.artist),
                    format_count(artist.streams),
                    artist.best_rank,
                    artist.track_count,
                    artist.days_on_chart
                ));
            }
        }
    }

    output
}

/// Generate the Markdown trends view.
pub fn generate_trends_markdown(view: &TrendsView) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {} - Streams Over Time\n\n", view.artist));

    if view.series.is_empty() {
        output.push_str("No chart data for this artist.\n");
        return output;
    }

    let mut years: Vec<i32> = view
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.year))
        .collect();
    years.sort_unstable();
    years.dedup();

    output.push_str("| Region |");
    for year in &years {
        output.push_str(&format!(" {} |", year));
    }
    output.push_str("\n|:---|");
    output.push_str(&"---:|".repeat(years.len()));
    output.push('\n');

    for series in &view.series {
        output.push_str(&format!("| {} |", cell(&series.region)));
        for year in &years {
            let value = series
                .points
                .iter()
                .find(|p| p.year == *year)
                .map(|p| format_count(p.streams))
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(" {} |", value));
        }
        output.push('\n');
    }

    output
}

/// Generate the Markdown list of artists available for trends.
pub fn generate_artist_choices_markdown(choices: &[(String, u64)]) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Top {} Artists\n\n", choices.len()));
    output.push_str("| # | Artist | Streams |\n");
    output.push_str("|---:|:---|---:|\n");
    for (i, (artist, streams)) in choices.iter().enumerate() {
        output.push_str(&format!("| {} | {} | {} |\n", i + 1, cell(artist), format_count(*streams)));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngestStats, TopTrackYear};
    use crate::store::{MergeOutcome, TableKind};
    use crate::views::trends::{TrendPoint, TrendSeries};
    use crate::views::world::{Highlight, WorldKpis, WorldMetric, WorldRow};
    use chrono::Utc;
    use std::path::PathBuf;

    fn create_backfill_report(dry_run: bool) -> BackfillReport {
        BackfillReport {
            run_date: Utc::now(),
            year: 2021,
            chart: "top200".to_string(),
            inputs: vec![PathBuf::from("data/charts.csv")],
            exports_dir: PathBuf::from("exports"),
            ingest: IngestStats {
                files: 1,
                records: 26_173_514,
                kept: 5_000_000,
                bad_rank: 12,
                ..IngestStats::default()
            },
            regions: 70,
            country_year_rows: 70,
            top_track_rows: 35_000,
            artist_rows: 14_000,
            dry_run,
            tables: if dry_run {
                Vec::new()
            } else {
                vec![MergeOutcome {
                    table: TableKind::CountryYear,
                    path: PathBuf::from("exports/country_year_summary.parquet"),
                    existing_rows: Some(280),
                    new_rows: 70,
                    merged_rows: 350,
                }]
            },
            duration_seconds: 12.5,
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(26_173_514), "26,173,514");
    }

    #[test]
    fn test_generate_backfill_markdown() {
        let markdown = generate_backfill_markdown(&create_backfill_report(false));

        assert!(markdown.contains("# Backfill 2021 (top200)"));
        assert!(markdown.contains("26,173,514"));
        assert!(markdown.contains("`country_year_summary`"));
        assert!(markdown.contains("| 280 | 70 | 350 |"));
        assert!(!markdown.contains("Dry Run"));
    }

    #[test]
    fn test_dry_run_has_no_exports_section() {
        let markdown = generate_backfill_markdown(&create_backfill_report(true));
        assert!(markdown.contains("Dry Run"));
        assert!(!markdown.contains("## Exports Written"));
    }

    #[test]
    fn test_generate_world_markdown() {
        let view = WorldView {
            year: 2021,
            metric: WorldMetric::TotalStreams,
            kpis: WorldKpis {
                total_streams: 1_500,
                countries: 1,
                unique_artists: 10,
                unique_tracks: 20,
            },
            highlight: Some(Highlight {
                region: "Brazil".to_string(),
                total_streams: 1_500,
            }),
            top: vec![WorldRow {
                region: "Brazil".to_string(),
                metric_value: Some(1_500.0),
                total_streams: 1_500,
                unique_artists: 10,
                unique_tracks: 20,
            }],
        };

        let markdown = generate_world_markdown(&view);
        assert!(markdown.contains("# World View: 2021"));
        assert!(markdown.contains("Brazil led with **1,500**"));
        assert!(markdown.contains("| 1 | Brazil | 1,500 |"));
    }

    #[test]
    fn test_generate_explorer_markdown_escapes_pipes() {
        let view = ExplorerView {
            region: "Global".to_string(),
            year: 2021,
            kpis: None,
            rows: ExplorerRows::Songs(vec![TopTrackYear {
                region: "Global".to_string(),
                year: 2021,
                track_key: "k".to_string(),
                title: "Left | Right".to_string(),
                artist: "Duo".to_string(),
                streams: 10,
                best_rank: 2,
                days_on_chart: 3,
                rank_year: 1,
            }]),
        };

        let markdown = generate_explorer_markdown(&view);
        assert!(markdown.contains("# Top Songs - Global (2021)"));
        assert!(markdown.contains("Left \\| Right"));
    }

    #[test]
    fn test_generate_trends_markdown() {
        let view = TrendsView {
            artist: "Bad Bunny".to_string(),
            available_regions: vec!["Global".to_string(), "Spain".to_string()],
            series: vec![
                TrendSeries {
                    region: "Global".to_string(),
                    points: vec![
                        TrendPoint { year: 2020, streams: 2_500 },
                        TrendPoint { year: 2021, streams: 3_000 },
                    ],
                },
                TrendSeries {
                    region: "Spain".to_string(),
                    points: vec![TrendPoint { year: 2021, streams: 450 }],
                },
            ],
        };

        let markdown = generate_trends_markdown(&view);
        assert!(markdown.contains("| Region | 2020 | 2021 |"));
        assert!(markdown.contains("| Global | 2,500 | 3,000 |"));
        assert!(markdown.contains("| Spain | - | 450 |"));
    }

    #[test]
    fn test_generate_json() {
        let json = generate_json(&create_backfill_report(false)).unwrap();
        assert!(json.contains("\"year\": 2021"));
        assert!(json.contains("\"country_year\""));
        assert!(json.contains("\"existing_rows\": 280"));
    }
}
