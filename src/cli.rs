//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chartfold - yearly aggregation of streaming chart exports
///
/// Rolls raw daily chart rows up into yearly per-country summaries, top
/// tracks and top artists, merges them into Parquet exports, and answers
/// world / explorer / trend questions over those exports.
///
/// Examples:
///   chartfold backfill --input ~/datasets/spotify-charts --year 2021
///   chartfold backfill --input charts.csv --year 2020 --dry-run
///   chartfold world --year 2021 --metric unique-artists --top 15
///   chartfold explore --region Brazil --mode artists --format json
///   chartfold trends --artist "Bad Bunny" --region Mexico --region Spain
///   chartfold trends
///   chartfold init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .chartfold.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the Parquet exports
    #[arg(long, value_name = "DIR", env = "CHARTFOLD_EXPORTS", global = true)]
    pub exports: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Aggregate one year of raw chart rows and merge it into the exports
    Backfill(BackfillArgs),

    /// Per-country statistics for one year (excludes "Global")
    World(WorldArgs),

    /// Top songs or artists for one region and year
    Explore(ExploreArgs),

    /// An artist's yearly streams across regions
    Trends(TrendsArgs),

    /// Generate a default .chartfold.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BackfillArgs {
    /// Raw chart CSV, or a dataset directory containing charts.csv
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Year to aggregate
    #[arg(short, long)]
    pub year: i32,

    /// Chart type to keep (default from config: top200)
    #[arg(long, value_name = "NAME")]
    pub chart: Option<String>,

    /// Tracks kept per region-year
    #[arg(long, value_name = "COUNT")]
    pub track_limit: Option<usize>,

    /// Artists kept per region-year
    #[arg(long, value_name = "COUNT")]
    pub artist_limit: Option<usize>,

    /// Aggregate and report without touching the exports
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WorldArgs {
    /// Year to show (defaults to the latest year in the exports)
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Metric used to rank countries
    #[arg(short, long, default_value = "total-streams")]
    pub metric: MetricArg,

    /// Number of countries in the ranking (3-25)
    #[arg(short, long, default_value = "10", value_name = "COUNT")]
    pub top: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExploreArgs {
    /// Region to explore ("Global" is the worldwide chart)
    #[arg(short, long, default_value = "Global")]
    pub region: String,

    /// Year to show (defaults to the latest year in the exports)
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Rank songs or artists
    #[arg(short, long, default_value = "songs")]
    pub mode: ModeArg,

    /// Number of rows (10-100)
    #[arg(short, long, default_value = "25", value_name = "COUNT")]
    pub top: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TrendsArgs {
    /// Artist to follow; without it the top artists are listed
    #[arg(short, long)]
    pub artist: Option<String>,

    /// Regions to compare (repeatable); defaults to the artist's top 5
    #[arg(short, long = "region", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Do not add the "Global" baseline automatically
    #[arg(long)]
    pub no_global: bool,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Ranking metric for the world view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MetricArg {
    TotalStreams,
    UniqueArtists,
    UniqueTracks,
    AvgStreams,
}

/// Explorer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Songs,
    Artists,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Backfill(backfill) => {
                if !(1900..=2100).contains(&backfill.year) {
                    return Err(format!("Year out of range: {}", backfill.year));
                }

                if backfill.track_limit == Some(0) {
                    return Err("Track limit must be at least 1".to_string());
                }
                if backfill.artist_limit == Some(0) {
                    return Err("Artist limit must be at least 1".to_string());
                }

                if let Some(ref chart) = backfill.chart {
                    if chart.trim().is_empty() {
                        return Err("Chart name cannot be empty".to_string());
                    }
                }

                if let Some(ref input) = backfill.input {
                    if !input.exists() {
                        return Err(format!("Input does not exist: {}", input.display()));
                    }
                }
            }
            Command::Trends(trends) => {
                if let Some(ref artist) = trends.artist {
                    if artist.trim().is_empty() {
                        return Err("Artist cannot be empty".to_string());
                    }
                }
            }
            Command::World(_) | Command::Explore(_) | Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
