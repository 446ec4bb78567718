//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.chartfold.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".chartfold.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Raw chart input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Export table settings.
    #[serde(default)]
    pub exports: ExportsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Raw chart input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Chart type to aggregate.
    #[serde(default = "default_chart")]
    pub chart: String,

    /// Default input path (CSV file or dataset directory).
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            chart: default_chart(),
            path: None,
        }
    }
}

fn default_chart() -> String {
    "top200".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Tracks kept per region-year.
    #[serde(default = "default_track_limit")]
    pub track_limit: usize,

    /// Artists kept per region-year.
    #[serde(default = "default_artist_limit")]
    pub artist_limit: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            track_limit: default_track_limit(),
            artist_limit: default_artist_limit(),
        }
    }
}

fn default_track_limit() -> usize {
    crate::analysis::TRACK_LIMIT
}

fn default_artist_limit() -> usize {
    crate::analysis::ARTIST_LIMIT
}

/// Export table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportsConfig {
    /// Directory holding the export tables.
    #[serde(default = "default_exports_dir")]
    pub dir: String,

    #[serde(default = "default_country_year_file")]
    pub country_year_file: String,

    #[serde(default = "default_top_tracks_file")]
    pub top_tracks_file: String,

    #[serde(default = "default_artists_file")]
    pub artists_file: String,

    /// Parquet compression: zstd, snappy or none.
    #[serde(default = "default_compression")]
    pub compression: String,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            dir: default_exports_dir(),
            country_year_file: default_country_year_file(),
            top_tracks_file: default_top_tracks_file(),
            artists_file: default_artists_file(),
            compression: default_compression(),
        }
    }
}

fn default_exports_dir() -> String {
    "exports".to_string()
}

fn default_country_year_file() -> String {
    "country_year_summary.parquet".to_string()
}

fn default_top_tracks_file() -> String {
    "top_tracks_country_year_top500.parquet".to_string()
}

fn default_artists_file() -> String {
    "artist_country_year_top200.parquet".to_string()
}

fn default_compression() -> String {
    "zstd".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref exports) = args.exports {
            self.exports.dir = exports.display().to_string();
        }

        if let crate::cli::Command::Backfill(ref backfill) = args.command {
            if let Some(ref chart) = backfill.chart {
                self.input.chart = chart.clone();
            }
            if let Some(ref input) = backfill.input {
                self.input.path = Some(input.display().to_string());
            }
            if let Some(limit) = backfill.track_limit {
                self.aggregation.track_limit = limit;
            }
            if let Some(limit) = backfill.artist_limit {
                self.aggregation.artist_limit = limit;
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Validate settings after the config file and CLI flags are merged.
    pub fn validate(&self) -> Result<(), String> {
        if self.aggregation.track_limit == 0 {
            return Err("track_limit must be at least 1".to_string());
        }
        if self.aggregation.artist_limit == 0 {
            return Err("artist_limit must be at least 1".to_string());
        }
        if self.input.chart.trim().is_empty() {
            return Err("chart cannot be empty".to_string());
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, BackfillArgs, Command, OutputFormat};
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input.chart, "top200");
        assert_eq!(config.aggregation.track_limit, 500);
        assert_eq!(config.aggregation.artist_limit, 200);
        assert_eq!(config.exports.dir, "exports");
        assert_eq!(config.exports.compression, "zstd");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[input]
chart = "viral50"

[aggregation]
track_limit = 100

[exports]
dir = "/data/exports"
compression = "snappy"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.input.chart, "viral50");
        assert_eq!(config.aggregation.track_limit, 100);
        assert_eq!(config.aggregation.artist_limit, 200);
        assert_eq!(config.exports.dir, "/data/exports");
        assert_eq!(config.exports.compression, "snappy");
        assert_eq!(config.exports.top_tracks_file, "top_tracks_country_year_top500.parquet");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[aggregation]"));
        assert!(toml_str.contains("[exports]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.aggregation.track_limit, 500);
    }

    #[test]
    fn test_merge_only_overrides_given_flags() {
        let mut config = Config::default();
        config.aggregation.artist_limit = 50;

        let args = Args {
            config: None,
            verbose: false,
            quiet: false,
            exports: Some(PathBuf::from("out")),
            format: OutputFormat::Markdown,
            output: None,
            command: Command::Backfill(BackfillArgs {
                input: Some(PathBuf::from("charts.csv")),
                year: 2021,
                chart: None,
                track_limit: Some(10),
                artist_limit: None,
                dry_run: false,
            }),
        };
        config.merge_with_args(&args);

        assert_eq!(config.exports.dir, "out");
        assert_eq!(config.input.chart, "top200");
        assert_eq!(config.input.path.as_deref(), Some("charts.csv"));
        assert_eq!(config.aggregation.track_limit, 10);
        assert_eq!(config.aggregation.artist_limit, 50);
    }

    #[test]
    fn test_validate_rejects_zero_limits_from_file() {
        let config: Config = toml::from_str("[aggregation]\ntrack_limit = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[aggregation]\nartist_limit = 0\n").unwrap();
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_flag_overrides_zero_limit_from_file() {
        let mut config: Config = toml::from_str("[aggregation]\ntrack_limit = 0\n").unwrap();
        let args = Args {
            config: None,
            verbose: false,
            quiet: false,
            exports: None,
            format: OutputFormat::Markdown,
            output: None,
            command: Command::Backfill(BackfillArgs {
                input: None,
                year: 2021,
                chart: None,
                track_limit: Some(25),
                artist_limit: None,
                dry_run: false,
            }),
        };
        config.merge_with_args(&args);

        assert!(config.validate().is_ok());
    }
}
