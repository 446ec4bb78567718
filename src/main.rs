//! Chartfold - yearly aggregation of streaming chart exports
//!
//! A CLI tool that rolls raw daily chart rows up into yearly Parquet
//! tables and answers world, explorer and trend queries over them.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, unreadable input, missing exports, etc.)

mod analysis;
mod cli;
mod config;
mod ingest;
mod models;
mod report;
mod store;
mod views;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, BackfillArgs, Command, ExploreArgs, MetricArg, ModeArg, OutputFormat, TrendsArgs, WorldArgs};
use config::{Config, CONFIG_FILE};
use ingest::ChartFilter;
use report::BackfillReport;
use std::path::{Path, PathBuf};
use std::time::Instant;
use store::{Dataset, ExportStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use views::{ExploreMode, WorldMetric};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if let Err(e) = config.validate() {
        eprintln!("Error: Invalid configuration ({}): {}", source, e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(&args, &config);

    info!("Chartfold v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration from {}", source);

    if let Err(e) = run(&args, &config) {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .chartfold.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the input dataset, export paths, and limits.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so that reports written to stdout stay clean.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the selected subcommand and emit its output.
fn run(args: &Args, config: &Config) -> Result<()> {
    let store = ExportStore::from_config(&config.exports)
        .context("Invalid [exports] configuration")?;

    let output = match &args.command {
        Command::Backfill(backfill) => run_backfill(args, backfill, config, &store)?,
        Command::World(world) => run_world(args, world, &load_dataset(&store)?)?,
        Command::Explore(explore) => run_explore(args, explore, &load_dataset(&store)?)?,
        Command::Trends(trends) => run_trends(args, trends, &load_dataset(&store)?)?,
        Command::InitConfig => return handle_init_config(),
    };

    write_output(args, &output)
}

/// Aggregate one year of raw rows and merge it into the exports.
fn run_backfill(args: &Args, backfill: &BackfillArgs, config: &Config, store: &ExportStore) -> Result<String> {
    let start_time = Instant::now();

    let input = config
        .input
        .path
        .as_ref()
        .map(PathBuf::from)
        .context("No input given: pass --input or set `path` under [input] in the config")?;

    let inputs = ingest::resolve_inputs(&input)?;
    let filter = ChartFilter::new(backfill.year, &config.input.chart);

    status(args, &format!("📥 Reading {} file(s) from {}", inputs.len(), input.display()));
    let (rows, ingest_stats) = ingest::load_chart_rows(&inputs, &filter, !args.quiet)?;

    if rows.is_empty() {
        warn!(
            "No {} rows for {} in {}; the exports will only be rewritten",
            config.input.chart,
            backfill.year,
            input.display()
        );
    }

    status(args, &format!("🔬 Aggregating {} rows for {}", rows.len(), backfill.year));
    let tables = analysis::aggregate(
        &rows,
        backfill.year,
        config.aggregation.track_limit,
        config.aggregation.artist_limit,
    );
    info!(
        "Aggregated {}: {} regions, {} top tracks, {} artists",
        backfill.year,
        tables.country_year.len(),
        tables.top_tracks.len(),
        tables.artists.len()
    );

    let mut report = BackfillReport {
        run_date: Utc::now(),
        year: backfill.year,
        chart: config.input.chart.clone(),
        inputs,
        exports_dir: store.dir().to_path_buf(),
        ingest: ingest_stats,
        regions: tables.country_year.len(),
        country_year_rows: tables.country_year.len(),
        top_track_rows: tables.top_tracks.len(),
        artist_rows: tables.artists.len(),
        dry_run: backfill.dry_run,
        tables: Vec::new(),
        duration_seconds: 0.0,
    };

    if backfill.dry_run {
        status(args, "🔍 Dry run: exports were not modified");
    } else {
        status(args, &format!("📝 Merging into {}", store.dir().display()));
        report.tables.push(store.merge_and_write(tables.country_year)?);
        report.tables.push(store.merge_and_write(tables.top_tracks)?);
        report.tables.push(store.merge_and_write(tables.artists)?);
    }

    report.duration_seconds = start_time.elapsed().as_secs_f64();
    status(args, &format!("✅ Backfill of {} complete in {:.1}s", backfill.year, report.duration_seconds));

    match args.format {
        OutputFormat::Json => report::generate_json(&report),
        OutputFormat::Markdown => Ok(report::generate_backfill_markdown(&report)),
    }
}

fn run_world(args: &Args, world: &WorldArgs, dataset: &Dataset) -> Result<String> {
    let year = resolve_year(world.year, dataset)?;
    let view = views::world_view(dataset, year, metric_arg_to_metric(world.metric), world.top);

    match args.format {
        OutputFormat::Json => report::generate_json(&view),
        OutputFormat::Markdown => Ok(report::generate_world_markdown(&view)),
    }
}

fn run_explore(args: &Args, explore: &ExploreArgs, dataset: &Dataset) -> Result<String> {
    let year = resolve_year(explore.year, dataset)?;

    let regions = views::explorer::regions(dataset);
    if !regions.contains(&explore.region) {
        warn!(
            "Region '{}' is not in the exports ({} regions available)",
            explore.region,
            regions.len()
        );
    }

    let view = views::explore(
        dataset,
        &explore.region,
        year,
        mode_arg_to_mode(explore.mode),
        explore.top,
    );

    match args.format {
        OutputFormat::Json => report::generate_json(&view),
        OutputFormat::Markdown => Ok(report::generate_explorer_markdown(&view)),
    }
}

fn run_trends(args: &Args, trends: &TrendsArgs, dataset: &Dataset) -> Result<String> {
    let Some(ref artist) = trends.artist else {
        let choices = views::artist_choices(dataset, views::trends::ARTIST_CHOICES);
        return match args.format {
            OutputFormat::Json => report::generate_json(&choices),
            OutputFormat::Markdown => Ok(report::generate_artist_choices_markdown(&choices)),
        };
    };

    let view = views::trends(dataset, artist, &trends.regions, !trends.no_global);
    if view.available_regions.is_empty() {
        warn!("Artist '{}' has no rows in the exports", artist);
    }

    match args.format {
        OutputFormat::Json => report::generate_json(&view),
        OutputFormat::Markdown => Ok(report::generate_trends_markdown(&view)),
    }
}

/// Load the exports, pointing at the backfill step when any are missing.
fn load_dataset(store: &ExportStore) -> Result<Dataset> {
    store
        .load()
        .with_context(|| format!("Failed to load exports from {}", store.dir().display()))
}

/// Use the requested year, or the latest one in the exports.
fn resolve_year(requested: Option<i32>, dataset: &Dataset) -> Result<i32> {
    let available = views::years(dataset);

    match requested {
        Some(year) => {
            if !available.contains(&year) {
                warn!("Year {} is not in the exports (available: {:?})", year, available);
            }
            Ok(year)
        }
        None => views::default_year(dataset).context("The exports contain no years"),
    }
}

/// Print a human-readable progress line unless running quietly.
fn status(args: &Args, message: &str) {
    if !args.quiet {
        eprintln!("{}", message);
    }
}

/// Write the rendered output to `--output` or stdout.
fn write_output(args: &Args, content: &str) -> Result<()> {
    match args.output {
        Some(ref path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            status(args, &format!("📊 Output saved to: {}", path.display()));
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Convert the CLI metric to the world view metric.
fn metric_arg_to_metric(metric: MetricArg) -> WorldMetric {
    match metric {
        MetricArg::TotalStreams => WorldMetric::TotalStreams,
        MetricArg::UniqueArtists => WorldMetric::UniqueArtists,
        MetricArg::UniqueTracks => WorldMetric::UniqueTracks,
        MetricArg::AvgStreams => WorldMetric::AvgStreams,
    }
}

/// Convert the CLI mode to the explorer mode.
fn mode_arg_to_mode(mode: ModeArg) -> ExploreMode {
    match mode {
        ModeArg::Songs => ExploreMode::Songs,
        ModeArg::Artists => ExploreMode::Artists,
    }
}

/// Load configuration from file or use defaults. Returns where it came from.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, CONFIG_FILE.to_string())),
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}
