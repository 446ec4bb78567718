//! Persisted export tables.
//!
//! The three yearly tables live as Parquet files in one exports directory.
//! Every write replaces the whole file: the merged table is written to a
//! temporary file next to the target and renamed over it.

pub mod error;
pub mod tables;

pub use error::ExportError;
pub use tables::ExportTable;

use crate::analysis::merge_append;
use crate::config::ExportsConfig;
use crate::models::{ArtistYear, CountryYearSummary, TopTrackYear};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The three export tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    CountryYear,
    TopTracks,
    Artists,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [TableKind::CountryYear, TableKind::TopTracks, TableKind::Artists];

    /// File name used when the configuration does not override it.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            TableKind::CountryYear => "country_year_summary.parquet",
            TableKind::TopTracks => "top_tracks_country_year_top500.parquet",
            TableKind::Artists => "artist_country_year_top200.parquet",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::CountryYear => write!(f, "country_year_summary"),
            TableKind::TopTracks => write!(f, "top_tracks_country_year_top500"),
            TableKind::Artists => write!(f, "artist_country_year_top200"),
        }
    }
}

/// Parse a compression name from the configuration.
pub fn parse_compression(name: &str) -> Result<Compression, ExportError> {
    match name.trim().to_lowercase().as_str() {
        "zstd" => Ok(Compression::ZSTD(ZstdLevel::default())),
        "snappy" => Ok(Compression::SNAPPY),
        "none" | "uncompressed" => Ok(Compression::UNCOMPRESSED),
        other => Err(ExportError::UnknownCompression(other.to_string())),
    }
}

/// Row counts from one merge-and-write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub table: TableKind,
    pub path: PathBuf,
    /// Rows in the file before the merge; `None` when the file did not exist.
    pub existing_rows: Option<usize>,
    pub new_rows: usize,
    pub merged_rows: usize,
}

/// Reads and writes the export tables in one directory.
#[derive(Debug, Clone)]
pub struct ExportStore {
    dir: PathBuf,
    country_year_file: String,
    top_tracks_file: String,
    artists_file: String,
    compression: Compression,
}

impl ExportStore {
    /// Create a store with default file names and zstd compression.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            country_year_file: TableKind::CountryYear.default_file_name().to_string(),
            top_tracks_file: TableKind::TopTracks.default_file_name().to_string(),
            artists_file: TableKind::Artists.default_file_name().to_string(),
            compression: Compression::ZSTD(ZstdLevel::default()),
        }
    }

    pub fn from_config(config: &ExportsConfig) -> Result<Self, ExportError> {
        Ok(Self {
            dir: PathBuf::from(&config.dir),
            country_year_file: config.country_year_file.clone(),
            top_tracks_file: config.top_tracks_file.clone(),
            artists_file: config.artists_file.clone(),
            compression: parse_compression(&config.compression)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a table's file.
    pub fn path_of(&self, kind: TableKind) -> PathBuf {
        let file = match kind {
            TableKind::CountryYear => &self.country_year_file,
            TableKind::TopTracks => &self.top_tracks_file,
            TableKind::Artists => &self.artists_file,
        };
        self.dir.join(file)
    }

    /// Paths of the tables that do not exist yet.
    pub fn missing(&self) -> Vec<PathBuf> {
        TableKind::ALL
            .iter()
            .map(|kind| self.path_of(*kind))
            .filter(|path| !path.exists())
            .collect()
    }

    /// Read a table; `Ok(None)` when its file does not exist.
    pub fn read_table<T: ExportTable>(&self) -> Result<Option<Vec<T>>, ExportError> {
        let path = self.path_of(T::KIND);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| ExportError::io(&path, e))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| ExportError::parquet(&path, e))?
            .build()
            .map_err(|e| ExportError::parquet(&path, e))?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| ExportError::parquet(&path, e.into()))?;
            let mut batch_rows = T::from_batch(&batch).map_err(|source| ExportError::Schema {
                path: path.clone(),
                source,
            })?;
            rows.append(&mut batch_rows);
        }

        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Some(rows))
    }

    /// Replace a table's file with `rows`.
    pub fn write_table<T: ExportTable>(&self, rows: &[T]) -> Result<PathBuf, ExportError> {
        let path = self.path_of(T::KIND);
        fs::create_dir_all(&self.dir).map_err(|e| ExportError::io(&self.dir, e))?;

        let batch = T::to_batch(rows).map_err(|source| ExportError::Arrow {
            table: T::KIND,
            source,
        })?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| ExportError::io(&self.dir, e))?;

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .build();

        let mut writer = ArrowWriter::try_new(temp.as_file_mut(), batch.schema(), Some(props))
            .map_err(|e| ExportError::parquet(&path, e))?;
        writer
            .write(&batch)
            .map_err(|e| ExportError::parquet(&path, e))?;
        writer.close().map_err(|e| ExportError::parquet(&path, e))?;

        temp.persist(&path)
            .map_err(|e| ExportError::io(&path, e.error))?;

        Ok(path)
    }

    /// Merge `rows` into the persisted table on its natural key and write it back.
    pub fn merge_and_write<T: ExportTable>(&self, rows: Vec<T>) -> Result<MergeOutcome, ExportError> {
        let existing = self.read_table::<T>()?;
        let existing_rows = existing.as_ref().map(Vec::len);
        let new_rows = rows.len();

        let merged = merge_append(existing, rows, T::natural_key);
        let path = self.write_table(&merged)?;

        info!(
            "Wrote: {} rows: {} (keyed on {})",
            path.display(),
            merged.len(),
            T::KEY_COLUMNS.join(", ")
        );

        Ok(MergeOutcome {
            table: T::KIND,
            path,
            existing_rows,
            new_rows,
            merged_rows: merged.len(),
        })
    }

    /// Load all three tables, failing when any of them is missing.
    pub fn load(&self) -> Result<Dataset, ExportError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ExportError::MissingExports { missing });
        }

        let dataset = Dataset {
            country_year: self.read_table()?.unwrap_or_default(),
            top_tracks: self.read_table()?.unwrap_or_default(),
            artists: self.read_table()?.unwrap_or_default(),
        };

        info!(
            "Loaded exports from {}: {} summary rows, {} track rows, {} artist rows",
            self.dir.display(),
            dataset.country_year.len(),
            dataset.top_tracks.len(),
            dataset.artists.len()
        );
        Ok(dataset)
    }
}

/// The three export tables held in memory for the view layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub country_year: Vec<CountryYearSummary>,
    pub top_tracks: Vec<TopTrackYear>,
    pub artists: Vec<ArtistYear>,
}

impl Dataset {
    /// Re-read every table from the store, replacing what is held.
    /// On failure the current contents are left untouched.
    pub fn reload(&mut self, store: &ExportStore) -> Result<(), ExportError> {
        *self = store.load()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn summary(region: &str, year: i32, total_streams: u64) -> CountryYearSummary {
        CountryYearSummary {
            region: region.to_string(),
            year,
            chart_rows: 1,
            unique_tracks: 1,
            unique_artists: 1,
            total_streams,
            avg_streams: Some(total_streams as f64),
        }
    }

    fn track(region: &str, key: &str, rank_year: u32) -> TopTrackYear {
        TopTrackYear {
            region: region.to_string(),
            year: 2021,
            track_key: key.to_string(),
            title: format!("title {}", key),
            artist: "Artist".to_string(),
            streams: 100,
            best_rank: 1,
            days_on_chart: 3,
            rank_year,
        }
    }

    fn artist(region: &str, name: &str) -> ArtistYear {
        ArtistYear {
            region: region.to_string(),
            year: 2021,
            artist: name.to_string(),
            streams: 100,
            track_count: 1,
            days_on_chart: 3,
            best_rank: 1,
            rank_year: 1,
        }
    }

    #[test]
    fn test_read_absent_table() {
        let dir = TempDir::new().unwrap();
        let store = ExportStore::new(dir.path());
        assert!(store.read_table::<CountryYearSummary>().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = ExportStore::new(dir.path().join("exports"));

        let rows = vec![track("Global", "a", 1), track("Global", "b", 2)];
        let path = store.write_table(&rows).unwrap();

        assert_eq!(path, dir.path().join("exports/top_tracks_country_year_top500.parquet"));
        assert_eq!(store.read_table::<TopTrackYear>().unwrap(), Some(rows));
    }

    #[test]
    fn test_merge_and_write_replaces_same_key() {
        let dir = TempDir::new().unwrap();
        let store = ExportStore::new(dir.path());

        store.write_table(&[summary("US", 2020, 500)]).unwrap();

        let outcome = store
            .merge_and_write(vec![summary("US", 2020, 600), summary("FR", 2020, 20)])
            .unwrap();

        assert_eq!(outcome.existing_rows, Some(1));
        assert_eq!(outcome.new_rows, 2);
        assert_eq!(outcome.merged_rows, 2);

        let stored = store.read_table::<CountryYearSummary>().unwrap().unwrap();
        assert_eq!(stored, vec![summary("US", 2020, 600), summary("FR", 2020, 20)]);
    }

    #[test]
    fn test_merge_and_write_twice_is_stable() {
        let dir = TempDir::new().unwrap();
        let store = ExportStore::new(dir.path());
        let rows = vec![artist("Global", "A"), artist("Global", "B")];

        let first = store.merge_and_write(rows.clone()).unwrap();
        assert_eq!(first.existing_rows, None);

        let second = store.merge_and_write(rows.clone()).unwrap();
        assert_eq!(second.existing_rows, Some(2));
        assert_eq!(second.merged_rows, 2);
        assert_eq!(store.read_table::<ArtistYear>().unwrap(), Some(rows));
    }

    #[test]
    fn test_load_reports_every_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_table(&[summary("US", 2021, 1)]).unwrap();

        match store.load() {
            Err(ExportError::MissingExports { missing }) => {
                assert_eq!(missing.len(), 2);
                assert!(missing.contains(&store.path_of(TableKind::TopTracks)));
                assert!(missing.contains(&store.path_of(TableKind::Artists)));
            }
            other => panic!("expected missing exports, got {:?}", other),
        }
    }

    #[test]
    fn test_dataset_reload() {
        let dir = TempDir::new().unwrap();
        let store = ExportStore::new(dir.path());
        store.write_table(&[summary("US", 2021, 1)]).unwrap();
        store.write_table(&[track("US", "a", 1)]).unwrap();
        store.write_table(&[artist("US", "A")]).unwrap();

        let mut dataset = store.load().unwrap();
        assert_eq!(dataset.country_year.len(), 1);

        store
            .merge_and_write(vec![summary("MX", 2021, 2)])
            .unwrap();
        dataset.reload(&store).unwrap();
        assert_eq!(dataset.country_year.len(), 2);

        fs::remove_file(store.path_of(TableKind::Artists)).unwrap();
        assert!(dataset.reload(&store).is_err());
        assert_eq!(dataset.country_year.len(), 2);
    }

    #[test]
    fn test_parse_compression() {
        assert_eq!(parse_compression("snappy").unwrap(), Compression::SNAPPY);
        assert_eq!(parse_compression("NONE").unwrap(), Compression::UNCOMPRESSED);
        assert!(matches!(parse_compression("zstd").unwrap(), Compression::ZSTD(_)));
        assert!(parse_compression("lzma").is_err());
    }
}
