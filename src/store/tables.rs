//! Arrow conversions for the three export tables.

use super::error::ColumnError;
use super::TableKind;
use crate::models::{ArtistYear, CountryYearSummary, TopTrackYear};
use arrow::array::{
    Array, ArrayRef, AsArray, Float64Array, Int32Array, PrimitiveArray, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::compute::cast;
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Field, Float64Type, Int32Type, Schema, SchemaRef, UInt32Type,
    UInt64Type,
};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::hash::Hash;
use std::sync::Arc;

/// A row type persisted as one Parquet export.
pub trait ExportTable: Sized + Clone {
    /// Which export file the rows live in.
    const KIND: TableKind;
    /// Columns forming the natural key.
    const KEY_COLUMNS: &'static [&'static str];

    type Key: Eq + Hash;

    fn natural_key(&self) -> Self::Key;
    fn schema() -> SchemaRef;
    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError>;
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, ColumnError>;
}

/// Fetch a column, casting it to `data_type` when the file stored a
/// compatible but different type (e.g. Int64 years written by other tools).
fn column(batch: &RecordBatch, name: &str, data_type: &DataType) -> Result<ArrayRef, ColumnError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| ColumnError::Missing(name.to_string()))?;

    if col.data_type() == data_type {
        return Ok(col.clone());
    }

    cast(col, data_type).map_err(|_| ColumnError::WrongType {
        column: name.to_string(),
        found: col.data_type().clone(),
        expected: data_type.clone(),
    })
}

fn strings(batch: &RecordBatch, name: &str) -> Result<StringArray, ColumnError> {
    Ok(column(batch, name, &DataType::Utf8)?.as_string::<i32>().clone())
}

fn primitives<T: ArrowPrimitiveType>(
    batch: &RecordBatch,
    name: &str,
) -> Result<PrimitiveArray<T>, ColumnError> {
    Ok(column(batch, name, &T::DATA_TYPE)?.as_primitive::<T>().clone())
}

fn string_at(array: &StringArray, row: usize, column: &str) -> Result<String, ColumnError> {
    if array.is_null(row) {
        return Err(ColumnError::Null {
            column: column.to_string(),
            row,
        });
    }
    Ok(array.value(row).to_string())
}

fn value_at<T: ArrowPrimitiveType>(
    array: &PrimitiveArray<T>,
    row: usize,
    column: &str,
) -> Result<T::Native, ColumnError> {
    if array.is_null(row) {
        return Err(ColumnError::Null {
            column: column.to_string(),
            row,
        });
    }
    Ok(array.value(row))
}

impl ExportTable for CountryYearSummary {
    const KIND: TableKind = TableKind::CountryYear;
    const KEY_COLUMNS: &'static [&'static str] = &["region", "year"];

    type Key = (String, i32);

    fn natural_key(&self) -> Self::Key {
        (self.region.clone(), self.year)
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("region", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("chart_rows", DataType::UInt64, false),
            Field::new("unique_tracks", DataType::UInt64, false),
            Field::new("unique_artists", DataType::UInt64, false),
            Field::new("total_streams", DataType::UInt64, false),
            Field::new("avg_streams", DataType::Float64, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let region = StringArray::from_iter_values(rows.iter().map(|r| r.region.as_str()));
        let year = Int32Array::from_iter_values(rows.iter().map(|r| r.year));
        let chart_rows = UInt64Array::from_iter_values(rows.iter().map(|r| r.chart_rows));
        let unique_tracks = UInt64Array::from_iter_values(rows.iter().map(|r| r.unique_tracks));
        let unique_artists = UInt64Array::from_iter_values(rows.iter().map(|r| r.unique_artists));
        let total_streams = UInt64Array::from_iter_values(rows.iter().map(|r| r.total_streams));
        let avg_streams: Float64Array = rows.iter().map(|r| r.avg_streams).collect();

        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(region),
                Arc::new(year),
                Arc::new(chart_rows),
                Arc::new(unique_tracks),
                Arc::new(unique_artists),
                Arc::new(total_streams),
                Arc::new(avg_streams),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, ColumnError> {
        let region = strings(batch, "region")?;
        let year = primitives::<Int32Type>(batch, "year")?;
        let chart_rows = primitives::<UInt64Type>(batch, "chart_rows")?;
        let unique_tracks = primitives::<UInt64Type>(batch, "unique_tracks")?;
        let unique_artists = primitives::<UInt64Type>(batch, "unique_artists")?;
        let total_streams = primitives::<UInt64Type>(batch, "total_streams")?;
        let avg_streams = primitives::<Float64Type>(batch, "avg_streams")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(CountryYearSummary {
                    region: string_at(&region, i, "region")?,
                    year: value_at(&year, i, "year")?,
                    chart_rows: value_at(&chart_rows, i, "chart_rows")?,
                    unique_tracks: value_at(&unique_tracks, i, "unique_tracks")?,
                    unique_artists: value_at(&unique_artists, i, "unique_artists")?,
                    total_streams: value_at(&total_streams, i, "total_streams")?,
                    // NaN is how dataframe writers spell a missing mean
                    avg_streams: avg_streams
                        .is_valid(i)
                        .then(|| avg_streams.value(i))
                        .filter(|v| !v.is_nan()),
                })
            })
            .collect()
    }
}

impl ExportTable for TopTrackYear {
    const KIND: TableKind = TableKind::TopTracks;
    const KEY_COLUMNS: &'static [&'static str] = &["region", "year", "track_key"];

    type Key = (String, i32, String);

    fn natural_key(&self) -> Self::Key {
        (self.region.clone(), self.year, self.track_key.clone())
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("region", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("track_key", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("artist", DataType::Utf8, false),
            Field::new("streams", DataType::UInt64, false),
            Field::new("best_rank", DataType::UInt32, false),
            Field::new("days_on_chart", DataType::UInt64, false),
            Field::new("rank_year", DataType::UInt32, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let region = StringArray::from_iter_values(rows.iter().map(|r| r.region.as_str()));
        let year = Int32Array::from_iter_values(rows.iter().map(|r| r.year));
        let track_key = StringArray::from_iter_values(rows.iter().map(|r| r.track_key.as_str()));
        let title = StringArray::from_iter_values(rows.iter().map(|r| r.title.as_str()));
        let artist = StringArray::from_iter_values(rows.iter().map(|r| r.artist.as_str()));
        let streams = UInt64Array::from_iter_values(rows.iter().map(|r| r.streams));
        let best_rank = UInt32Array::from_iter_values(rows.iter().map(|r| r.best_rank));
        let days_on_chart = UInt64Array::from_iter_values(rows.iter().map(|r| r.days_on_chart));
        let rank_year = UInt32Array::from_iter_values(rows.iter().map(|r| r.rank_year));

        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(region),
                Arc::new(year),
                Arc::new(track_key),
                Arc::new(title),
                Arc::new(artist),
                Arc::new(streams),
                Arc::new(best_rank),
                Arc::new(days_on_chart),
                Arc::new(rank_year),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, ColumnError> {
        let region = strings(batch, "region")?;
        let year = primitives::<Int32Type>(batch, "year")?;
        let track_key = strings(batch, "track_key")?;
        let title = strings(batch, "title")?;
        let artist = strings(batch, "artist")?;
        let streams = primitives::<UInt64Type>(batch, "streams")?;
        let best_rank = primitives::<UInt32Type>(batch, "best_rank")?;
        let days_on_chart = primitives::<UInt64Type>(batch, "days_on_chart")?;
        let rank_year = primitives::<UInt32Type>(batch, "rank_year")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(TopTrackYear {
                    region: string_at(&region, i, "region")?,
                    year: value_at(&year, i, "year")?,
                    track_key: string_at(&track_key, i, "track_key")?,
                    title: string_at(&title, i, "title")?,
                    artist: string_at(&artist, i, "artist")?,
                    streams: value_at(&streams, i, "streams")?,
                    best_rank: value_at(&best_rank, i, "best_rank")?,
                    days_on_chart: value_at(&days_on_chart, i, "days_on_chart")?,
                    rank_year: value_at(&rank_year, i, "rank_year")?,
                })
            })
            .collect()
    }
}

impl ExportTable for ArtistYear {
    const KIND: TableKind = TableKind::Artists;
    const KEY_COLUMNS: &'static [&'static str] = &["region", "year", "artist"];

    type Key = (String, i32, String);

    fn natural_key(&self) -> Self::Key {
        (self.region.clone(), self.year, self.artist.clone())
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("region", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("artist", DataType::Utf8, false),
            Field::new("streams", DataType::UInt64, false),
            Field::new("track_count", DataType::UInt64, false),
            Field::new("days_on_chart", DataType::UInt64, false),
            Field::new("best_rank", DataType::UInt32, false),
            Field::new("rank_year", DataType::UInt32, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let region = StringArray::from_iter_values(rows.iter().map(|r| r.region.as_str()));
        let year = Int32Array::from_iter_values(rows.iter().map(|r| r.year));
        let artist = StringArray::from_iter_values(rows.iter().map(|r| r.artist.as_str()));
        let streams = UInt64Array::from_iter_values(rows.iter().map(|r| r.streams));
        let track_count = UInt64Array::from_iter_values(rows.iter().map(|r| r.track_count));
        let days_on_chart = UInt64Array::from_iter_values(rows.iter().map(|r| r.days_on_chart));
        let best_rank = UInt32Array::from_iter_values(rows.iter().map(|r| r.best_rank));
        let rank_year = UInt32Array::from_iter_values(rows.iter().map(|r| r.rank_year));

        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(region),
                Arc::new(year),
                Arc::new(artist),
                Arc::new(streams),
                Arc::new(track_count),
                Arc::new(days_on_chart),
                Arc::new(best_rank),
                Arc::new(rank_year),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, ColumnError> {
        let region = strings(batch, "region")?;
        let year = primitives::<Int32Type>(batch, "year")?;
        let artist = strings(batch, "artist")?;
        let streams = primitives::<UInt64Type>(batch, "streams")?;
        let track_count = primitives::<UInt64Type>(batch, "track_count")?;
        let days_on_chart = primitives::<UInt64Type>(batch, "days_on_chart")?;
        let best_rank = primitives::<UInt32Type>(batch, "best_rank")?;
        let rank_year = primitives::<UInt32Type>(batch, "rank_year")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(ArtistYear {
                    region: string_at(&region, i, "region")?,
                    year: value_at(&year, i, "year")?,
                    artist: string_at(&artist, i, "artist")?,
                    streams: value_at(&streams, i, "streams")?,
                    track_count: value_at(&track_count, i, "track_count")?,
                    days_on_chart: value_at(&days_on_chart, i, "days_on_chart")?,
                    best_rank: value_at(&best_rank, i, "best_rank")?,
                    rank_year: value_at(&rank_year, i, "rank_year")?,
                })
            })
            .collect()
    }
}
