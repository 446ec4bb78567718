//! Export store errors.

use super::TableKind;
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A column in a persisted table did not match what the reader needs.
#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("missing column '{0}'")]
    Missing(String),

    #[error("column '{column}' has type {found}, which cannot be read as {expected}")]
    WrongType {
        column: String,
        found: DataType,
        expected: DataType,
    },

    #[error("column '{column}' has a null at row {row}")]
    Null { column: String, row: usize },
}

/// Errors raised while reading or writing the persisted exports.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(
        "missing export(s):\n{}\nrun the backfill step to create them",
        list_paths(.missing)
    )]
    MissingExports { missing: Vec<PathBuf> },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parquet error in {}: {source}", .path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("failed to build {table} batch: {source}")]
    Arrow {
        table: TableKind,
        #[source]
        source: ArrowError,
    },

    #[error("unexpected schema in {}: {source}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: ColumnError,
    },

    #[error("unknown compression '{0}' (expected zstd, snappy or none)")]
    UnknownCompression(String),
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parquet(path: &Path, source: ParquetError) -> Self {
        Self::Parquet {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("- {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
