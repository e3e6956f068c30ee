//! Centralised error type for both ingestion jobs.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error reading {}: {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Parquet error reading {}: {1}", .0.display())]
    Parquet(PathBuf, #[source] parquet::errors::ParquetError),

    /// `origin` is a file path or a URL.
    #[error("CSV error for {0}: {1}")]
    Csv(String, #[source] csv::Error),

    #[error("Column `{0}` not found in dataset")]
    MissingColumn(String),

    #[error("Cannot convert value {value:?} in column `{column}` to a timestamp")]
    InvalidTimestamp { column: String, value: String },

    #[error("HTTP error fetching {0}: {1}")]
    Fetch(String, #[source] reqwest::Error),

    #[error("Cannot connect to database at {0}: {1}")]
    Connect(String, #[source] sqlx::Error),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting `{0}`: {1}")]
    InvalidSetting(&'static str, String),
}
