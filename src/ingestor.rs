//! ingestor.rs
//!
//! The two pipelines: local trip file + zone CSV into Postgres, and remote
//! lookup CSVs into Postgres.

use std::time::Instant;

use tracing::{error, info};

use crate::catalog::NamedSource;
use crate::config::TripSettings;
use crate::errors::IngestError;
use crate::fetcher::Fetcher;
use crate::reader::{read_lookup_dataset, read_trip_dataset};
use crate::writer::{elapsed_since, load_in_chunks, TableWriter};

/// Outcome of a trip ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripLoadSummary {
    pub trip_rows: usize,
    pub chunks: usize,
    pub zone_rows: usize,
}

/// A lookup source that made it into its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedTable {
    pub key: String,
    pub table: String,
    pub rows: usize,
    pub columns: usize,
}

/// A lookup source that was skipped, with the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSource {
    pub key: String,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupSummary {
    pub ingested: Vec<IngestedTable>,
    pub failed: Vec<FailedSource>,
}

/// Load the trip Parquet file in chunks, then replace the zones table from
/// the local CSV. Any failure aborts the run.
pub async fn run_trip_ingestion<W: TableWriter + ?Sized>(
    writer: &mut W,
    settings: &TripSettings,
) -> Result<TripLoadSummary, IngestError> {
    // ─── Green taxi trips ─────────────────────────────────────────────
    let trip_path = settings.trip_path();
    info!(path = %trip_path.display(), "Reading parquet file");
    let started = Instant::now();
    let trips = read_trip_dataset(&trip_path)?;
    info!(
        rows = trips.num_rows(),
        columns = trips.num_columns(),
        elapsed = %elapsed_since(started),
        "Read trip records"
    );

    let trip_rows = load_in_chunks(writer, &settings.trip_table, &trips, settings.chunk_size).await?;
    let chunks = trip_rows.div_ceil(settings.chunk_size.get());

    // ─── Taxi zones lookup ────────────────────────────────────────────
    let zone_path = settings.zone_path();
    info!(path = %zone_path.display(), "Reading zones file");
    let zones = read_lookup_dataset(&zone_path)?;

    info!(table = %settings.zone_table, rows = zones.num_rows(), "Creating table");
    writer.replace_table(&settings.zone_table, &zones).await?;

    Ok(TripLoadSummary { trip_rows, chunks, zone_rows: zones.num_rows() })
}

/// Fetch each selected source and replace its table. A source that fails to
/// download, parse or write is logged and skipped; the others still run.
pub async fn run_lookup_ingestion<W: TableWriter + ?Sized>(
    writer: &mut W,
    fetcher: &Fetcher,
    sources: &[&NamedSource],
) -> LookupSummary {
    let mut summary = LookupSummary::default();

    for source in sources {
        info!(key = source.key, url = %source.url, "Processing lookup source");
        match ingest_source(writer, fetcher, source).await {
            Ok(table) => {
                info!(key = source.key, table = %table.table, rows = table.rows, "Ingested to table");
                summary.ingested.push(table);
            }
            Err(e) => {
                error!(key = source.key, url = %source.url, error = %e, "Failed to ingest lookup source");
                summary.failed.push(FailedSource {
                    key: source.key.to_string(),
                    url: source.url.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    summary
}

async fn ingest_source<W: TableWriter + ?Sized>(
    writer: &mut W,
    fetcher: &Fetcher,
    source: &NamedSource,
) -> Result<IngestedTable, IngestError> {
    let dataset = fetcher.fetch(source).await?;
    info!(
        key = source.key,
        rows = dataset.num_rows(),
        columns = dataset.num_columns(),
        "Downloaded"
    );

    writer.replace_table(source.table_name, &dataset).await?;

    Ok(IngestedTable {
        key: source.key.to_string(),
        table: source.table_name.to_string(),
        rows: dataset.num_rows(),
        columns: dataset.num_columns(),
    })
}
