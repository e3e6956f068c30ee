//! Entrypoint for the remote-lookup job: download the NYC TLC lookup CSVs
//! selected by `--data-type` and replace their tables.
//!
//! Exit status is 1 when the database cannot be reached up front. Once
//! connected the job exits 0 even if individual sources failed; those are
//! only logged.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sqlx::Connection;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use nyc_taxi_ingestor::catalog::Catalog;
use nyc_taxi_ingestor::cli::LookupArgs;
use nyc_taxi_ingestor::config::LookupSettings;
use nyc_taxi_ingestor::db_utils::connect_and_check;
use nyc_taxi_ingestor::fetcher::Fetcher;
use nyc_taxi_ingestor::ingestor::run_lookup_ingestion;
use nyc_taxi_ingestor::writer::PgTableWriter;

/// **Workflow**:
/// 1. Initialise tracing from `RUST_LOG` (or default to `info`).
/// 2. Merge flags, `Config.toml` and `APP__…` env vars into `LookupSettings`.
/// 3. Resolve the selected catalog entries against the base URL.
/// 4. Open the single Postgres connection and check it; failure exits 1.
/// 5. Fetch and replace each table; per-source failures are only logged.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // ───────────────────────────────────────────────────────────────
    // 1. Initialise tracing / logging
    // ───────────────────────────────────────────────────────────────
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("NYC TLC Lookup Data Ingestion");

    // ───────────────────────────────────────────────────────────────
    // 2. Load configuration
    // ───────────────────────────────────────────────────────────────
    let args = LookupArgs::parse();
    let settings = LookupSettings::load(&args).context("Failed to load configuration")?;
    info!(?settings, "Loaded configuration");

    // ───────────────────────────────────────────────────────────────
    // 3. Resolve lookup sources
    // ───────────────────────────────────────────────────────────────
    let catalog = Catalog::new(&settings.base_url)?;
    let sources = catalog.select(settings.data_type);

    // ───────────────────────────────────────────────────────────────
    // 4. Database connection
    // ───────────────────────────────────────────────────────────────
    let mut conn = match connect_and_check(&settings.database).await {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "✗ Database connection failed");
            return Ok(ExitCode::from(1));
        }
    };

    // ───────────────────────────────────────────────────────────────
    // 5. Ingestion
    // ───────────────────────────────────────────────────────────────
    let fetcher = Fetcher::new()?;
    let summary = run_lookup_ingestion(&mut PgTableWriter::new(&mut conn), &fetcher, &sources).await;
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close database connection cleanly");
    }

    info!(
        ingested = summary.ingested.len(),
        failed = summary.failed.len(),
        "Ingestion complete!"
    );
    Ok(ExitCode::SUCCESS)
}
