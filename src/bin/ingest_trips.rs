//! Entrypoint for the local-file job: load the green taxi Parquet file in
//! chunks into `green_taxi_trips`, then replace `zones` from the lookup CSV.

use anyhow::Context;
use clap::Parser;
use sqlx::Connection;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use nyc_taxi_ingestor::cli::TripArgs;
use nyc_taxi_ingestor::config::TripSettings;
use nyc_taxi_ingestor::db_utils::connect_and_check;
use nyc_taxi_ingestor::ingestor::run_trip_ingestion;
use nyc_taxi_ingestor::writer::PgTableWriter;

/// **Workflow**:
/// 1. Initialise tracing from `RUST_LOG` (or default to `info`).
/// 2. Merge flags, `Config.toml` and `APP__…` env vars into `TripSettings`.
/// 3. Open the single Postgres connection and check it.
/// 4. Run the trip pipeline; any error aborts with a non-zero exit.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ───────────────────────────────────────────────────────────────
    // 1. Initialise tracing / logging
    // ───────────────────────────────────────────────────────────────
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ───────────────────────────────────────────────────────────────
    // 2. Load configuration
    // ───────────────────────────────────────────────────────────────
    let args = TripArgs::parse();
    let settings = TripSettings::load(&args).context("Failed to load configuration")?;
    info!(?settings, "Loaded configuration");

    // ───────────────────────────────────────────────────────────────
    // 3. Database connection
    // ───────────────────────────────────────────────────────────────
    let mut conn = connect_and_check(&settings.database).await?;

    // ───────────────────────────────────────────────────────────────
    // 4. Ingestion
    // ───────────────────────────────────────────────────────────────
    let summary = run_trip_ingestion(&mut PgTableWriter::new(&mut conn), &settings).await?;
    conn.close().await.context("Failed to close database connection")?;

    info!(
        trip_rows = summary.trip_rows,
        chunks = summary.chunks,
        zone_rows = summary.zone_rows,
        "✅ Data ingestion completed successfully"
    );
    Ok(())
}
