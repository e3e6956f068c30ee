//! Command-line flags for the two jobs. Every flag is optional; unset flags
//! fall through to `Config.toml`, the environment and the built-in defaults.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::catalog::DataType;

/// Postgres connection flags shared by both jobs.
#[derive(Args, Debug, Clone, Default)]
pub struct DbArgs {
    /// PostgreSQL username
    #[arg(long)]
    pub pg_user: Option<String>,

    /// PostgreSQL password
    #[arg(long)]
    pub pg_password: Option<String>,

    /// PostgreSQL host [default: localhost]
    #[arg(long)]
    pub pg_host: Option<String>,

    /// PostgreSQL port
    #[arg(long)]
    pub pg_port: Option<u16>,

    /// PostgreSQL database name [default: ny_taxi]
    #[arg(long)]
    pub pg_db: Option<String>,
}

/// Load the green taxi Parquet file and the taxi zone lookup CSV into Postgres.
#[derive(Parser, Debug, Clone)]
#[command(name = "ingest_trips", version)]
pub struct TripArgs {
    #[command(flatten)]
    pub db: DbArgs,

    /// Rows per insert chunk [default: 100000]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunksize: Option<u32>,

    /// Directory containing the input files [default: data]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Settings file (TOML); defaults to ./Config.toml when present
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Ingest lookup tables (taxi zones, colors) from the NYC TLC misc release into Postgres.
#[derive(Parser, Debug, Clone)]
#[command(name = "ingest_lookups", version)]
pub struct LookupArgs {
    #[command(flatten)]
    pub db: DbArgs,

    /// Which lookup data to ingest [default: all]
    #[arg(long, value_enum)]
    pub data_type: Option<DataType>,

    /// Release URL the lookup file names are resolved against
    #[arg(long)]
    pub base_url: Option<String>,

    /// Settings file (TOML); defaults to ./Config.toml when present
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn flag_definitions_are_consistent() {
        TripArgs::command().debug_assert();
        LookupArgs::command().debug_assert();
    }

    #[test]
    fn trip_flags_parse() {
        let args = TripArgs::try_parse_from([
            "ingest_trips",
            "--pg-user",
            "alice",
            "--pg-port",
            "5433",
            "--chunksize",
            "250",
            "--data-dir",
            "/tmp/tlc",
        ])
        .unwrap();
        assert_eq!(args.db.pg_user.as_deref(), Some("alice"));
        assert_eq!(args.db.pg_port, Some(5433));
        assert_eq!(args.chunksize, Some(250));
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/tlc")));
        assert!(args.db.pg_password.is_none());
    }

    #[test]
    fn zero_chunksize_is_rejected() {
        assert!(TripArgs::try_parse_from(["ingest_trips", "--chunksize", "0"]).is_err());
    }

    #[test]
    fn data_type_is_restricted() {
        let args = LookupArgs::try_parse_from(["ingest_lookups", "--data-type", "zones"]).unwrap();
        assert_eq!(args.data_type, Some(DataType::Zones));
        assert!(LookupArgs::try_parse_from(["ingest_lookups", "--data-type", "trips"]).is_err());
    }
}
