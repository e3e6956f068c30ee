//! Type-safe configuration loader using the `config` crate.
//!
//! Precedence, lowest first: built-in defaults, `Config.toml` (or the file
//! passed with `--config`), `APP__…` environment variables, command-line flags.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::catalog::DataType;
use crate::cli::{DbArgs, LookupArgs, TripArgs};
use crate::errors::IngestError;

/// Default release hosting the NYC TLC lookup CSVs.
pub const DEFAULT_LOOKUP_BASE_URL: &str = "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/misc/";

/// Postgres coordinates for one run.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Database name
    pub name: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("user", &self.user)
            .field("password", &"********")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .finish()
    }
}

impl DatabaseSettings {
    /// `postgresql://<user>:<password>@<host>:<port>/<database>`, with the
    /// user and password percent-encoded.
    pub fn connection_url(&self) -> Result<Url, IngestError> {
        let invalid = |what: &str| {
            IngestError::InvalidSetting("database", format!("{what} not usable in a connection URL"))
        };
        let mut url = Url::parse(&format!("postgresql://{}:{}/", self.host, self.port))
            .map_err(|_| invalid("host"))?;
        url.set_username(&self.user).map_err(|()| invalid("user"))?;
        url.set_password(Some(&self.password)).map_err(|()| invalid("password"))?;
        url.set_path(&self.name);
        Ok(url)
    }

    /// `host:port/database`, safe to log.
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.name)
    }
}

/// Settings for the local-file trip ingestion job (`[trips]`).
#[derive(Debug, Deserialize, Clone)]
pub struct TripSettings {
    pub database: DatabaseSettings,

    /// Rows per appended chunk
    pub chunk_size: NonZeroUsize,

    /// Directory holding the Parquet trip file and the zone CSV
    pub data_dir: PathBuf,

    pub trip_file: String,
    pub zone_file: String,
    pub trip_table: String,
    pub zone_table: String,
}

impl TripSettings {
    pub fn load(args: &TripArgs) -> Result<Self, IngestError> {
        let builder = base_builder(args.config.as_deref())
            .set_default("trips.database.user", "postgres")?
            .set_default("trips.database.password", "postgres")?
            .set_default("trips.database.host", "localhost")?
            .set_default("trips.database.port", 5433_i64)?
            .set_default("trips.database.name", "ny_taxi")?
            .set_default("trips.chunk_size", 100_000_i64)?
            .set_default("trips.data_dir", "data")?
            .set_default("trips.trip_file", "green_tripdata_2025-11.parquet")?
            .set_default("trips.zone_file", "taxi_zone_lookup.csv")?
            .set_default("trips.trip_table", "green_taxi_trips")?
            .set_default("trips.zone_table", "zones")?;

        let cfg = apply_db_overrides(builder, "trips", &args.db)?
            .set_override_option("trips.chunk_size", args.chunksize.map(i64::from))?
            .set_override_option("trips.data_dir", args.data_dir.as_ref().map(|p| p.display().to_string()))?
            .build()?;

        let chunk_size: i64 = cfg.get("trips.chunk_size")?;
        if chunk_size < 1 {
            return Err(IngestError::InvalidSetting(
                "trips.chunk_size",
                format!("must be at least 1, got {chunk_size}"),
            ));
        }

        Ok(cfg.get("trips")?)
    }

    pub fn trip_path(&self) -> PathBuf {
        self.data_dir.join(&self.trip_file)
    }

    pub fn zone_path(&self) -> PathBuf {
        self.data_dir.join(&self.zone_file)
    }
}

/// Settings for the remote lookup ingestion job (`[lookups]`).
#[derive(Debug, Deserialize, Clone)]
pub struct LookupSettings {
    pub database: DatabaseSettings,

    /// Which catalog entries to ingest: `all`, `zones` or `colors`
    pub data_type: DataType,

    /// Release URL the catalog's file names are resolved against
    pub base_url: String,
}

impl LookupSettings {
    pub fn load(args: &LookupArgs) -> Result<Self, IngestError> {
        let builder = base_builder(args.config.as_deref())
            .set_default("lookups.database.user", "root")?
            .set_default("lookups.database.password", "root")?
            .set_default("lookups.database.host", "localhost")?
            .set_default("lookups.database.port", 5432_i64)?
            .set_default("lookups.database.name", "ny_taxi")?
            .set_default("lookups.data_type", DataType::All.as_str())?
            .set_default("lookups.base_url", DEFAULT_LOOKUP_BASE_URL)?;

        let cfg = apply_db_overrides(builder, "lookups", &args.db)?
            .set_override_option("lookups.data_type", args.data_type.map(DataType::as_str))?
            .set_override_option("lookups.base_url", args.base_url.clone())?
            .build()?;

        Ok(cfg.get("lookups")?)
    }
}

fn base_builder(config_file: Option<&Path>) -> ConfigBuilder<DefaultState> {
    let file = match config_file {
        Some(path) => File::from(path).required(true),
        None => File::with_name("Config").required(false),
    };
    Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix("APP").separator("__"))
}

fn apply_db_overrides(
    builder: ConfigBuilder<DefaultState>,
    section: &str,
    db: &DbArgs,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let key = |name: &str| format!("{section}.database.{name}");
    builder
        .set_override_option(key("user"), db.pg_user.clone())?
        .set_override_option(key("password"), db.pg_password.clone())?
        .set_override_option(key("host"), db.pg_host.clone())?
        .set_override_option(key("port"), db.pg_port.map(i64::from))?
        .set_override_option(key("name"), db.pg_db.clone())
}
