//! Static registry of the remote lookup files and the selector that picks
//! which of them a run ingests.

use clap::ValueEnum;
use serde::Deserialize;
use url::Url;

use crate::errors::IngestError;

/// One remote lookup file and the table it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSource {
    pub key: &'static str,
    pub url: Url,
    pub table_name: &'static str,
}

struct CatalogEntry {
    key: &'static str,
    file_name: &'static str,
    table_name: &'static str,
}

const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry { key: "zones", file_name: "taxi_zone_lookup.csv", table_name: "taxi_zone_lookup" },
    CatalogEntry { key: "colors", file_name: "taxi_colors.csv", table_name: "taxi_colors" },
];

/// Which lookup sources to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    All,
    Zones,
    Colors,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::All => "all",
            DataType::Zones => "zones",
            DataType::Colors => "colors",
        }
    }

    fn includes(self, key: &str) -> bool {
        self == DataType::All || self.as_str() == key
    }
}

/// The catalog with every file resolved against one release base URL.
#[derive(Debug, Clone)]
pub struct Catalog {
    sources: Vec<NamedSource>,
}

impl Catalog {
    pub fn new(base_url: &str) -> Result<Self, IngestError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| IngestError::InvalidSetting("lookups.base_url", format!("{base_url}: {e}")))?;
        // Without a trailing slash `join` would replace the last path segment.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let sources = ENTRIES
            .iter()
            .map(|entry| {
                let url = base.join(entry.file_name).map_err(|e| {
                    IngestError::InvalidSetting("lookups.base_url", format!("{base_url}: {e}"))
                })?;
                Ok(NamedSource { key: entry.key, url, table_name: entry.table_name })
            })
            .collect::<Result<Vec<_>, IngestError>>()?;

        Ok(Catalog { sources })
    }

    pub fn sources(&self) -> &[NamedSource] {
        &self.sources
    }

    /// Sources matching `data_type`, in catalog order.
    pub fn select(&self, data_type: DataType) -> Vec<&NamedSource> {
        self.sources.iter().filter(|s| data_type.includes(s.key)).collect()
    }
}
