//! fetcher.rs
//!
//! Downloads a remote lookup CSV and parses it into a [`Dataset`].

use reqwest::Client;
use tracing::debug;

use crate::catalog::NamedSource;
use crate::dataset::Dataset;
use crate::errors::IngestError;

/// Plain HTTP(S) GET client for the lookup files: no auth, no cache, no retry.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, IngestError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::Fetch("<client>".to_string(), e))?;
        Ok(Fetcher { client })
    }

    /// Fetch `source.url` and parse the body as headed CSV.
    ///
    /// A non-success status is a fetch error, so a 404 page is never parsed
    /// as data.
    pub async fn fetch(&self, source: &NamedSource) -> Result<Dataset, IngestError> {
        let url = source.url.as_str();
        let fetch_err = |e| IngestError::Fetch(url.to_string(), e);

        let body = self
            .client
            .get(source.url.clone())
            .send()
            .await
            .map_err(fetch_err)?
            .error_for_status()
            .map_err(fetch_err)?
            .bytes()
            .await
            .map_err(fetch_err)?;
        debug!(url, bytes = body.len(), "Downloaded lookup file");

        Dataset::from_csv(csv::Reader::from_reader(&body[..]))
            .map_err(|e| IngestError::Csv(url.to_string(), e))
    }
}
