//! Catalog sources: published spreadsheet over HTTP, or a local CSV file.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::{CatalogError, CatalogResult, CatalogSource};

/// Fetches the CSV export over HTTP(S).
pub struct HttpCatalogSource {
    client: reqwest::blocking::Client,
}

impl HttpCatalogSource {
    pub fn new(timeout_secs: u64) -> CatalogResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch(&self, location: &str) -> CatalogResult<String> {
        debug!(url = %location, "Fetching remedy sheet");
        let response = self
            .client
            .get(location)
            .send()
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http(status.as_u16()));
        }

        response
            .text()
            .map_err(|e| CatalogError::Fetch(e.to_string()))
    }
}

/// Reads a CSV file from disk (offline copy of the sheet).
#[derive(Debug, Default)]
pub struct FileCatalogSource;

impl CatalogSource for FileCatalogSource {
    fn fetch(&self, location: &str) -> CatalogResult<String> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        debug!(path = %path, "Reading remedy sheet from file");
        std::fs::read_to_string(Path::new(path)).map_err(|e| CatalogError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Dispatches `http(s)://` locations to HTTP and everything else to the filesystem.
pub struct DefaultCatalogSource {
    http: HttpCatalogSource,
    file: FileCatalogSource,
}

impl DefaultCatalogSource {
    pub fn new(timeout_secs: u64) -> CatalogResult<Self> {
        Ok(Self {
            http: HttpCatalogSource::new(timeout_secs)?,
            file: FileCatalogSource,
        })
    }
}

/// Whether a catalog location should be fetched over the network.
pub fn is_remote_location(location: &str) -> bool {
    let lower = location.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl CatalogSource for DefaultCatalogSource {
    fn fetch(&self, location: &str) -> CatalogResult<String> {
        if is_remote_location(location) {
            self.http.fetch(location.trim())
        } else {
            self.file.fetch(location.trim())
        }
    }
}
