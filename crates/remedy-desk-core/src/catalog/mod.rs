//! Remedy catalog loading.
//!
//! Pipeline: fetch CSV (HTTP or file) → parse rows → fingerprint → replace
//! the session catalog wholesale. A failed load never touches the catalog
//! already held by the session.

mod csv;
mod source;

pub use csv::*;
pub use source::*;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::RemedyEntry;

/// Catalog load errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Remedy sheet returned HTTP {0}")]
    Http(u16),

    #[error("Cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("CSV parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Remedy sheet is missing the '{0}' column")]
    MissingColumn(String),

    #[error("Remedy sheet is empty")]
    Empty,
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Source of the raw remedy CSV document.
pub trait CatalogSource: Send + Sync {
    /// Fetch the CSV text at `location`.
    fn fetch(&self, location: &str) -> CatalogResult<String>;
}

/// In-memory remedy table, replaced wholesale on each sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemedyCatalog {
    /// Entries in sheet order
    pub entries: Vec<RemedyEntry>,
    /// SHA-256 of the source document (hex), empty for a never-loaded catalog
    pub fingerprint: String,
    /// Load timestamp (RFC 3339)
    pub loaded_at: Option<String>,
}

impl RemedyCatalog {
    /// Build a catalog from already-parsed entries.
    pub fn from_entries(entries: Vec<RemedyEntry>) -> Self {
        let fingerprint = fingerprint_entries(&entries);
        Self {
            entries,
            fingerprint,
            loaded_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Parse a CSV document into a catalog.
    pub fn from_csv(text: &str) -> CatalogResult<Self> {
        let entries = parse_catalog(text)?;
        Ok(Self {
            entries,
            fingerprint: fingerprint(text),
            loaded_at: Some(chrono::Utc::now().to_rfc3339()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn available_count(&self) -> usize {
        self.entries.iter().filter(|e| e.available).count()
    }

    pub fn get(&self, index: usize) -> Option<&RemedyEntry> {
        self.entries.get(index)
    }

    /// Short fingerprint prefix for display.
    pub fn short_fingerprint(&self) -> &str {
        self.fingerprint.get(..12).unwrap_or(&self.fingerprint)
    }
}

/// Hex SHA-256 of a document.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn fingerprint_entries(entries: &[RemedyEntry]) -> String {
    match serde_json::to_string(entries) {
        Ok(json) => fingerprint(&json),
        Err(_) => String::new(),
    }
}

/// Fetch and parse a catalog.
pub fn load_catalog(source: &dyn CatalogSource, location: &str) -> CatalogResult<RemedyCatalog> {
    let text = source.fetch(location)?;
    let catalog = RemedyCatalog::from_csv(&text)?;
    tracing::info!(
        entries = catalog.len(),
        available = catalog.available_count(),
        fingerprint = %catalog.short_fingerprint(),
        "Remedy catalog loaded"
    );
    Ok(catalog)
}
