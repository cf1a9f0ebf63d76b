//! Front desk configuration.

use std::fmt;

/// Published CSV export of the remedy spreadsheet.
pub const DEFAULT_REMEDY_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/11aZgt8hafBHfu0ZHeuyQH_MS09791YHXy_r-7LWc8KM/export?format=csv&gid=369787331";

/// Read-only materia medica shown beside the remedy finder.
pub const DEFAULT_REFERENCE_URL: &str =
    "https://www.materiamedica.info/en/materia-medica/john-henry-clarke/";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_ENDPOINT: &str = "REMEDY_DESK_ENDPOINT";
pub const ENV_SHEET_URL: &str = "REMEDY_DESK_SHEET_URL";
pub const ENV_REFERENCE_URL: &str = "REMEDY_DESK_REFERENCE_URL";
pub const ENV_TIMEOUT_SECS: &str = "REMEDY_DESK_TIMEOUT_SECS";

/// Directory script endpoint. The URL embeds a deployment secret, so it is
/// never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryEndpoint(String);

impl DirectoryEndpoint {
    /// Wrap an endpoint URL. Blank input yields `None`.
    pub fn new(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw URL, for building requests only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DirectoryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DirectoryEndpoint(<redacted>)")
    }
}

/// Runtime configuration for a desk session.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskConfig {
    /// Patient directory endpoint; remote patient calls are refused while unset
    pub directory_endpoint: Option<DirectoryEndpoint>,
    /// Remedy CSV location (URL or local file path)
    pub remedy_sheet_url: String,
    /// Reference viewer navigation target
    pub reference_url: String,
    /// HTTP request timeout
    pub request_timeout_secs: u64,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            directory_endpoint: None,
            remedy_sheet_url: DEFAULT_REMEDY_SHEET_URL.to_string(),
            reference_url: DEFAULT_REFERENCE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl DeskConfig {
    /// Read configuration from `REMEDY_DESK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout_secs = match non_blank(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS);
                defaults.request_timeout_secs
            }),
            None => defaults.request_timeout_secs,
        };

        Self {
            directory_endpoint: lookup(ENV_ENDPOINT).and_then(DirectoryEndpoint::new),
            remedy_sheet_url: non_blank(ENV_SHEET_URL).unwrap_or(defaults.remedy_sheet_url),
            reference_url: non_blank(ENV_REFERENCE_URL).unwrap_or(defaults.reference_url),
            request_timeout_secs,
        }
    }

    /// Replace the directory endpoint (operator entry at session start).
    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.directory_endpoint = DirectoryEndpoint::new(url);
        self
    }

    pub fn is_directory_configured(&self) -> bool {
        self.directory_endpoint.is_some()
    }
}
