//! Prescription autocomplete.
//!
//! The prescription field is a comma-separated list of remedies being typed.
//! Only the rightmost segment is "active":
//!
//! ```text
//! "Aconite 6C, bell"
//!              ^^^^ active token → case-insensitive substring search
//! ```
//!
//! Picking a hit replaces the active token with `"<name> <potency>, "` so the
//! next remedy can be typed straight away.

mod fuzzy;

pub use fuzzy::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::RemedyCatalog;
use crate::models::RemedyEntry;

/// Maximum number of hits shown for one token.
pub const MAX_RESULTS: usize = 10;

/// Separator between prescription segments.
pub const SEGMENT_SEPARATOR: char = ',';

/// Matcher errors.
#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("Remedy entry has no name")]
    Nameless,
}

/// A catalog entry matching the active token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemedyHit {
    /// Position in the catalog
    pub catalog_index: usize,
    pub entry: RemedyEntry,
}

impl RemedyHit {
    /// Only in-stock remedies can be added to a prescription.
    pub fn is_selectable(&self) -> bool {
        self.entry.available
    }
}

/// Result of searching the catalog for the active token.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Suggestions {
    /// No active token; prompt the user to type
    #[default]
    TypeToSearch,
    /// Up to [`MAX_RESULTS`] hits in catalog order
    Hits(Vec<RemedyHit>),
    /// Token matched nothing; `closest` holds spelling hints (never selectable)
    NoMatches { token: String, closest: Vec<String> },
}

impl Suggestions {
    pub fn hits(&self) -> &[RemedyHit] {
        match self {
            Suggestions::Hits(hits) => hits,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.hits().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits().is_empty()
    }
}

/// The trimmed text after the last comma (all of `text` when there is none).
pub fn active_token(text: &str) -> &str {
    text.rsplit(SEGMENT_SEPARATOR).next().unwrap_or(text).trim()
}

/// Case-insensitive substring test. `needle_lower` must already be lowercase.
fn name_matches(entry: &RemedyEntry, needle_lower: &str) -> bool {
    entry
        .name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().contains(needle_lower))
}

/// Hits for `token`, first [`MAX_RESULTS`] in catalog order. Empty token → no hits.
pub fn matching_entries(token: &str, catalog: &RemedyCatalog) -> Vec<RemedyHit> {
    let needle = token.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    catalog
        .entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| name_matches(entry, &needle))
        .take(MAX_RESULTS)
        .map(|(catalog_index, entry)| RemedyHit {
            catalog_index,
            entry: entry.clone(),
        })
        .collect()
}

/// Suggestions for the current prescription draft.
pub fn search(text: &str, catalog: &RemedyCatalog) -> Suggestions {
    let token = active_token(text);
    if token.is_empty() {
        return Suggestions::TypeToSearch;
    }

    let hits = matching_entries(token, catalog);
    if hits.is_empty() {
        Suggestions::NoMatches {
            token: token.to_string(),
            closest: closest_names(token, catalog),
        }
    } else {
        Suggestions::Hits(hits)
    }
}

/// Replace the active token in `text` with `entry`, leaving a trailing `", "`.
///
/// Earlier completed segments are kept as typed. Unavailable and nameless
/// entries are refused.
pub fn apply_selection(text: &str, entry: &RemedyEntry) -> Result<String, MatchError> {
    let label = entry.prescription_label().ok_or(MatchError::Nameless)?;
    if !entry.available {
        return Err(MatchError::Unavailable(label));
    }

    let head = match text.rsplit_once(SEGMENT_SEPARATOR) {
        Some((head, _)) => head,
        None => "",
    };
    let head = head.trim_matches(|c: char| c == SEGMENT_SEPARATOR || c.is_whitespace());

    if head.is_empty() {
        Ok(format!("{}, ", label))
    } else {
        Ok(format!("{}, {}, ", head, label))
    }
}
