//! Spelling hints for tokens that match nothing.

use strsim::jaro_winkler;

use crate::catalog::RemedyCatalog;

/// Maximum number of spelling hints.
pub const MAX_HINTS: usize = 3;

/// Minimum Jaro-Winkler similarity for a hint.
pub const MIN_HINT_SIMILARITY: f64 = 0.85;

/// Tokens shorter than this get no hints.
const MIN_HINT_TOKEN_LEN: usize = 3;

/// Distinct catalog names closest to `token`, best first.
///
/// The token is compared against the whole name and against each word of it,
/// so "belado" can point at "Belladonna" and "perenis" at "Bellis Perennis".
pub fn closest_names(token: &str, catalog: &RemedyCatalog) -> Vec<String> {
    let needle = token.trim().to_lowercase();
    if needle.chars().count() < MIN_HINT_TOKEN_LEN {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &str)> = Vec::new();
    for name in catalog.entries.iter().filter_map(|e| e.name.as_deref()) {
        if scored.iter().any(|(_, seen)| seen.eq_ignore_ascii_case(name)) {
            continue;
        }
        let lower = name.to_lowercase();
        let score = std::iter::once(lower.as_str())
            .chain(lower.split_whitespace())
            .map(|candidate| jaro_winkler(&needle, candidate))
            .fold(0.0, f64::max);
        if score >= MIN_HINT_SIMILARITY {
            scored.push((score, name));
        }
    }

    // Stable sort keeps catalog order among equal scores
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(MAX_HINTS)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemedyEntry;

    fn catalog() -> RemedyCatalog {
        RemedyCatalog::from_entries(vec![
            RemedyEntry::new("Belladonna", "30C", "4"),
            RemedyEntry::new("Belladonna", "200C", "4"),
            RemedyEntry::new("Bellis Perennis", "30C", "4"),
            RemedyEntry::new("Sulphur", "30C", "8"),
        ])
    }

    #[test]
    fn test_closest_names_for_typo() {
        let hints = closest_names("beladona", &catalog());
        assert_eq!(hints.first().map(String::as_str), Some("Belladonna"));
        assert_eq!(hints.iter().filter(|h| *h == "Belladonna").count(), 1);
    }

    #[test]
    fn test_closest_names_matches_words() {
        let hints = closest_names("perenis", &catalog());
        assert_eq!(hints, vec!["Bellis Perennis"]);
    }

    #[test]
    fn test_closest_names_short_or_unrelated() {
        assert!(closest_names("be", &catalog()).is_empty());
        assert!(closest_names("xyzzy", &catalog()).is_empty());
    }
}
