//! Error types and utilities for the aChor toolkit
//!
//! Provides the shared error taxonomy and fuzzy matching for attribute field names.

use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

/// Find the best fuzzy match using Jaro-Winkler + normalized Levenshtein scoring
///
/// Attribute names in shapefile-derived data are short and often truncated
/// (`POP_DENS` vs `pop_density`), so matching is case-insensitive and gives a
/// prefix bonus. Candidates scoring below 0.7 are never suggested.
fn find_best_fuzzy_match<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let input_lower = input.to_lowercase();
    let mut best_match = None;
    let mut best_score = 0.0f64;

    let min_threshold = 0.7;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        // JW dominates: field typos are mostly transpositions and truncations.
        let jw_score = jaro_winkler(&input_lower, &candidate_lower);
        let lev_score = normalized_levenshtein(&input_lower, &candidate_lower);
        let mut score = (jw_score * 0.7) + (lev_score * 0.3);

        // dBase truncates field names to 10 characters
        let prefix_len = input_lower.chars().count().min(candidate_lower.chars().count());
        if prefix_len >= 4 {
            let input_prefix: String = input_lower.chars().take(prefix_len).collect();
            let candidate_prefix: String = candidate_lower.chars().take(prefix_len).collect();
            if input_prefix == candidate_prefix {
                score += 0.15;
            }
        }

        if score >= min_threshold && score > best_score {
            best_score = score;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Suggest a correction for a misspelled attribute field name
///
/// An exact case-insensitive match is returned as-is so callers can point at
/// a casing mistake.
pub fn suggest_field<'a, I>(field: &str, available: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let available: Vec<&str> = available.into_iter().collect();

    if let Some(exact) = available.iter().find(|f| f.eq_ignore_ascii_case(field)) {
        if *exact != field {
            return Some(exact.to_string());
        }
        return None;
    }

    find_best_fuzzy_match(field, available)
}

/// Main error type for aChor operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameters or input features (no partial output is produced)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough neighbour or significant pairs to derive breaks
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The sweep would take more steps than the configured bound
    #[error(
        "Sweep needs {steps} steps (limit {limit}); widen the sweep interval or raise the step limit"
    )]
    ResourceExhaustion { steps: u64, limit: u64 },

    /// The sweep loop ran past its deadline
    #[error("Sweep deadline exceeded after {breaks} break(s); widen the sweep interval")]
    DeadlineExceeded { breaks: usize },

    /// The run was cancelled by the caller
    #[error("Classification cancelled")]
    Cancelled,

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON / GeoJSON input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an `InvalidInput` error for a missing attribute field, with a
    /// "did you mean" hint when a close field name exists
    pub fn missing_field<'a, I>(field: &str, available: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        match suggest_field(field, available) {
            Some(hint) => Error::InvalidInput(format!(
                "attribute field '{field}' not found (did you mean '{hint}'?)"
            )),
            None => Error::InvalidInput(format!("attribute field '{field}' not found")),
        }
    }
}

/// Convenience result type for aChor operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_field_typo() {
        let fields = ["UNISTR", "pop_density", "area_km2"];
        assert_eq!(
            suggest_field("pop_densty", fields),
            Some("pop_density".to_string())
        );
        assert_eq!(suggest_field("aera_km2", fields), Some("area_km2".to_string()));
    }

    #[test]
    fn test_suggest_field_truncated_dbase_name() {
        let fields = ["UNISTR", "POP_DENSIT"];
        assert_eq!(
            suggest_field("pop_density", fields),
            Some("POP_DENSIT".to_string())
        );
    }

    #[test]
    fn test_suggest_field_case_only() {
        let fields = ["Gi_Bin", "value"];
        assert_eq!(suggest_field("gi_bin", fields), Some("Gi_Bin".to_string()));
        assert_eq!(suggest_field("value", fields), None);
    }

    #[test]
    fn test_suggest_field_no_match() {
        let fields = ["UNISTR", "value"];
        assert_eq!(suggest_field("totally_unrelated_name", fields), None);
        assert_eq!(suggest_field("x", Vec::<&str>::new()), None);
    }

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field("valeu", ["value", "UNISTR"]);
        let msg = err.to_string();
        assert!(msg.contains("'valeu' not found"), "{msg}");
        assert!(msg.contains("did you mean 'value'"), "{msg}");
    }

    #[test]
    fn test_resource_exhaustion_message_asks_to_widen() {
        let err = Error::ResourceExhaustion {
            steps: 5_000_000,
            limit: 1_000_000,
        };
        assert!(err.to_string().contains("widen the sweep"));
    }
}
