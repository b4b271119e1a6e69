//! Similarity records: `identifier1 identifier2 similarity`, one per line.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRecord {
    pub a: String,
    pub b: String,
    pub similarity: f64,
}

impl SimilarityRecord {
    pub fn new(a: impl Into<String>, b: impl Into<String>, similarity: f64) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            similarity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRecords {
    pub records: Vec<SimilarityRecord>,
    /// Lines that were neither blank, comments, nor well-formed records.
    pub skipped: usize,
}

/// Smallest and largest similarity among accepted records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBounds {
    pub min: f64,
    pub max: f64,
}

impl SimilarityBounds {
    pub(crate) fn widen(bounds: Option<Self>, similarity: f64) -> Self {
        match bounds {
            None => Self {
                min: similarity,
                max: similarity,
            },
            Some(b) => Self {
                min: b.min.min(similarity),
                max: b.max.max(similarity),
            },
        }
    }
}

/// Rounds to three decimals and caps at 1.0.
pub fn normalize_similarity(raw: f64) -> f64 {
    ((raw * 1000.0).round() / 1000.0).min(1.0)
}

/// Whether a normalized similarity is usable; 0 and 1 carry no distance information.
pub fn is_accepted(similarity: f64) -> bool {
    similarity > 0.0 && similarity < 1.0
}

/// Parses one line. `line` is 1-based and only used for error reporting.
///
/// Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_record(text: &str, line: usize) -> Result<Option<SimilarityRecord>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let mut fields = trimmed.split_whitespace();
    let (Some(a), Some(b), Some(raw)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(Error::MalformedRecord {
            line,
            reason: "expected `identifier identifier similarity`".to_string(),
        });
    };
    let similarity = raw.parse::<f64>().map_err(|e| Error::MalformedRecord {
        line,
        reason: format!("similarity `{raw}`: {e}"),
    })?;
    if !similarity.is_finite() {
        return Err(Error::MalformedRecord {
            line,
            reason: format!("similarity `{raw}` is not finite"),
        });
    }
    Ok(Some(SimilarityRecord::new(a, b, similarity)))
}

/// Parses every line, skipping (and logging) malformed ones.
pub fn parse_records(text: &str) -> ParsedRecords {
    let mut out = ParsedRecords::default();
    for (idx, line) in text.lines().enumerate() {
        match parse_record(line, idx + 1) {
            Ok(Some(record)) => out.records.push(record),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(%err, "skipping similarity record");
                out.skipped += 1;
            }
        }
    }
    out
}
