use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One input row: a withdrawal to perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// National ID, normalised and kept as opaque text
    pub identifier: String,
    /// Free-text withdrawal reason
    pub causal: Option<String>,
    /// Every input column in sheet order, carried through to reports and notices
    pub attributes: Vec<(String, String)>,
}

impl Record {
    pub fn new(identifier: impl Into<String>, causal: Option<&str>) -> Self {
        Self {
            identifier: identifier.into(),
            causal: causal.map(str::to_string),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Attribute value by header (exact match)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Causal text as shown in descriptions and notices
    pub fn causal_text(&self) -> &str {
        self.causal.as_deref().unwrap_or("")
    }
}

/// Normalise a raw identifier cell
///
/// Spreadsheet exports turn `12345678` into `12345678.0`; that suffix is removed.
/// Returns `None` for blank and `nan` cells.
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed).trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trim identifiers, drop blanks and collapse duplicates (first occurrence wins)
pub fn normalize_records(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter_map(|mut record| {
            record.identifier = normalize_identifier(&record.identifier)?;
            seen.insert(record.identifier.clone()).then_some(record)
        })
        .collect()
}
