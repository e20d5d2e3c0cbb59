use std::collections::HashSet;

use crate::error::{DataError, DataResult};
use crate::models::record::{normalize_identifier, Record};

/// Which input columns carry the identifier and the causal text
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub identifier: String,
    pub causal: Vec<String>,
}

impl ColumnSpec {
    pub fn new(identifier: impl Into<String>, causal: &[String]) -> Self {
        Self {
            identifier: identifier.into(),
            causal: causal.to_vec(),
        }
    }
}

/// A loaded sheet: header order plus normalised, de-duplicated records
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Build records from raw text rows
    ///
    /// Rows with a blank identifier are dropped; duplicate identifiers keep the first row.
    pub fn from_rows(
        origin: &str,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        columns: &ColumnSpec,
    ) -> DataResult<Self> {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let id_index = headers
            .iter()
            .position(|h| h == &columns.identifier)
            .ok_or_else(|| DataError::MissingColumn {
                path: origin.to_string(),
                column: columns.identifier.clone(),
            })?;
        let causal_indices: Vec<usize> = columns
            .causal
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == name))
            .collect();

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(rows.len());

        for mut row in rows {
            row.resize(headers.len(), String::new());
            let Some(identifier) = normalize_identifier(&row[id_index]) else {
                continue;
            };
            if !seen.insert(identifier.clone()) {
                tracing::debug!("duplicate identifier {} dropped", identifier);
                continue;
            }
            row[id_index] = identifier.clone();

            let causal = causal_indices
                .iter()
                .map(|&i| row[i].trim())
                .find(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
                .map(str::to_string);

            let attributes = headers
                .iter()
                .cloned()
                .zip(row.into_iter().map(|v| clean_cell(&v)))
                .collect();

            records.push(Record {
                identifier,
                causal,
                attributes,
            });
        }

        Ok(Self { headers, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop records whose identifier is in `attempted`, preserving order
    pub fn without(mut self, attempted: &HashSet<String>) -> Self {
        self.records.retain(|r| !attempted.contains(&r.identifier));
        self
    }
}

/// Trim a cell and drop the midnight time that date cells pick up on export
fn clean_cell(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_suffix(" 00:00:00")
        .unwrap_or(trimmed)
        .to_string()
}
