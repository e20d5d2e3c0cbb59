use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::DataResult;
use crate::models::Outcome;
use crate::store::{write_csv, FILE_STAMP};

/// End-of-run totals with failures grouped by note
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    /// Most frequent first, ties by note
    pub failure_breakdown: Vec<(String, usize)>,
}

impl AuditSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let successes = outcomes.iter().filter(|o| o.is_success()).count();

        let mut by_note: HashMap<&str, usize> = HashMap::new();
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            *by_note.entry(outcome.note.as_str()).or_default() += 1;
        }
        let mut failure_breakdown: Vec<(String, usize)> = by_note
            .into_iter()
            .map(|(note, count)| (note.to_string(), count))
            .collect();
        failure_breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total: outcomes.len(),
            successes,
            failures: outcomes.len() - successes,
            failure_breakdown,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successes as f64 * 100.0 / self.total as f64
    }

    pub fn success_rate_label(&self) -> String {
        format!("{:.1}%", self.success_rate())
    }

    pub fn log(&self) {
        info!(
            "📋 Audit: {} processed, {} ok, {} failed ({})",
            self.total,
            self.successes,
            self.failures,
            self.success_rate_label()
        );
        for (note, count) in &self.failure_breakdown {
            info!("   - {}: {}", note, count);
        }
    }

    /// `Auditoria_<timestamp>.csv`: metric rows, then one row per failure note
    pub async fn write(&self, dir: &Path, now: DateTime<Local>) -> DataResult<PathBuf> {
        let path = dir.join(format!("Auditoria_{}.csv", now.format(FILE_STAMP)));
        let headers = vec!["METRIC".to_string(), "VALUE".to_string()];

        let mut rows = vec![
            vec!["TOTAL".to_string(), self.total.to_string()],
            vec!["SUCCESS".to_string(), self.successes.to_string()],
            vec!["FAILURE".to_string(), self.failures.to_string()],
            vec!["SUCCESS_RATE".to_string(), self.success_rate_label()],
        ];
        rows.extend(
            self.failure_breakdown
                .iter()
                .map(|(note, count)| vec![format!("FAILURE: {}", note), count.to_string()]),
        );

        write_csv(&path, &headers, rows).await?;
        info!("📋 Audit saved to {}", path.display());
        Ok(path)
    }
}
