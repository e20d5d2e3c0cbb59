use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local};
use tracing::info;

use crate::error::DataResult;
use crate::models::Outcome;
use crate::store::{write_csv, FILE_STAMP};

const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// `<root>/<YYYY>/<MM> - <Mes>`
pub fn dated_folder(root: &Path, now: DateTime<Local>) -> PathBuf {
    let month = MONTHS[now.month0() as usize];
    root.join(now.year().to_string())
        .join(format!("{:02} - {}", now.month(), month))
}

/// Per-run outcome report
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one row per outcome: original columns, then STATUS, NOTE, PROCESSED_AT
    ///
    /// `headers` is the input's column order; when empty the first outcome's
    /// attribute order is used.
    pub async fn write(
        &self,
        headers: &[String],
        outcomes: &[Outcome],
        now: DateTime<Local>,
    ) -> DataResult<PathBuf> {
        let columns: Vec<String> = if headers.is_empty() {
            outcomes
                .first()
                .map(|o| o.record.attributes.iter().map(|(k, _)| k.clone()).collect())
                .unwrap_or_default()
        } else {
            headers.to_vec()
        };

        let mut all_headers = columns.clone();
        all_headers.extend(["STATUS", "NOTE", "PROCESSED_AT"].map(String::from));

        let rows = outcomes.iter().map(|outcome| {
            let mut row: Vec<String> = columns
                .iter()
                .map(|h| outcome.record.get(h).unwrap_or_default().to_string())
                .collect();
            row.push(outcome.status.to_string());
            row.push(outcome.note.clone());
            row.push(outcome.processed_at.format("%d/%m/%Y %H:%M:%S").to_string());
            row
        });

        let path = dated_folder(&self.root, now)
            .join(format!("resultado_{}.csv", now.format(FILE_STAMP)));
        write_csv(&path, &all_headers, rows).await?;

        info!("📊 Report saved to {}", path.display());
        Ok(path)
    }
}
