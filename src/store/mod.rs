//! Run outputs: recovery checkpoint, outcome journal, report and audit files

pub mod audit;
pub mod checkpoint;
pub mod journal;
pub mod report;

use std::path::Path;

use crate::error::{DataError, DataResult};

pub use audit::AuditSummary;
pub use checkpoint::CheckpointStore;
pub use journal::OutcomeJournal;
pub use report::{dated_folder, ReportStore};

/// Timestamp used in every generated file name
pub(crate) const FILE_STAMP: &str = "%Y%m%d_%H%M%S";

/// Write a CSV with a UTF-8 BOM so spreadsheet tools keep the accents
pub(crate) async fn write_csv<I>(path: &Path, headers: &[String], rows: I) -> DataResult<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new().from_writer(b"\xEF\xBB\xBF".to_vec());
    writer
        .write_record(headers)
        .map_err(|e| DataError::csv(path, e))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| DataError::csv(path, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DataError::io(path, e.into_error()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DataError::io(parent, e))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| DataError::io(path, e))
}
