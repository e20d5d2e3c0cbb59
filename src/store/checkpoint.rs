use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::error::{DataError, DataResult};
use crate::models::{load_dataset, ColumnSpec, Dataset, Record};
use crate::store::{write_csv, FILE_STAMP};

/// The recovery file: records of an interrupted run that were never attempted
///
/// At most one exists. Its presence at startup means the previous run did not finish.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub async fn load(&self, columns: &ColumnSpec) -> DataResult<Dataset> {
        load_dataset(&self.path, "", columns).await
    }

    /// Persist `pending`, or delete the file when nothing is pending
    ///
    /// Returns whether a checkpoint now exists.
    pub async fn save(&self, headers: &[String], pending: &[Record]) -> DataResult<bool> {
        if pending.is_empty() {
            self.clear().await?;
            return Ok(false);
        }

        let rows = pending.iter().map(|record| {
            headers
                .iter()
                .map(|h| record.get(h).unwrap_or_default().to_string())
                .collect()
        });
        write_csv(&self.path, headers, rows).await?;
        warn!(
            "💾 {} pending records saved to {}",
            pending.len(),
            self.path.display()
        );
        Ok(true)
    }

    pub async fn clear(&self) -> DataResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("🧹 Recovery file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DataError::io(&self.path, e)),
        }
    }

    /// Move a recovery file the operator chose not to resume into `backup_dir`
    pub async fn discard_to_backup(&self, backup_dir: &Path) -> DataResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        tokio::fs::create_dir_all(backup_dir)
            .await
            .map_err(|e| DataError::io(backup_dir, e))?;

        let target = backup_dir.join(format!(
            "backup_descartado_{}.csv",
            Local::now().format(FILE_STAMP)
        ));
        if tokio::fs::rename(&self.path, &target).await.is_err() {
            // rename fails across filesystems
            tokio::fs::copy(&self.path, &target)
                .await
                .map_err(|e| DataError::io(&target, e))?;
            self.clear().await?;
        }
        info!("📦 Previous recovery file moved to {}", target.display());
        Ok(Some(target))
    }
}
