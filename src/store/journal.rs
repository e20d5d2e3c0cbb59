use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{DataError, DataResult};
use crate::models::Outcome;

/// Append-only JSON-lines log of outcomes, one line per attempted record
///
/// Written as each record finishes so a crash between records still leaves a trail
/// of what was attempted. Consumed on the next start, cleared once a run's report and
/// checkpoint are on disk.
#[derive(Debug, Clone)]
pub struct OutcomeJournal {
    path: PathBuf,
}

impl OutcomeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, outcome: &Outcome) -> DataResult<()> {
        let mut line = serde_json::to_string(outcome).map_err(|e| DataError::json(&self.path, e))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DataError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DataError::io(&self.path, e))?;
        file.flush().await.map_err(|e| DataError::io(&self.path, e))
    }

    /// Outcomes left by a previous run; a torn last line is skipped
    pub async fn recover(&self) -> DataResult<Vec<Outcome>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataError::io(&self.path, e)),
        };

        let mut outcomes = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Outcome>(line) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("⚠️ journal line {} unreadable, skipped: {}", n + 1, e),
            }
        }
        Ok(outcomes)
    }

    pub async fn clear(&self) -> DataResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DataError::io(&self.path, e)),
        }
    }
}
