use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{DataError, DataResult};
use crate::models::dataset::{ColumnSpec, Dataset};

/// Resolve the file holding `sheet`
///
/// A workbook is either one `.csv` file (single sheet, the name is not checked) or a
/// directory with one `<sheet>.csv` per sheet.
pub fn resolve_sheet_path(workbook: &Path, sheet: &str) -> DataResult<PathBuf> {
    if workbook.is_dir() {
        let candidate = workbook.join(format!("{}.csv", sheet));
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(DataError::SheetNotFound {
            path: workbook.display().to_string(),
            sheet: sheet.to_string(),
        });
    }
    if workbook.is_file() {
        return Ok(workbook.to_path_buf());
    }
    Err(DataError::io(
        workbook,
        std::io::Error::new(std::io::ErrorKind::NotFound, "workbook not found"),
    ))
}

/// Load one sheet; every cell is read as text
pub async fn load_dataset(
    workbook: impl AsRef<Path>,
    sheet: &str,
    columns: &ColumnSpec,
) -> DataResult<Dataset> {
    let path = resolve_sheet_path(workbook.as_ref(), sheet)?;
    tracing::info!("📄 Reading sheet '{}' from {}", sheet, path.display());

    let bytes = fs::read(&path).await.map_err(|e| DataError::io(&path, e))?;
    let (headers, rows) = parse_csv(&path, &bytes)?;
    let dataset = Dataset::from_rows(&path.display().to_string(), headers, rows, columns)?;

    tracing::info!("✓ {} records loaded", dataset.len());
    Ok(dataset)
}

fn parse_csv(path: &Path, bytes: &[u8]) -> DataResult<(Vec<String>, Vec<Vec<String>>)> {
    // Spreadsheet exports prepend a UTF-8 BOM
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| DataError::csv(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DataError::csv(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnSpec {
        ColumnSpec::new("CÉDULA", &["CAUSAL".to_string()])
    }

    #[tokio::test]
    async fn test_load_single_file_keeps_identifiers_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bajas.csv");
        std::fs::write(
            &path,
            "\u{feff}CÉDULA,NOMBRES,CAUSAL\n00123456,ANA,DESERCION\n7654321.0,LUIS,\n",
        )
        .unwrap();

        let dataset = load_dataset(&path, "BAJAS TOTALES", &columns()).await.unwrap();
        assert_eq!(dataset.headers, vec!["CÉDULA", "NOMBRES", "CAUSAL"]);
        assert_eq!(dataset.records[0].identifier, "00123456");
        assert_eq!(dataset.records[1].identifier, "7654321");
        assert_eq!(dataset.records[1].causal, None);
    }

    #[tokio::test]
    async fn test_load_named_sheet_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAJAS TOTALES.csv"), "CÉDULA\nA\n").unwrap();
        std::fs::write(dir.path().join("BAJAS PNFA TOTALES.csv"), "CÉDULA\nB\nC\n").unwrap();

        let pnfa = load_dataset(dir.path(), "BAJAS PNFA TOTALES", &columns())
            .await
            .unwrap();
        assert_eq!(pnfa.len(), 2);

        let missing = load_dataset(dir.path(), "OTRA", &columns()).await.unwrap_err();
        assert!(matches!(missing, DataError::SheetNotFound { .. }));
    }
}
