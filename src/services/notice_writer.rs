//! Notice writer service - business capability layer
//!
//! Only knows how to turn one processed record into a notice file. It never decides
//! whether a record deserves a notice; the record flow calls it after a success.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use tracing::debug;

use crate::models::Record;

/// Characters Windows and most filesystems refuse in file names
const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Flattened placeholder values for one notice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeFields {
    values: BTreeMap<String, String>,
}

impl NoticeFields {
    /// Every record attribute (key upper-cased) plus `CEDULA`, `FECHA_PROCESO` and `CAUSAL`
    ///
    /// The sheet's own `FECHA` column is kept as is.
    pub fn from_record(record: &Record) -> Self {
        let mut values: BTreeMap<String, String> = record
            .attributes
            .iter()
            .map(|(k, v)| (k.trim().to_uppercase(), v.clone()))
            .collect();
        values.insert("CEDULA".to_string(), record.identifier.clone());
        values.insert(
            "FECHA_PROCESO".to_string(),
            Local::now().format("%d/%m/%Y").to_string(),
        );
        values.insert("CAUSAL".to_string(), record.causal_text().to_string());
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// First non-blank value among `keys`
    fn first_of(&self, keys: &[&str]) -> &str {
        keys.iter()
            .filter_map(|k| self.get(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

/// Side-document collaborator invoked once per successful record
///
/// The engine only observes whether this returned an error.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate(&self, fields: &NoticeFields) -> Result<PathBuf>;
}

/// Plain-text notice renderer
///
/// Replaces `{{KEY}}` placeholders in a template and writes one file per record to
/// the notices directory.
pub struct NoticeWriter {
    template: String,
    output_dir: PathBuf,
}

impl NoticeWriter {
    pub fn new(template: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Read the template from disk
    pub async fn from_template_file(template_path: &Path, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let template = tokio::fs::read_to_string(template_path)
            .await
            .with_context(|| format!("reading notice template {}", template_path.display()))?;
        Ok(Self::new(template, output_dir))
    }

    pub fn render(&self, fields: &NoticeFields) -> String {
        fields
            .values
            .iter()
            .fold(self.template.clone(), |text, (key, value)| {
                text.replace(&format!("{{{{{}}}}}", key), value)
            })
    }

    /// `Notificacion <NOMBRES> <APELLIDO> <CEDULA>.txt`, forbidden characters removed
    pub fn file_name(fields: &NoticeFields) -> String {
        let raw = format!(
            "Notificacion {} {} {}",
            fields.first_of(&["NOMBRES", "NOMBRE"]),
            fields.first_of(&["APELLIDO 1", "APELLIDOS", "APELLIDO"]),
            fields.first_of(&["CEDULA"]),
        );
        let cleaned: String = raw
            .chars()
            .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c) && !c.is_control())
            .collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("{}.txt", collapsed)
    }
}

#[async_trait]
impl DocumentGenerator for NoticeWriter {
    async fn generate(&self, fields: &NoticeFields) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let path = self.output_dir.join(Self::file_name(fields));
        debug!("writing notice {}", path.display());
        tokio::fs::write(&path, self.render(fields))
            .await
            .with_context(|| format!("writing notice {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record::new("12345678", Some("DESERCION ESCOLAR"))
            .with_attribute("CÉDULA", "12345678")
            .with_attribute("Nombres", "Ana María")
            .with_attribute("APELLIDOS", "Pérez")
            .with_attribute("PNF", "Medicina Integral")
    }

    #[test]
    fn test_fields_from_record() {
        let fields = NoticeFields::from_record(&sample_record());
        assert_eq!(fields.get("CEDULA"), Some("12345678"));
        assert_eq!(fields.get("NOMBRES"), Some("Ana María"));
        assert_eq!(fields.get("CAUSAL"), Some("DESERCION ESCOLAR"));
        assert!(fields.get("FECHA_PROCESO").is_some());
    }

    #[test]
    fn test_sheet_date_survives() {
        let record = Record::new("12345678", None).with_attribute("FECHA", "01/03/2024");
        let fields = NoticeFields::from_record(&record);
        assert_eq!(fields.get("FECHA"), Some("01/03/2024"));
        assert_eq!(
            fields.get("FECHA_PROCESO"),
            Some(Local::now().format("%d/%m/%Y").to_string().as_str())
        );
    }

    #[test]
    fn test_file_name_prefers_first_surname_column() {
        let record = Record::new("1", None)
            .with_attribute("NOMBRES", "ANA")
            .with_attribute("APELLIDO 1", "PEREZ")
            .with_attribute("APELLIDOS", "PEREZ GIL");
        let name = NoticeWriter::file_name(&NoticeFields::from_record(&record));
        assert_eq!(name, "Notificacion ANA PEREZ 1.txt");
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let writer = NoticeWriter::new(
            "Estudiante {{NOMBRES}} ({{CEDULA}}) de {{PNF}}: {{CAUSAL}}. {{DESCONOCIDO}}",
            "unused",
        );
        let text = writer.render(&NoticeFields::from_record(&sample_record()));
        assert_eq!(
            text,
            "Estudiante Ana María (12345678) de Medicina Integral: DESERCION ESCOLAR. {{DESCONOCIDO}}"
        );
    }

    #[test]
    fn test_file_name_strips_forbidden_characters() {
        let record = Record::new("V-1/2", None)
            .with_attribute("NOMBRES", "Luis: \"El*Rey\"")
            .with_attribute("APELLIDO", " Gómez ");
        let name = NoticeWriter::file_name(&NoticeFields::from_record(&record));
        assert_eq!(name, "Notificacion Luis ElRey Gómez V-12.txt");
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = NoticeWriter::new("Hola {{NOMBRES}}", dir.path().join("Notificaciones"));
        let fields = NoticeFields::from_record(&sample_record());

        let path = tokio_test::block_on(writer.generate(&fields)).unwrap();

        assert!(path.ends_with("Notificacion Ana María Pérez 12345678.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Hola Ana María");
    }
}
