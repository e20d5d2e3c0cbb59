mod common;

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use common::{credentials, record, FailingLauncher, ScriptedLauncher, ScriptedPortal};
use sigae_bulk::models::outcome::{NOTE_NOT_FOUND, NOTE_PROCESSED};
use sigae_bulk::models::{ColumnSpec, Outcome};
use sigae_bulk::store::{CheckpointStore, OutcomeJournal};
use sigae_bulk::{App, Config};

const HEADER: &str = "CÉDULA,NOMBRES,CAUSAL\n";

fn config(dir: &Path) -> Config {
    let at = |name: &str| dir.join(name).display().to_string();
    Config {
        input_file: at("bajas.csv"),
        recovery_file: at("pendientes_recuperacion.csv"),
        journal_file: at("pendientes_recuperacion.journal"),
        reports_dir: at("Reportes"),
        audits_dir: at("Auditorias"),
        notices_dir: at("Notificaciones"),
        output_log_file: at("output.txt"),
        inter_record_delay_ms: 0,
        ..Config::default()
    }
}

fn write_sheet(path: &str, ids: &[&str]) {
    let mut content = HEADER.to_string();
    for id in ids {
        content.push_str(&format!("{},ANA {},DESERCION ESCOLAR\n", id, id));
    }
    std::fs::write(path, content).unwrap();
}

async fn seed_journal(config: &Config) -> OutcomeJournal {
    let journal = OutcomeJournal::new(&config.journal_file);
    journal
        .append(&Outcome::success(record("1001", "DESERCION ESCOLAR"), NOTE_PROCESSED))
        .await
        .unwrap();
    journal
}

fn csv_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(csv_files(&path));
        } else if path.extension().is_some_and(|e| e == "csv") {
            found.push(path);
        }
    }
    found
}

/// Identifier column of the single report under `reports_dir`
fn reported_ids(config: &Config) -> Vec<String> {
    let reports: Vec<PathBuf> = csv_files(Path::new(&config.reports_dir))
        .into_iter()
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("resultado_"))
        .collect();
    assert_eq!(reports.len(), 1, "expected one report, got {:?}", reports);
    std::fs::read_to_string(&reports[0])
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().to_string())
        .collect()
}

async fn pending_ids(config: &Config) -> Vec<String> {
    let columns = ColumnSpec::new("CÉDULA", &["CAUSAL".to_string()]);
    CheckpointStore::new(&config.recovery_file)
        .load(&columns)
        .await
        .unwrap()
        .records
        .into_iter()
        .map(|r| r.identifier)
        .collect()
}

#[tokio::test]
async fn test_resume_skips_journaled_records_and_reports_them() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    write_sheet(&config.input_file, &["9001"]);
    write_sheet(&config.recovery_file, &["1001", "1002", "1003", "1004"]);
    let journal = seed_journal(&config).await;
    journal
        .append(&Outcome::failure(record("1002", "DESERCION ESCOLAR"), NOTE_NOT_FOUND))
        .await
        .unwrap();

    let portal = ScriptedPortal::new();
    App::initialize(config.clone(), credentials())
        .await
        .unwrap()
        .run_with(&ScriptedLauncher(portal.clone()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(portal.located(), vec!["1003", "1004"]);
    assert_eq!(reported_ids(&config), vec!["1001", "1002", "1003", "1004"]);
    assert!(!journal.path().exists());
    assert!(!Path::new(&config.recovery_file).exists());
}

#[tokio::test]
async fn test_journal_kept_when_report_cannot_be_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    write_sheet(&config.input_file, &["1001", "1002"]);
    let journal = seed_journal(&config).await;
    // a file where the report folder should go
    std::fs::write(&config.reports_dir, "").unwrap();

    let portal = ScriptedPortal::new();
    let result = App::initialize(config.clone(), credentials())
        .await
        .unwrap()
        .run_with(&ScriptedLauncher(portal.clone()), CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(portal.located(), vec!["1002"]);
    let kept: Vec<String> = journal
        .recover()
        .await
        .unwrap()
        .iter()
        .map(|o| o.identifier().to_string())
        .collect();
    assert_eq!(kept, vec!["1001", "1002"]);
}

#[tokio::test]
async fn test_launch_failure_saves_pending_and_carried_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    write_sheet(&config.input_file, &["1001", "1002", "1003"]);
    let journal = seed_journal(&config).await;

    let err = App::initialize(config.clone(), credentials())
        .await
        .unwrap()
        .run_with(&FailingLauncher, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("opening the browser session"));
    assert_eq!(pending_ids(&config).await, vec!["1002", "1003"]);
    assert_eq!(reported_ids(&config), vec!["1001"]);
    assert!(!journal.path().exists());
}

#[tokio::test]
async fn test_launch_failure_without_journal_keeps_every_record_pending() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    write_sheet(&config.input_file, &["1001", "1002"]);

    let result = App::initialize(config.clone(), credentials())
        .await
        .unwrap()
        .run_with(&FailingLauncher, CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(pending_ids(&config).await, vec!["1001", "1002"]);
    assert!(csv_files(Path::new(&config.reports_dir))
        .iter()
        .all(|p| !p.file_name().unwrap().to_string_lossy().starts_with("resultado_")));
}
