mod common;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{credentials, ids_of_records, record, records, ScriptedPortal};
use sigae_bulk::models::outcome::{NOTE_NOT_FOUND, NOTE_PROCESSED};
use sigae_bulk::models::{CausalCode, OutcomeStatus, ProgramType};
use sigae_bulk::orchestrator::{AbortReason, BatchRunner, RunEvent, RunSummary};
use sigae_bulk::store::OutcomeJournal;
use sigae_bulk::workflow::RecordFlow;

fn runner() -> BatchRunner {
    BatchRunner::new(RecordFlow::new(), credentials(), Duration::from_millis(1000))
}

async fn run(portal: ScriptedPortal, ids: &[&str], cancel: &CancellationToken) -> RunSummary {
    runner()
        .run(portal, records(ids, "DESERCION ESCOLAR"), ProgramType::Pnf, cancel)
        .await
}

fn outcome_ids(summary: &RunSummary) -> Vec<String> {
    summary
        .outcomes
        .iter()
        .map(|o| o.identifier().to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_not_found_record_does_not_stop_batch() {
    let portal = ScriptedPortal::new().not_found(&["B"]);
    let summary = run(portal.clone(), &["A", "B", "C"], &CancellationToken::new()).await;

    let statuses: Vec<_> = summary
        .outcomes
        .iter()
        .map(|o| (o.identifier().to_string(), o.status, o.note.clone()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("A".to_string(), OutcomeStatus::Success, NOTE_PROCESSED.to_string()),
            ("B".to_string(), OutcomeStatus::Failure, NOTE_NOT_FOUND.to_string()),
            ("C".to_string(), OutcomeStatus::Success, NOTE_PROCESSED.to_string()),
        ]
    );
    assert!(summary.pending.is_empty());
    assert!(summary.is_complete());
    assert!(portal
        .submitted()
        .iter()
        .all(|(_, form)| form.code == CausalCode::Desertion));
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_first_record() {
    let cancel = CancellationToken::new();
    let portal = ScriptedPortal::new().cancel_after("A", cancel.clone());

    let summary = run(portal.clone(), &["A", "B", "C"], &cancel).await;

    assert_eq!(outcome_ids(&summary), vec!["A"]);
    assert_eq!(ids_of_records(&summary.pending), vec!["B", "C"]);
    assert!(summary.stopped);
    assert_eq!(portal.located(), vec!["A"]);
    assert_eq!(portal.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start_attempts_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let portal = ScriptedPortal::new();

    let summary = run(portal.clone(), &["A", "B"], &cancel).await;

    assert!(summary.outcomes.is_empty());
    assert_eq!(ids_of_records(&summary.pending), vec!["A", "B"]);
    assert!(portal.located().is_empty());
    assert_eq!(portal.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_identifier_processed_once() {
    let portal = ScriptedPortal::new();
    let summary = run(portal.clone(), &["A", "B", "A", " A "], &CancellationToken::new()).await;

    assert_eq!(outcome_ids(&summary), vec!["A", "B"]);
    assert_eq!(portal.located(), vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn test_blank_identifiers_are_dropped() {
    let portal = ScriptedPortal::new();
    let summary = run(portal.clone(), &["", "12345678.0", "nan"], &CancellationToken::new()).await;

    assert_eq!(outcome_ids(&summary), vec!["12345678"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_login_leaves_everything_pending() {
    let portal = ScriptedPortal::new().rejecting_login();
    let summary = run(portal.clone(), &["A", "B", "C"], &CancellationToken::new()).await;

    assert!(summary.outcomes.is_empty());
    assert_eq!(ids_of_records(&summary.pending), vec!["A", "B", "C"]);
    assert_eq!(summary.abort, Some(AbortReason::AuthenticationFailed));
    assert!(portal.located().is_empty());
    assert_eq!(portal.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lost_session_aborts_remaining_records() {
    let portal = ScriptedPortal::new().session_dies_on(&["B"]);
    let summary = run(portal.clone(), &["A", "B", "C", "D"], &CancellationToken::new()).await;

    assert_eq!(outcome_ids(&summary), vec!["A", "B"]);
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Failure);
    assert_eq!(ids_of_records(&summary.pending), vec!["C", "D"]);
    assert_eq!(
        summary.abort,
        Some(AbortReason::SessionLost {
            identifier: "B".to_string()
        })
    );
    assert_eq!(portal.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_and_pending_partition_input() {
    let ids = ["A", "B", "B", "C", "D", "E"];
    let unique: HashSet<&str> = ids.iter().copied().collect();

    for stop_after in ["A", "C", "E"] {
        let cancel = CancellationToken::new();
        let portal = ScriptedPortal::new()
            .not_found(&["C"])
            .cancel_after(stop_after, cancel.clone());
        let summary = run(portal, &ids, &cancel).await;

        assert_eq!(summary.outcomes.len() + summary.pending.len(), unique.len());
        let mut seen: HashSet<String> = outcome_ids(&summary).into_iter().collect();
        for id in ids_of_records(&summary.pending) {
            assert!(seen.insert(id), "identifier in both outputs");
        }
        assert_eq!(seen.len(), unique.len());
    }
}

#[tokio::test(start_paused = true)]
async fn test_resuming_pending_matches_uninterrupted_run() {
    let ids = ["A", "B", "C", "D"];

    let full = run(ScriptedPortal::new().not_found(&["C"]), &ids, &CancellationToken::new()).await;

    let cancel = CancellationToken::new();
    let first = run(
        ScriptedPortal::new()
            .not_found(&["C"])
            .cancel_after("B", cancel.clone()),
        &ids,
        &cancel,
    )
    .await;
    let second = runner()
        .run(
            ScriptedPortal::new().not_found(&["C"]),
            first.pending.clone(),
            ProgramType::Pnf,
            &CancellationToken::new(),
        )
        .await;

    let by_id = |s: &[&RunSummary]| -> HashMap<String, (OutcomeStatus, String)> {
        s.iter()
            .flat_map(|s| s.outcomes.iter())
            .map(|o| (o.identifier().to_string(), (o.status, o.note.clone())))
            .collect()
    };
    assert_eq!(by_id(&[&first, &second]), by_id(&[&full]));
    assert!(second.pending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delay_between_records_only() {
    let start = tokio::time::Instant::now();
    run(ScriptedPortal::new(), &["A", "B", "C"], &CancellationToken::new()).await;
    assert_eq!(start.elapsed(), Duration::from_millis(2000));
}

#[tokio::test]
async fn test_events_and_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal = OutcomeJournal::new(dir.path().join("run.journal"));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let runner = BatchRunner::new(RecordFlow::new(), credentials(), Duration::ZERO)
        .with_journal(journal.clone())
        .with_events(tx);
    let summary = runner
        .run(
            ScriptedPortal::new().not_found(&["B"]),
            vec![record("A", "x"), record("B", "x")],
            ProgramType::Pnfa,
            &CancellationToken::new(),
        )
        .await;
    drop(runner);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(RunEvent::Started { total: 2 })));
    assert!(matches!(
        events.last(),
        Some(RunEvent::Finished {
            successes: 1,
            failures: 1
        })
    ));
    let finished = events
        .iter()
        .filter(|e| matches!(e, RunEvent::RecordFinished { .. }))
        .count();
    assert_eq!(finished, 2);

    let journaled = journal.recover().await.unwrap();
    assert_eq!(journaled, summary.outcomes);
}
