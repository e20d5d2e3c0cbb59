//! Application shell - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Input**: resume the recovery file or start from the input workbook
//! 2. **Reconciliation**: drop records an interrupted run already attempted
//! 3. **Session**: launch or attach the browser and build the portal driver
//! 4. **Run**: hand everything to `BatchRunner` on a background task and log its events
//! 5. **Outputs**: report, checkpoint, audit, then clear the journal
//!
//! The stop token is owned by the caller; cancelling it ends the run after the
//! record in flight. A run that fails before or while processing still writes its
//! outputs: every record not in the journal goes back to the checkpoint.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, Credentials};
use crate::models::{load_dataset, ColumnSpec, Dataset, Outcome, Record};
use crate::orchestrator::batch_runner::{BatchRunner, RunEvent, RunSummary};
use crate::services::{BrowserLauncher, NoticeWriter, PortalLauncher};
use crate::store::{AuditSummary, CheckpointStore, OutcomeJournal, ReportStore};
use crate::utils::logging::{init_log_file, log_records_loaded, log_startup, print_final_stats};
use crate::workflow::RecordFlow;

/// Records for this run plus what an interrupted run already did
struct RunInput {
    dataset: Dataset,
    source: String,
    carried: Vec<Outcome>,
}

pub struct App {
    config: Config,
    credentials: Credentials,
}

impl App {
    pub async fn initialize(config: Config, credentials: Credentials) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);
        Ok(Self {
            config,
            credentials,
        })
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        self.run_with(&BrowserLauncher, cancel).await
    }

    /// Same as `run` with the portal driver supplied by `launcher`
    pub async fn run_with<L: PortalLauncher>(
        &self,
        launcher: &L,
        cancel: CancellationToken,
    ) -> Result<()> {
        let checkpoint = CheckpointStore::new(&self.config.recovery_file);
        let journal = OutcomeJournal::new(&self.config.journal_file);

        let input = self.prepare_input(&checkpoint, &journal).await?;
        if input.dataset.is_empty() && input.carried.is_empty() {
            warn!("⚠️ No records to process");
            return Ok(());
        }
        log_records_loaded(input.dataset.len(), &input.source, input.carried.len());

        let summary = if input.dataset.is_empty() {
            RunSummary::default()
        } else {
            match self
                .process(launcher, input.dataset.records.clone(), &journal, cancel)
                .await
            {
                Ok(summary) => summary,
                Err(e) => {
                    error!("❌ Run failed: {:#}", e);
                    if let Err(save_err) = self.salvage(&input.dataset, &checkpoint, &journal).await {
                        error!("❌ Pending records could not be saved: {:#}", save_err);
                    }
                    return Err(e);
                }
            }
        };

        let mut outcomes = input.carried;
        outcomes.extend(summary.outcomes.iter().cloned());
        self.persist(&input.dataset.headers, &outcomes, &summary, &checkpoint, &journal)
            .await
    }

    /// Pick the input and subtract journaled outcomes
    async fn prepare_input(
        &self,
        checkpoint: &CheckpointStore,
        journal: &OutcomeJournal,
    ) -> Result<RunInput> {
        let columns = ColumnSpec::new(&self.config.identifier_column, &self.config.causal_columns);

        let (dataset, source) = if checkpoint.exists() && self.config.resume_pending {
            info!("↩️ Resuming from {}", checkpoint.path().display());
            let dataset = checkpoint.load(&columns).await?;
            (dataset, checkpoint.path().display().to_string())
        } else {
            if checkpoint.exists() {
                checkpoint
                    .discard_to_backup(Path::new(&self.config.reports_dir))
                    .await?;
                // the journal belongs to the discarded run
                journal.clear().await?;
            }
            let sheet = self.config.program.sheet_name();
            let dataset = load_dataset(&self.config.input_file, sheet, &columns).await?;
            (dataset, self.config.input_file.clone())
        };

        let carried = journal.recover().await?;
        let attempted: HashSet<String> = carried.iter().map(|o| o.identifier().to_string()).collect();
        let before = dataset.len();
        let dataset = dataset.without(&attempted);
        if before != dataset.len() {
            info!(
                "↩️ {} records skipped, already attempted before the interruption",
                before - dataset.len()
            );
        }

        Ok(RunInput {
            dataset,
            source,
            carried,
        })
    }

    /// Open the portal and run the batch on a background task
    async fn process<L: PortalLauncher>(
        &self,
        launcher: &L,
        records: Vec<Record>,
        journal: &OutcomeJournal,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let portal = launcher
            .launch(&self.config)
            .await
            .context("opening the browser session")?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = BatchRunner::new(
            self.record_flow().await,
            self.credentials.clone(),
            self.config.inter_record_delay(),
        )
        .with_journal(journal.clone())
        .with_events(tx);
        let program = self.config.program;

        let handle =
            tokio::spawn(async move { runner.run(portal, records, program, &cancel).await });

        while let Some(event) = rx.recv().await {
            log_event(&event);
        }

        handle
            .await
            .context("batch task failed; attempted records remain in the journal")
    }

    async fn record_flow(&self) -> RecordFlow {
        let flow = RecordFlow::new();
        let Some(template) = &self.config.notice_template else {
            return flow;
        };
        match NoticeWriter::from_template_file(Path::new(template), &self.config.notices_dir).await {
            Ok(writer) => flow.with_notices(Arc::new(writer)),
            Err(e) => {
                warn!("⚠️ Notices disabled: {:#}", e);
                flow
            }
        }
    }

    /// Outputs for a run that never produced a summary
    ///
    /// The journal is the only trace of what was attempted: its outcomes are reported
    /// and every other record of the input is pending.
    async fn salvage(
        &self,
        dataset: &Dataset,
        checkpoint: &CheckpointStore,
        journal: &OutcomeJournal,
    ) -> Result<()> {
        let outcomes = journal.recover().await?;
        let attempted: HashSet<String> = outcomes.iter().map(|o| o.identifier().to_string()).collect();
        let summary = RunSummary {
            pending: dataset.clone().without(&attempted).records,
            ..RunSummary::default()
        };
        self.persist(&dataset.headers, &outcomes, &summary, checkpoint, journal)
            .await
    }

    /// Report, checkpoint and audit; the journal is cleared only when all are written
    async fn persist(
        &self,
        headers: &[String],
        outcomes: &[Outcome],
        summary: &RunSummary,
        checkpoint: &CheckpointStore,
        journal: &OutcomeJournal,
    ) -> Result<()> {
        let now = Local::now();

        if !outcomes.is_empty() {
            ReportStore::new(&self.config.reports_dir)
                .write(headers, outcomes, now)
                .await?;
        }
        checkpoint.save(headers, &summary.pending).await?;

        let audit = AuditSummary::from_outcomes(outcomes);
        audit.log();
        if let Err(e) = audit.write(Path::new(&self.config.audits_dir), now).await {
            warn!("⚠️ Audit not written: {}", e);
        }

        journal.clear().await?;
        print_final_stats(&audit, summary.pending.len(), &self.config.output_log_file);
        Ok(())
    }
}

fn log_event(event: &RunEvent) {
    match event {
        RunEvent::Started { total } => info!("📦 Batch started: {} records", total),
        RunEvent::RecordStarted { .. } => {}
        RunEvent::RecordFinished {
            index,
            total,
            outcome,
        } => info!(
            "[{}/{}] {} {} - {}",
            index,
            total,
            outcome.identifier(),
            outcome.status,
            outcome.note
        ),
        RunEvent::Stopped { attempted, pending } => warn!(
            "🛑 Stopped by operator: {} attempted, {} pending",
            attempted, pending
        ),
        RunEvent::Aborted(reason) => error!("❌ Batch aborted: {}", reason),
        RunEvent::Finished {
            successes,
            failures,
        } => info!("✓ Batch finished: {} ok, {} failed", successes, failures),
    }
}
