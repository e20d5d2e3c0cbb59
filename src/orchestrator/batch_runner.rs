//! Batch runner - orchestration layer
//!
//! Sole owner of the portal session for one run. Processes records strictly in
//! order, one at a time, and splits the input into attempted (`outcomes`) and
//! never-attempted (`pending`) records:
//!
//! - the stop token is checked at the top of every iteration; the record in flight
//!   always finishes first
//! - authentication happens once; if it fails nothing is attempted
//! - a lost browser session ends the run after the in-flight record
//! - the session is closed on every exit path

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Credentials;
use crate::models::{normalize_records, Outcome, ProgramType, Record};
use crate::services::PortalDriver;
use crate::store::OutcomeJournal;
use crate::workflow::{RecordCtx, RecordFlow};

/// Why a run ended before its last record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The portal kept showing the login form
    AuthenticationFailed,
    /// Transport failure before any record was attempted
    SessionUnavailable(String),
    /// The browser session died while processing this identifier
    SessionLost { identifier: String },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::AuthenticationFailed => write!(f, "authentication failed"),
            AbortReason::SessionUnavailable(e) => write!(f, "session unavailable: {}", e),
            AbortReason::SessionLost { identifier } => {
                write!(f, "session lost while processing {}", identifier)
            }
        }
    }
}

/// One-way progress stream for a foreground controller
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started { total: usize },
    RecordStarted { index: usize, total: usize, identifier: String },
    RecordFinished { index: usize, total: usize, outcome: Outcome },
    Stopped { attempted: usize, pending: usize },
    Aborted(AbortReason),
    Finished { successes: usize, failures: usize },
}

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<Outcome>,
    /// Never attempted, in input order
    pub pending: Vec<Record>,
    /// The stop token ended the run
    pub stopped: bool,
    pub abort: Option<AbortReason>,
}

impl RunSummary {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty() && self.abort.is_none()
    }
}

pub struct BatchRunner {
    flow: RecordFlow,
    credentials: Credentials,
    inter_record_delay: Duration,
    journal: Option<OutcomeJournal>,
    events: Option<UnboundedSender<RunEvent>>,
}

impl BatchRunner {
    pub fn new(flow: RecordFlow, credentials: Credentials, inter_record_delay: Duration) -> Self {
        Self {
            flow,
            credentials,
            inter_record_delay,
            journal: None,
            events: None,
        }
    }

    /// Append every outcome to `journal` as soon as it exists
    pub fn with_journal(mut self, journal: OutcomeJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the batch, then close the driver whatever happened
    pub async fn run<D>(
        &self,
        mut driver: D,
        records: Vec<Record>,
        program: ProgramType,
        cancel: &CancellationToken,
    ) -> RunSummary
    where
        D: PortalDriver,
    {
        let summary = self.process(&mut driver, records, program, cancel).await;
        driver.close().await;

        match &summary.abort {
            Some(reason) => self.emit(RunEvent::Aborted(reason.clone())),
            None if summary.stopped => self.emit(RunEvent::Stopped {
                attempted: summary.outcomes.len(),
                pending: summary.pending.len(),
            }),
            None => {}
        }
        self.emit(RunEvent::Finished {
            successes: summary.successes(),
            failures: summary.failures(),
        });
        summary
    }

    async fn process<D>(
        &self,
        driver: &mut D,
        records: Vec<Record>,
        program: ProgramType,
        cancel: &CancellationToken,
    ) -> RunSummary
    where
        D: PortalDriver,
    {
        let records = normalize_records(records);
        let total = records.len();
        self.emit(RunEvent::Started { total });

        if let Some(reason) = self.open_session(driver, program).await {
            error!("❌ Run aborted: {}", reason);
            return RunSummary {
                pending: records,
                abort: Some(reason),
                ..Default::default()
            };
        }

        let mut summary = RunSummary::default();
        let mut queue = records.into_iter().enumerate();

        while let Some((i, record)) = queue.next() {
            if cancel.is_cancelled() {
                warn!("🛑 Stop requested, {} records left pending", queue.len() + 1);
                summary.stopped = true;
                summary.pending.push(record);
                summary.pending.extend(queue.by_ref().map(|(_, r)| r));
                break;
            }

            let ctx = RecordCtx::new(i + 1, total, record.identifier.clone(), program);
            info!("{} ▶ {}", ctx, ctx.identifier);
            self.emit(RunEvent::RecordStarted {
                index: ctx.index,
                total,
                identifier: ctx.identifier.clone(),
            });

            let result = self.flow.run(driver, record, &ctx).await;
            self.record_outcome(&result.outcome).await;
            self.emit(RunEvent::RecordFinished {
                index: ctx.index,
                total,
                outcome: result.outcome.clone(),
            });
            summary.outcomes.push(result.outcome);

            if result.session_lost {
                error!("{} ❌ Browser session lost, stopping batch", ctx);
                summary.abort = Some(AbortReason::SessionLost {
                    identifier: ctx.identifier,
                });
                summary.pending.extend(queue.by_ref().map(|(_, r)| r));
                break;
            }

            if queue.len() > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.inter_record_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        summary
    }

    /// Authenticate once and open the listing; `Some` means nothing may be attempted
    async fn open_session<D>(&self, driver: &mut D, program: ProgramType) -> Option<AbortReason>
    where
        D: PortalDriver,
    {
        match driver.authenticate(&self.credentials).await {
            Ok(true) => {}
            Ok(false) => return Some(AbortReason::AuthenticationFailed),
            Err(e) => return Some(AbortReason::SessionUnavailable(e.to_string())),
        }

        match driver.navigate_to_listing(program).await {
            Ok(true) => None,
            // locate_record navigates again on its own
            Ok(false) => {
                warn!("⚠️ {} listing not confirmed after login", program);
                None
            }
            Err(e) if e.is_session_lost() => Some(AbortReason::SessionUnavailable(e.to_string())),
            Err(e) => {
                warn!("⚠️ Could not open {} listing: {}", program, e);
                None
            }
        }
    }

    async fn record_outcome(&self, outcome: &Outcome) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(outcome).await {
                warn!("⚠️ Could not journal {}: {}", outcome.identifier(), e);
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
