//! Record processing flow - workflow layer
//!
//! Defines the full life of one record:
//!
//! `Pending -> Locating -> FormOpen -> Submitting -> Done(status)`
//!
//! Every `false` from the driver ends the record with a classified failure. Driver
//! errors are caught here, at the per-record boundary, and become a failure with a
//! truncated message; a lost session is additionally reported so the batch can stop.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::PortalResult;
use crate::models::outcome::{
    ERROR_NOTE_CHARS, NOTE_FORM_INCOMPLETE, NOTE_FORM_UNOPENABLE, NOTE_INSPECTION_FAILED,
    NOTE_NOTICE_FAILED, NOTE_NOT_FOUND, NOTE_PROCESSED,
};
use crate::models::{Outcome, OutcomeStatus, Record};
use crate::services::causal_resolver;
use crate::services::{ActionForm, DocumentGenerator, Lookup, NoticeFields, PortalDriver};
use crate::utils::logging::truncate_text;
use crate::workflow::record_ctx::RecordCtx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Locating,
    FormOpen,
    Submitting,
    Done(OutcomeStatus),
}

/// Result of one record
#[derive(Debug, Clone)]
pub struct RecordResult {
    pub outcome: Outcome,
    /// The browser session died while this record was in flight
    pub session_lost: bool,
}

/// Record processing flow
///
/// - sequences the driver primitives for one record
/// - holds no browser resources; the driver is borrowed per call
/// - never retries a primitive
pub struct RecordFlow {
    notices: Option<Arc<dyn DocumentGenerator>>,
}

impl RecordFlow {
    pub fn new() -> Self {
        Self { notices: None }
    }

    /// Generate a notice after every successful record
    pub fn with_notices(mut self, generator: Arc<dyn DocumentGenerator>) -> Self {
        self.notices = Some(generator);
        self
    }

    pub async fn run<D>(&self, driver: &mut D, record: Record, ctx: &RecordCtx) -> RecordResult
    where
        D: PortalDriver + ?Sized,
    {
        let mut state = RecordState::Pending;
        let mut note = String::new();
        let mut session_lost = false;

        let status = loop {
            if let RecordState::Done(status) = state {
                break status;
            }
            match self.step(driver, state, &record, ctx).await {
                Ok((next, step_note)) => {
                    debug!("{} {:?} -> {:?}", ctx, state, next);
                    if let Some(n) = step_note {
                        note = n.to_string();
                    }
                    state = next;
                }
                Err(e) => {
                    error!("{} ❌ {:?} failed: {}", ctx, state, e);
                    session_lost = e.is_session_lost();
                    note = format!(
                        "unexpected error: {}",
                        truncate_text(&e.to_string(), ERROR_NOTE_CHARS)
                    );
                    state = RecordState::Done(OutcomeStatus::Failure);
                }
            }
        };

        if status == OutcomeStatus::Success && !self.write_notice(&record, ctx).await {
            note = NOTE_NOTICE_FAILED.to_string();
        }

        let outcome = match status {
            OutcomeStatus::Success => Outcome::success(record, note),
            OutcomeStatus::Failure => Outcome::failure(record, note),
        };
        RecordResult {
            outcome,
            session_lost,
        }
    }

    /// One transition; returns the next state and, when terminal, its note
    async fn step<D>(
        &self,
        driver: &mut D,
        state: RecordState,
        record: &Record,
        ctx: &RecordCtx,
    ) -> PortalResult<(RecordState, Option<&'static str>)>
    where
        D: PortalDriver + ?Sized,
    {
        let failed = |note: &'static str| Ok((RecordState::Done(OutcomeStatus::Failure), Some(note)));

        match state {
            RecordState::Pending => Ok((RecordState::Locating, None)),

            RecordState::Locating => match driver.locate_record(&ctx.identifier, ctx.program).await? {
                Lookup::Found => Ok((RecordState::FormOpen, None)),
                Lookup::NotFound => {
                    warn!("{} ⚠️ {} not found", ctx, ctx.identifier);
                    failed(NOTE_NOT_FOUND)
                }
                Lookup::Inconclusive(reason) => {
                    warn!("{} ⚠️ result table not inspectable: {}", ctx, reason);
                    failed(NOTE_INSPECTION_FAILED)
                }
            },

            RecordState::FormOpen => {
                if driver.open_action_form(&ctx.identifier, ctx.program).await? {
                    Ok((RecordState::Submitting, None))
                } else {
                    warn!("{} ⚠️ could not open withdrawal form", ctx);
                    failed(NOTE_FORM_UNOPENABLE)
                }
            }

            RecordState::Submitting => {
                let resolution = causal_resolver::resolve(record.causal.as_deref());
                debug!("{} causal {:?} -> {}", ctx, record.causal, resolution.code);
                let form = ActionForm::new(resolution.code, record.causal_text());

                if driver.submit_action_form(&form, ctx.program).await? {
                    info!("{} ✅ {} processed", ctx, ctx.identifier);
                    Ok((RecordState::Done(OutcomeStatus::Success), Some(NOTE_PROCESSED)))
                } else {
                    warn!("{} ⚠️ form could not be completed", ctx);
                    failed(NOTE_FORM_INCOMPLETE)
                }
            }

            RecordState::Done(_) => Ok((state, None)),
        }
    }

    /// Best-effort notice; `false` only when a configured generator failed
    async fn write_notice(&self, record: &Record, ctx: &RecordCtx) -> bool {
        let Some(generator) = &self.notices else {
            return true;
        };
        match generator.generate(&NoticeFields::from_record(record)).await {
            Ok(path) => {
                debug!("{} 📄 notice written: {}", ctx, path.display());
                true
            }
            Err(e) => {
                warn!("{} ⚠️ notice generation failed: {:#}", ctx, e);
                false
            }
        }
    }
}

impl Default for RecordFlow {
    fn default() -> Self {
        Self::new()
    }
}
