//! # SIGAE Bulk
//!
//! Bulk student withdrawals against the SIGAE portal, driven through a browser
//!
//! ## Architecture
//!
//! ### ① Infrastructure
//! - `infrastructure/` - holds the scarce resource (the Page) and only exposes capabilities
//! - `JsExecutor` - the only page owner: eval, goto, click, typing
//! - `wait_until` - the single bounded wait primitive
//!
//! ### ② Services
//! - `services/` - "what I can do", one record at a time
//! - `PortalDriver` / `SigaePortal` - authenticate, listing, locate, open form, submit
//! - `causal_resolver` - free-text reason to portal code
//! - `NoticeWriter` - per-record notice documents
//!
//! ### ③ Workflow
//! - `workflow/` - the full life of one record
//! - `RecordCtx` - position in the batch
//! - `RecordFlow` - state machine (locate → open form → submit)
//!
//! ### ④ Orchestration
//! - `orchestrator/batch_runner` - one sequential run over one session
//! - `orchestrator/batch_processor` - input, checkpoint, report and audit around a run
//!
//! ## Modules

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

pub use config::{Config, Credentials};
pub use error::{ConfigError, DataError, PortalError, PortalResult};
pub use infrastructure::JsExecutor;
pub use models::{CausalCode, Outcome, OutcomeStatus, ProgramType, Record};
pub use orchestrator::{App, BatchRunner, RunEvent, RunSummary};
pub use services::{BrowserLauncher, PortalDriver, PortalLauncher, SigaePortal};
pub use workflow::{RecordCtx, RecordFlow, RecordState};
