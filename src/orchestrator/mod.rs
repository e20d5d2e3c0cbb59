//! Orchestration layer
//!
//! ## Modules
//!
//! ### `batch_processor` - application shell
//! - input selection, journal reconciliation, browser session
//! - report / checkpoint / audit writing
//!
//! ### `batch_runner` - one run over one session
//! - authenticate once, then records strictly in order
//! - stop token, inter-record delay, session teardown
//!
//! ## Layering
//!
//! ```text
//! batch_processor (input + outputs)
//!     ↓
//! batch_runner (Vec<Record>)
//!     ↓
//! workflow::RecordFlow (one Record)
//!     ↓
//! services (portal driver / causal resolver / notices)
//!     ↓
//! infrastructure (JsExecutor, wait_until)
//! ```

pub mod batch_processor;
pub mod batch_runner;

pub use batch_processor::App;
pub use batch_runner::{AbortReason, BatchRunner, RunEvent, RunSummary};
