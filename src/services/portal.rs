//! Portal driver seam
//!
//! The primitives every withdrawal goes through. Expected portal outcomes come back
//! as values (`false`, `Lookup::NotFound`); `Err` is reserved for failures of the
//! automation channel. Callers classify, they never retry a primitive: the only
//! retries are the bounded waits inside each implementation.

use async_trait::async_trait;

use crate::config::{Config, Credentials};
use crate::error::PortalResult;
use crate::models::{CausalCode, ProgramType};

/// Result of searching the listing for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// At least one data row
    Found,
    /// No rows, or the grid's explicit empty indicator
    NotFound,
    /// The result table itself could not be inspected
    Inconclusive(String),
}

/// Values written into the withdrawal form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionForm {
    pub code: CausalCode,
    pub causal_text: String,
    pub description: String,
}

impl ActionForm {
    pub fn new(code: CausalCode, causal_text: &str) -> Self {
        Self {
            code,
            causal_text: causal_text.to_string(),
            description: format!("Proceso automatizado - {}", causal_text),
        }
    }
}

#[async_trait]
pub trait PortalDriver: Send {
    /// Submit credentials; `false` when the login form is still shown afterwards
    async fn authenticate(&mut self, credentials: &Credentials) -> PortalResult<bool>;

    /// Navigate straight to the program's listing and confirm arrival by URL
    async fn navigate_to_listing(&mut self, program: ProgramType) -> PortalResult<bool>;

    /// Filter the listing by identifier and inspect the result table
    async fn locate_record(&mut self, identifier: &str, program: ProgramType) -> PortalResult<Lookup>;

    /// Open the withdrawal form from the identifier's result row
    async fn open_action_form(&mut self, identifier: &str, program: ProgramType) -> PortalResult<bool>;

    /// Fill and submit the open form, then return to the listing
    async fn submit_action_form(&mut self, form: &ActionForm, program: ProgramType) -> PortalResult<bool>;

    /// Log out and release the browser; must be safe to call on a broken session
    async fn close(&mut self);
}

/// Opens one driver per run
#[async_trait]
pub trait PortalLauncher: Send + Sync {
    type Driver: PortalDriver + 'static;

    async fn launch(&self, config: &Config) -> PortalResult<Self::Driver>;
}
