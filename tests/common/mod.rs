#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sigae_bulk::config::{Config, Credentials};
use sigae_bulk::error::{PortalError, PortalResult};
use sigae_bulk::models::{ProgramType, Record};
use sigae_bulk::services::{ActionForm, Lookup, PortalDriver, PortalLauncher};

/// Calls seen by the scripted portal, shared with the test after the driver is moved
#[derive(Debug, Default)]
pub struct PortalLog {
    pub calls: Vec<String>,
    pub submitted: Vec<(String, ActionForm)>,
    pub closed: usize,
}

/// In-memory portal whose answers are scripted per identifier
#[derive(Clone, Default)]
pub struct ScriptedPortal {
    pub log: Arc<Mutex<PortalLog>>,
    pub reject_login: bool,
    pub not_found: HashSet<String>,
    pub uninspectable: HashSet<String>,
    pub unopenable: HashSet<String>,
    pub unsubmittable: HashSet<String>,
    pub session_dies_on: HashSet<String>,
    /// Cancel this token once the identifier has been submitted
    pub cancel_after: Option<(String, CancellationToken)>,
    current: Option<String>,
}

fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn not_found(mut self, ids: &[&str]) -> Self {
        self.not_found = set(ids);
        self
    }

    pub fn uninspectable(mut self, ids: &[&str]) -> Self {
        self.uninspectable = set(ids);
        self
    }

    pub fn unopenable(mut self, ids: &[&str]) -> Self {
        self.unopenable = set(ids);
        self
    }

    pub fn unsubmittable(mut self, ids: &[&str]) -> Self {
        self.unsubmittable = set(ids);
        self
    }

    pub fn session_dies_on(mut self, ids: &[&str]) -> Self {
        self.session_dies_on = set(ids);
        self
    }

    pub fn cancel_after(mut self, id: &str, token: CancellationToken) -> Self {
        self.cancel_after = Some((id.to_string(), token));
        self
    }

    fn note(&self, call: String) {
        self.log.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn submitted(&self) -> Vec<(String, ActionForm)> {
        self.log.lock().unwrap().submitted.clone()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    /// Identifiers that reached `locate_record`
    pub fn located(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.strip_prefix("locate:").map(String::from))
            .collect()
    }
}

#[async_trait]
impl PortalDriver for ScriptedPortal {
    async fn authenticate(&mut self, credentials: &Credentials) -> PortalResult<bool> {
        self.note(format!("login:{}", credentials.username));
        Ok(!self.reject_login)
    }

    async fn navigate_to_listing(&mut self, program: ProgramType) -> PortalResult<bool> {
        self.note(format!("listing:{}", program));
        Ok(true)
    }

    async fn locate_record(&mut self, identifier: &str, _program: ProgramType) -> PortalResult<Lookup> {
        self.note(format!("locate:{}", identifier));
        self.current = Some(identifier.to_string());
        if self.session_dies_on.contains(identifier) {
            return Err(PortalError::SessionLost("receiver is gone".into()));
        }
        if self.not_found.contains(identifier) {
            return Ok(Lookup::NotFound);
        }
        if self.uninspectable.contains(identifier) {
            return Ok(Lookup::Inconclusive("grid threw".into()));
        }
        Ok(Lookup::Found)
    }

    async fn open_action_form(&mut self, identifier: &str, _program: ProgramType) -> PortalResult<bool> {
        self.note(format!("open:{}", identifier));
        Ok(!self.unopenable.contains(identifier))
    }

    async fn submit_action_form(&mut self, form: &ActionForm, _program: ProgramType) -> PortalResult<bool> {
        let id = self.current.clone().unwrap_or_default();
        self.note(format!("submit:{}", id));
        if self.unsubmittable.contains(&id) {
            return Ok(false);
        }
        self.log.lock().unwrap().submitted.push((id.clone(), form.clone()));
        if let Some((after, token)) = &self.cancel_after {
            if *after == id {
                token.cancel();
            }
        }
        Ok(true)
    }

    async fn close(&mut self) {
        self.note("close".to_string());
        self.log.lock().unwrap().closed += 1;
    }
}

/// Hands out clones of one scripted portal, so the test keeps the shared log
pub struct ScriptedLauncher(pub ScriptedPortal);

#[async_trait]
impl PortalLauncher for ScriptedLauncher {
    type Driver = ScriptedPortal;

    async fn launch(&self, _config: &Config) -> PortalResult<ScriptedPortal> {
        Ok(self.0.clone())
    }
}

/// A browser that never starts
pub struct FailingLauncher;

#[async_trait]
impl PortalLauncher for FailingLauncher {
    type Driver = ScriptedPortal;

    async fn launch(&self, _config: &Config) -> PortalResult<ScriptedPortal> {
        Err(PortalError::Launch("no browser on debug port 1".into()))
    }
}

pub fn record(id: &str, causal: &str) -> Record {
    Record::new(id, Some(causal))
        .with_attribute("CÉDULA", id)
        .with_attribute("CAUSAL", causal)
}

pub fn records(ids: &[&str], causal: &str) -> Vec<Record> {
    ids.iter().map(|id| record(id, causal)).collect()
}

pub fn credentials() -> Credentials {
    Credentials::new("operador", "secreto")
}

pub fn ids_of_records(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.identifier.clone()).collect()
}
