//! SIGAE portal driver - business capability layer
//!
//! Drives the portal's Yii/Select2 pages through `JsExecutor`. Every step waits on
//! an explicit condition with a bound from `WaitBounds`; there are no blind sleeps.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::browser::BrowserSession;
use crate::config::{Config, Credentials, WaitBounds};
use crate::error::PortalResult;
use crate::infrastructure::{wait_until, JsExecutor};
use crate::models::ProgramType;
use crate::services::portal::{ActionForm, Lookup, PortalDriver, PortalLauncher};

const INPUT_USER: &str = "#loginform-username";
const INPUT_PASSWORD: &str = "#loginform-password";
const INPUT_IDENTIFIER: &str = r#"input[name="AlumnoSearch[cedula]"]"#;
const SELECT_NATIONALITY: &str = r#"select[name="AlumnoSearch[nacionalidad]"]"#;
const LOGOUT_LINK: &str = r#"a[href*="logout"]"#;
const SELECT_REASON: &str = "#alumnobajaslicencias-id_estatus_academico";
const INPUT_DATE: &str = "#alumnobajaslicencias-fecha_inicio";
const TEXTAREA_DESCRIPTION: &str = "#alumnobajaslicencias-descripcion_solicitud";
const WITHDRAW_LINK: &str = r#"a[href*="solicitar-baja"]"#;

/// Marker attribute put on the element we are about to click
const TARGET_ATTR: &str = "data-bulk-target";

/// `r=estudiante%2Falumno-pnf` style routes; the slug must end the route segment
const LISTING_ROUTE: &str = r"alumno-([a-z]+)(?:[&#]|$)";

/// True when `url` is the listing view of `program` (not a sub-route, not the other variant)
pub fn is_listing_url(url: &str, program: ProgramType) -> bool {
    let Ok(re) = Regex::new(LISTING_ROUTE) else {
        return false;
    };
    let matched = re
        .captures_iter(url)
        .any(|c| c.get(1).map(|m| m.as_str()) == Some(program.slug()));
    matched
}

/// Reads only tables rendered after the last `mark_grid_stale`
const GRID_STATE_JS: &str = r#"(() => {
    try {
        const bodies = Array.from(document.querySelectorAll('table tbody'))
            .filter(b => !b.hasAttribute('data-bulk-stale'));
        if (bodies.length === 0) return { status: 'none' };
        for (const el of document.querySelectorAll('.empty')) {
            const t = (el.innerText || '').toLowerCase();
            if (t.includes('no hay') || t.includes('vac') || t.includes('empty')
                || t.includes('ningún') || t.includes('no se encontr')) {
                return { status: 'empty' };
            }
        }
        const rows = bodies.flatMap(b => Array.from(b.querySelectorAll('tr')))
            .filter(r => !r.querySelector('.empty'));
        return { status: rows.length > 0 ? 'rows' : 'empty' };
    } catch (e) {
        return { status: 'error', detail: String(e && e.message || e) };
    }
})()"#;

/// Set the nationality filter to `value` and fire `change`; `true` only when it changed
fn nationality_js(value: &str) -> PortalResult<String> {
    Ok(format!(
        r#"(() => {{
            const el = document.querySelector({});
            const want = {};
            if (!el || el.value === want) return false;
            if (!Array.from(el.options).some(o => o.value === want)) return false;
            el.value = want;
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#,
        serde_json::to_string(SELECT_NATIONALITY)?,
        serde_json::to_string(value)?
    ))
}

/// Grid state as reported by `GRID_STATE_JS`
#[derive(Debug, Deserialize)]
struct GridState {
    /// `rows`, `empty`, `none` or `error`
    status: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Result of a search; `Err` carries why the table cannot be trusted
///
/// `None` means the grid never re-rendered after the search, so whatever table is on
/// screen belongs to an earlier query.
fn classify_search(state: Option<&GridState>) -> Result<Lookup, String> {
    let Some(state) = state else {
        return Err("grid did not refresh".to_string());
    };
    match state.status.as_str() {
        "rows" => Ok(Lookup::Found),
        "empty" | "none" => Ok(Lookup::NotFound),
        _ => Err(state
            .detail
            .clone()
            .unwrap_or_else(|| "unknown grid state".to_string())),
    }
}

/// Launches (or attaches to) a real browser for each run
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserLauncher;

#[async_trait]
impl PortalLauncher for BrowserLauncher {
    type Driver = SigaePortal;

    async fn launch(&self, config: &Config) -> PortalResult<SigaePortal> {
        SigaePortal::open(config).await
    }
}

/// SIGAE portal driver
///
/// Owns the browser session for one run. Holds no "current program" state: the
/// program is an argument of every call that depends on it.
pub struct SigaePortal {
    executor: JsExecutor,
    session: Option<BrowserSession>,
    config: Config,
    waits: WaitBounds,
}

impl SigaePortal {
    /// Launch or attach a browser as configured
    pub async fn open(config: &Config) -> PortalResult<Self> {
        let session = BrowserSession::open(config).await?;
        Ok(Self::new(session, config))
    }

    pub fn new(session: BrowserSession, config: &Config) -> Self {
        Self {
            executor: JsExecutor::new(session.page()),
            session: Some(session),
            config: config.clone(),
            waits: config.waits(),
        }
    }

    // ========== DOM probes ==========

    /// Evaluate a boolean probe; a script error (page mid-navigation, stale node) reads as `false`
    async fn probe(&self, script: &str) -> PortalResult<bool> {
        match self.executor.eval_as::<bool>(script).await {
            Ok(v) => Ok(v),
            Err(e) if e.is_session_lost() => Err(e),
            Err(e) => {
                debug!("probe failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn is_visible(&self, selector: &str) -> PortalResult<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const r = el.getBoundingClientRect();
                const s = window.getComputedStyle(el);
                return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
            }})()"#,
            serde_json::to_string(selector)?
        );
        self.probe(&script).await
    }

    async fn exists(&self, selector: &str) -> PortalResult<bool> {
        let script = format!(
            "(() => !!document.querySelector({}))()",
            serde_json::to_string(selector)?
        );
        self.probe(&script).await
    }

    async fn url_matches_listing(&self, program: ProgramType) -> PortalResult<bool> {
        let url = self.executor.current_url().await?;
        Ok(is_listing_url(&url, program))
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> PortalResult<bool> {
        wait_until(timeout, self.waits.poll, || self.is_visible(selector)).await
    }

    // ========== result grid ==========

    /// Tag the current grid bodies so a re-rendered grid can be told apart
    async fn mark_grid_stale(&self) -> PortalResult<()> {
        self.probe(
            r#"(() => {
                document.querySelectorAll('table tbody').forEach(b => b.setAttribute('data-bulk-stale', '1'));
                return true;
            })()"#,
        )
        .await?;
        Ok(())
    }

    async fn grid_state(&self) -> PortalResult<GridState> {
        match self.executor.eval_as::<GridState>(GRID_STATE_JS).await {
            Ok(state) => Ok(state),
            Err(e) if e.is_session_lost() => Err(e),
            Err(e) => Ok(GridState {
                status: "error".to_string(),
                detail: Some(e.to_string()),
            }),
        }
    }

    async fn grid_settled(&self) -> PortalResult<bool> {
        let state = self.grid_state().await?;
        Ok(state.status == "rows" || state.status == "empty")
    }

    /// Empty the identifier filter; returns whether it held a value
    async fn clear_filter(&self) -> PortalResult<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el || !el.value) return false;
                el.value = '';
                return true;
            }})()"#,
            serde_json::to_string(INPUT_IDENTIFIER)?
        );
        self.probe(&script).await
    }

    /// Clear marker attributes left from the previous record
    async fn clear_targets(&self) -> PortalResult<()> {
        let script = format!(
            "(() => {{ document.querySelectorAll('[{0}]').forEach(e => e.removeAttribute('{0}')); return true; }})()",
            TARGET_ATTR
        );
        self.probe(&script).await?;
        Ok(())
    }

    /// JS snippet locating the identifier's row
    ///
    /// With a configured identifier cell the match is exact on that cell; the text
    /// scan over all cells is only used when rows do not have that cell.
    fn find_row_js(&self, identifier: &str) -> PortalResult<String> {
        let cell_index = match self.config.identifier_cell_index {
            Some(i) => i.to_string(),
            None => "null".to_string(),
        };
        Ok(format!(
            r#"const findRow = () => {{
                const id = {};
                const cellIndex = {};
                const rows = Array.from(document.querySelectorAll('table tbody tr'));
                if (cellIndex !== null) {{
                    const structured = rows.filter(r => r.cells && r.cells.length > cellIndex);
                    if (structured.length > 0) {{
                        return structured.find(r => (r.cells[cellIndex].innerText || '').trim() === id) || null;
                    }}
                }}
                return rows.find(r => Array.from(r.cells || []).some(td => (td.innerText || '').includes(id))) || null;
            }};"#,
            serde_json::to_string(identifier)?,
            cell_index
        ))
    }

    // ========== form fields ==========

    /// Set the Select2-backed reason selector; keystrokes do not reach it
    async fn set_reason(&self, form: &ActionForm) -> PortalResult<bool> {
        let script = format!(
            r#"(() => {{
                try {{
                    const sel = {sel};
                    const value = {value};
                    if (typeof jQuery !== 'undefined' && jQuery.fn.select2) {{
                        const $s = jQuery(sel);
                        if ($s.length) {{
                            $s.val(value);
                            $s.trigger('change.select2');
                            $s.trigger('change');
                            return $s.val() === value;
                        }}
                    }}
                    const el = document.querySelector(sel);
                    if (!el) return false;
                    el.value = value;
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    return el.value === value;
                }} catch (e) {{
                    return false;
                }}
            }})()"#,
            sel = serde_json::to_string(SELECT_REASON)?,
            value = serde_json::to_string(&form.code.value())?
        );
        self.probe(&script).await
    }

    /// Assign a text field by property and fire the change/input events widgets listen to
    async fn set_field(&self, selector: &str, value: &str, extra_event: Option<&str>) -> PortalResult<bool> {
        let script = format!(
            r#"(() => {{
                try {{
                    const value = {value};
                    const extra = {extra};
                    if (typeof jQuery !== 'undefined') {{
                        const $f = jQuery({sel});
                        if ($f.length) {{
                            $f.val(value);
                            $f.trigger('change');
                            $f.trigger('input');
                            if (extra) $f.trigger(extra);
                            return true;
                        }}
                    }}
                    const el = document.querySelector({sel});
                    if (!el) return false;
                    el.value = value;
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    return true;
                }} catch (e) {{
                    return false;
                }}
            }})()"#,
            sel = serde_json::to_string(selector)?,
            value = serde_json::to_string(value)?,
            extra = serde_json::to_string(&extra_event)?
        );
        self.probe(&script).await
    }

    /// Tag and click the submit button; `false` when there is none
    async fn click_submit(&self) -> PortalResult<bool> {
        let script = format!(
            r#"(() => {{
                const btn = document.querySelector('#button-submit-inscripcion')
                    || document.querySelector("button[type='submit']");
                if (!btn) return false;
                btn.setAttribute('{attr}', 'submit');
                btn.scrollIntoView({{ block: 'center' }});
                return true;
            }})()"#,
            attr = TARGET_ATTR
        );
        if !self.probe(&script).await? {
            return Ok(false);
        }
        self.executor
            .click(&format!(r#"[{}="submit"]"#, TARGET_ATTR))
            .await
    }

    /// Validation messages shown by the form after a rejected submit
    async fn form_errors(&self) -> PortalResult<Vec<String>> {
        let script = r#"(() => {
            try {
                return Array.from(document.querySelectorAll('.has-error .help-block, .invalid-feedback, .help-block-error'))
                    .map(e => (e.innerText || '').trim())
                    .filter(t => t.length > 0);
            } catch (e) {
                return [];
            }
        })()"#;
        match self.executor.eval_as::<Vec<String>>(script).await {
            Ok(errors) => Ok(errors),
            Err(e) if e.is_session_lost() => Err(e),
            Err(_) => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl PortalDriver for SigaePortal {
    async fn authenticate(&mut self, credentials: &Credentials) -> PortalResult<bool> {
        info!("↻ Signing in as {}...", credentials.username);
        let base_url = self.config.portal_base_url.clone();
        self.executor.goto(&base_url).await?;

        if !self.wait_visible(INPUT_USER, self.waits.default).await? {
            if self.exists(LOGOUT_LINK).await? {
                info!("✓ Session already active");
                return Ok(true);
            }
            warn!("✗ Login form not found");
            return Ok(false);
        }

        if !self
            .executor
            .type_into(INPUT_USER, &credentials.username, false)
            .await?
        {
            warn!("✗ Could not type username");
            return Ok(false);
        }
        let login_url = self.executor.current_url().await?;
        if !self
            .executor
            .type_into(INPUT_PASSWORD, &credentials.password, true)
            .await?
        {
            warn!("✗ Could not type password");
            return Ok(false);
        }

        // Either the page moves on or the form stays (bad credentials)
        let this = &*self;
        let login_url = login_url.as_str();
        wait_until(this.waits.short, this.waits.poll, || async move {
            let url = this.executor.current_url().await?;
            Ok(url != login_url || !this.is_visible(INPUT_USER).await?)
        })
        .await?;

        if self.is_visible(INPUT_USER).await? {
            warn!("✗ Invalid credentials");
            return Ok(false);
        }

        info!("✓ Signed in");
        Ok(true)
    }

    async fn navigate_to_listing(&mut self, program: ProgramType) -> PortalResult<bool> {
        let url = self.config.listing_url(program);
        debug!("↻ Opening {} listing", program);
        self.executor.goto(&url).await?;

        let this = &*self;
        let arrived = wait_until(this.waits.default, this.waits.poll, || {
            this.url_matches_listing(program)
        })
        .await?;

        if arrived {
            debug!("✓ {} listing loaded", program);
        } else {
            warn!("✗ {} listing did not load", program);
        }
        Ok(arrived)
    }

    async fn locate_record(&mut self, identifier: &str, program: ProgramType) -> PortalResult<Lookup> {
        info!("🔍 Searching {}...", identifier);

        if !self.url_matches_listing(program).await? && !self.navigate_to_listing(program).await? {
            return Ok(self.inconclusive("listing could not be loaded".to_string()));
        }

        if self.clear_filter().await? {
            debug!("clearing previous filter");
            self.mark_grid_stale().await?;
            self.executor.type_into(INPUT_IDENTIFIER, "", true).await?;
            let this = &*self;
            wait_until(this.waits.short, this.waits.poll, || this.grid_settled()).await?;
        }

        self.mark_grid_stale().await?;
        if self.probe(&nationality_js(&self.config.nationality_filter)?).await? {
            debug!("nationality filter set to '{}'", self.config.nationality_filter);
            let this = &*self;
            wait_until(this.waits.short, this.waits.poll, || this.grid_settled()).await?;
            self.mark_grid_stale().await?;
        }

        if !self
            .executor
            .type_into(INPUT_IDENTIFIER, identifier, true)
            .await?
        {
            return Ok(self.inconclusive("search field not found".to_string()));
        }

        let this = &*self;
        let refreshed =
            wait_until(this.waits.default, this.waits.poll, || this.grid_settled()).await?;
        let state = if refreshed {
            Some(self.grid_state().await?)
        } else {
            None
        };

        match classify_search(state.as_ref()) {
            Ok(Lookup::Found) => {
                info!("✓ {} found", identifier);
                Ok(Lookup::Found)
            }
            Ok(lookup) => {
                info!("✗ No results for {}", identifier);
                Ok(lookup)
            }
            Err(reason) => Ok(self.inconclusive(reason)),
        }
    }

    async fn open_action_form(&mut self, identifier: &str, program: ProgramType) -> PortalResult<bool> {
        info!("📝 Opening withdrawal form for {} ({})...", identifier, program);
        self.clear_targets().await?;

        let find_row = self.find_row_js(identifier)?;
        let row_probe = format!("(() => {{ {} return !!findRow(); }})()", find_row);
        let this = &*self;
        if !wait_until(this.waits.short, this.waits.poll, || this.probe(&row_probe)).await? {
            warn!("✗ No row for {}", identifier);
            return Ok(false);
        }

        // Direct action link in the row, or the row's dropdown toggle
        let pick = format!(
            r#"(() => {{
                {find_row}
                const row = findRow();
                if (!row) return 'no-row';
                const visible = el => {{
                    const r = el.getBoundingClientRect();
                    return r.width > 0 && r.height > 0;
                }};
                const direct = Array.from(row.querySelectorAll({link})).find(visible);
                if (direct) {{
                    direct.setAttribute('{attr}', 'withdraw');
                    return 'direct';
                }}
                const toggles = ['a.dropdown-toggle', 'button.dropdown-toggle', '.btn-group > button',
                    '.dropdown > button', "a[data-toggle='dropdown']", "button[data-toggle='dropdown']",
                    "[data-bs-toggle='dropdown']", '.btn.dropdown-toggle'];
                for (const sel of toggles) {{
                    const toggle = Array.from(row.querySelectorAll(sel)).find(visible);
                    if (toggle) {{
                        toggle.setAttribute('{attr}', 'menu');
                        return 'menu';
                    }}
                }}
                return 'no-menu';
            }})()"#,
            find_row = find_row,
            link = serde_json::to_string(WITHDRAW_LINK)?,
            attr = TARGET_ATTR
        );
        let choice: String = match self.executor.eval_as(pick).await {
            Ok(choice) => choice,
            Err(e) if e.is_session_lost() => return Err(e),
            Err(e) => {
                warn!("✗ Row inspection failed: {}", e);
                return Ok(false);
            }
        };

        match choice.as_str() {
            "direct" => {
                debug!("↻ Direct withdrawal link");
                self.executor
                    .click(&format!(r#"[{}="withdraw"]"#, TARGET_ATTR))
                    .await
            }
            "menu" => {
                debug!("↻ Opening row menu");
                if !self
                    .executor
                    .script_click(&format!(r#"[{}="menu"]"#, TARGET_ATTR))
                    .await?
                {
                    return Ok(false);
                }
                if !self.wait_visible(WITHDRAW_LINK, self.waits.short).await? {
                    warn!("✗ Withdrawal option not shown in menu");
                    return Ok(false);
                }
                let mark = format!(
                    r#"(() => {{
                        const link = Array.from(document.querySelectorAll({link}))
                            .find(el => {{ const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }});
                        if (!link) return false;
                        link.setAttribute('{attr}', 'withdraw');
                        return true;
                    }})()"#,
                    link = serde_json::to_string(WITHDRAW_LINK)?,
                    attr = TARGET_ATTR
                );
                if !self.probe(&mark).await? {
                    return Ok(false);
                }
                self.executor
                    .script_click(&format!(r#"[{}="withdraw"]"#, TARGET_ATTR))
                    .await
            }
            other => {
                warn!("✗ No action control for {} ({})", identifier, other);
                Ok(false)
            }
        }
    }

    async fn submit_action_form(&mut self, form: &ActionForm, program: ProgramType) -> PortalResult<bool> {
        info!("✍️ Filling form: {}", form.code);

        let this = &*self;
        if !wait_until(this.waits.short, this.waits.poll, || this.exists(SELECT_REASON)).await? {
            warn!("✗ Withdrawal form did not load");
            return Ok(false);
        }

        if !self.set_reason(form).await? {
            warn!("✗ Could not select reason {}", form.code);
            return Ok(false);
        }

        let today = Local::now().format("%d/%m/%Y").to_string();
        if !self.set_field(INPUT_DATE, &today, Some("dp.change")).await? {
            warn!("⚠️ Could not set date {}", today);
        }

        if !self
            .set_field(TEXTAREA_DESCRIPTION, &form.description, None)
            .await?
            && !self
                .executor
                .type_into(TEXTAREA_DESCRIPTION, &form.description, false)
                .await?
        {
            warn!("⚠️ Could not write description");
        }

        let form_url = self.executor.current_url().await?;
        if !self.click_submit().await? {
            warn!("✗ Submit button not found");
            return Ok(false);
        }

        debug!("⏳ Waiting for redirect...");
        let this = &*self;
        let form_url = form_url.as_str();
        let redirected = wait_until(this.waits.redirect, this.waits.poll, || async move {
            Ok(this.executor.current_url().await? != form_url)
        })
        .await?;

        if !redirected {
            let errors = self.form_errors().await?;
            if !errors.is_empty() {
                warn!("✗ Form rejected: {}", errors.join("; "));
                return Ok(false);
            }
            warn!("⚠️ URL did not change, leaving the form anyway");
        }

        // The confirmation overlay is never dismissed; reloading the listing gets past it
        if !self.navigate_to_listing(program).await? {
            warn!("⚠️ Could not return to listing after submit");
        }

        info!("✓ Form submitted: {}", form.causal_text);
        Ok(true)
    }

    async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        info!("🔒 Closing portal session...");

        let logout = async {
            if !self.executor.script_click(LOGOUT_LINK).await? {
                let url = self.config.logout_url();
                self.executor.goto(&url).await?;
            }
            PortalResult::Ok(())
        };
        match tokio::time::timeout(self.waits.short, logout).await {
            Ok(Ok(())) => debug!("logged out"),
            Ok(Err(e)) => debug!("logout skipped: {}", e),
            Err(_) => debug!("logout timed out"),
        }

        session.shutdown().await;
    }
}

impl SigaePortal {
    /// Inspection failure; lenient mode reports it as found
    fn inconclusive(&self, reason: String) -> Lookup {
        if self.config.assume_found_on_inspection_error {
            warn!("⚠️ Result table not inspectable ({}), assuming found", reason);
            Lookup::Found
        } else {
            warn!("⚠️ Result table not inspectable: {}", reason);
            Lookup::Inconclusive(reason)
        }
    }
}
