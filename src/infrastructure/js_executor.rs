//! JS executor - infrastructure layer
//!
//! Owns the single `Page` of the run and exposes script evaluation plus the few
//! native interactions (navigation, click, typing) the portal flow needs.

use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{PortalError, PortalResult};

/// JS executor
///
/// - the only holder of the `Page`
/// - knows nothing about records or forms
/// - every failure is classified through `PortalError`, so a dead browser
///   surfaces as `SessionLost` no matter which call noticed it
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Evaluate a script and return its JSON result
    pub async fn eval(&self, js_code: impl Into<String>) -> PortalResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// Evaluate a script and deserialise its result
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> PortalResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    pub async fn goto(&self, url: &str) -> PortalResult<()> {
        debug!("goto {}", url);
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(e) => match PortalError::from(e) {
                lost @ PortalError::SessionLost(_) => Err(lost),
                other => Err(PortalError::Navigation {
                    url: url.to_string(),
                    details: other.to_string(),
                }),
            },
        }
    }

    pub async fn current_url(&self) -> PortalResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// Click the first element matching `selector`
    ///
    /// Uses a native click first; when that is blocked (overlay, detached node) the
    /// click is dispatched from script instead. Returns `false` if nothing matches.
    pub async fn click(&self, selector: &str) -> PortalResult<bool> {
        match self.page.find_element(selector).await {
            Ok(element) => match element.click().await {
                Ok(_) => return Ok(true),
                Err(e) => {
                    let err = PortalError::from(e);
                    if err.is_session_lost() {
                        return Err(err);
                    }
                    debug!("native click on {} failed ({}), using script click", selector, err);
                }
            },
            Err(e) => {
                let err = PortalError::from(e);
                if err.is_session_lost() {
                    return Err(err);
                }
            }
        }
        self.script_click(selector).await
    }

    /// Script-dispatched click, bypasses hit testing
    pub async fn script_click(&self, selector: &str) -> PortalResult<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            serde_json::to_string(selector)?
        );
        self.eval_as(script).await
    }

    /// Focus a field, type `text` as real keystrokes and optionally press Enter
    pub async fn type_into(&self, selector: &str, text: &str, press_enter: bool) -> PortalResult<bool> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => {
                let err = PortalError::from(e);
                if err.is_session_lost() {
                    return Err(err);
                }
                debug!("field {} not found: {}", selector, err);
                return Ok(false);
            }
        };
        element
            .click()
            .await
            .map_err(|e| element_error(selector, e))?;
        element
            .type_str(text)
            .await
            .map_err(|e| element_error(selector, e))?;
        if press_enter {
            element
                .press_key("Enter")
                .await
                .map_err(|e| element_error(selector, e))?;
        }
        Ok(true)
    }
}

fn element_error(selector: &str, err: CdpError) -> PortalError {
    match PortalError::from(err) {
        lost @ PortalError::SessionLost(_) => lost,
        other => PortalError::Element(format!("{}: {}", selector, other)),
    }
}
