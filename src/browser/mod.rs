//! Browser lifecycle: launch or attach, and teardown

pub mod connection;
pub mod launch;

use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use connection::connect_to_browser;
pub use launch::launch_browser;

use crate::config::Config;
use crate::error::PortalResult;

/// A browser plus the page the run drives
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// Launched by us (closed on teardown) rather than attached to
    owned: bool,
}

impl BrowserSession {
    fn new(browser: Browser, page: Page, handler_task: JoinHandle<()>, owned: bool) -> Self {
        Self {
            browser,
            page,
            handler_task,
            owned,
        }
    }

    /// Attach when a debug port is configured, otherwise launch
    pub async fn open(config: &Config) -> PortalResult<Self> {
        match config.browser_debug_port {
            Some(port) => connect_to_browser(port, &config.portal_base_url).await,
            None => {
                launch_browser(
                    &config.portal_base_url,
                    config.headless,
                    config.chrome_executable.as_deref(),
                )
                .await
            }
        }
    }

    pub fn page(&self) -> Page {
        self.page.clone()
    }

    /// Close the browser we launched; an attached browser is left running
    pub async fn shutdown(mut self) {
        if self.owned {
            if let Err(e) = self.browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                debug!("Browser wait failed: {}", e);
            }
        }
        self.handler_task.abort();
    }
}
