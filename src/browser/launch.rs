use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use super::BrowserSession;
use crate::error::{PortalError, PortalResult};

/// Launch a local Chrome/Edge and open `url`
pub async fn launch_browser(
    url: &str,
    headless: bool,
    executable: Option<&str>,
) -> PortalResult<BrowserSession> {
    info!("🚀 Launching browser (headless: {})...", headless);

    let mut builder = BrowserConfig::builder().window_size(1366, 900).args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--start-maximized",
    ]);
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(path) = executable {
        builder = builder.chrome_executable(Path::new(path));
    }
    let config = builder.build().map_err(|e| {
        error!("Browser configuration failed: {}", e);
        PortalError::Launch(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("Browser launch failed: {}", e);
        PortalError::Launch(e.to_string())
    })?;
    debug!("Browser process started");

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("Failed to open page: {}", e);
        PortalError::from(e)
    })?;
    info!("✅ Browser ready at {}", url);

    Ok(BrowserSession::new(browser, page, handler_task, true))
}
