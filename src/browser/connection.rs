use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use super::BrowserSession;
use crate::error::{PortalError, PortalResult};

/// Attach to a browser started with `--remote-debugging-port` and open a page on `target_url`
///
/// Reuses an existing tab whose URL already starts with `target_url`.
pub async fn connect_to_browser(port: u16, target_url: &str) -> PortalResult<BrowserSession> {
    let browser_url = format!("http://localhost:{}", port);
    info!("🔗 Connecting to browser: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("Browser connection failed: {}", e);
        PortalError::Launch(format!("connect to {}: {}", browser_url, e))
    })?;
    debug!("Browser connected");

    // Drain CDP events in the background
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Let the target list settle
    sleep(Duration::from_millis(300)).await;

    let page = match find_page(&browser, target_url).await? {
        Some(page) => page,
        None => {
            debug!("No matching tab, opening {}", target_url);
            browser.new_page(target_url).await.map_err(|e| {
                error!("Failed to open page: {}", e);
                PortalError::from(e)
            })?
        }
    };

    Ok(BrowserSession::new(browser, page, handler_task, false))
}

async fn find_page(browser: &Browser, target_url: &str) -> PortalResult<Option<Page>> {
    let pages = browser.pages().await?;
    debug!("{} open tabs", pages.len());
    for page in pages {
        if let Ok(Some(url)) = page.url().await {
            if url.starts_with(target_url) {
                info!("✓ Reusing tab: {}", url);
                return Ok(Some(page));
            }
        }
    }
    Ok(None)
}
