//! Bounded wait-for-condition primitive
//!
//! Every wait in the driver goes through `wait_until`, so a stuck page turns into a
//! `false` after the bound instead of hanging the batch.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::PortalResult;

/// Poll `probe` every `poll` until it returns `true` or `timeout` elapses
///
/// The probe always runs at least once. A timeout yields `Ok(false)`; probe errors
/// are returned immediately.
pub async fn wait_until<F, Fut>(timeout: Duration, poll: Duration, mut probe: F) -> PortalResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortalResult<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        sleep(poll.min(deadline - now)).await;
    }
}
