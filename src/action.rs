//! Action execution — click, scroll, and scroll-until-converged.
//!
//! Each action runs to completion before the next one starts; there is no
//! cross-action state. Interaction primitives are not retried: a failing
//! click or scroll propagates and aborts the run.

use crate::driver::{HandleId, PageDriver, Scope};
use crate::error::ScrapeError;
use crate::extract::{self, Value};
use crate::record::{ExtractRule, SelectorRecord};
use crate::resolve::Handles;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default overall deadline for the convergence wait.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Sampling interval of the convergence loop.
const POLL_TICK: Duration = Duration::from_millis(100);

/// Parameters of the convergence wait.
#[derive(Debug, Clone)]
pub struct WaitParams<'a> {
    pub timeout_ms: u64,
    /// Convergence target: an independently configured, array-flagged
    /// selector whose match count is sampled every tick.
    pub target: Option<&'a SelectorRecord>,
}

/// Click the element, then wait for the network to go idle.
pub async fn click(driver: &dyn PageDriver, handle: HandleId) -> Result<(), ScrapeError> {
    driver.click(handle).await.map_err(ScrapeError::driver)?;
    driver
        .wait_for_network_idle()
        .await
        .map_err(ScrapeError::driver)
}

/// Scroll the element into view, then wait for the network to go idle.
pub async fn scroll_to(driver: &dyn PageDriver, handle: HandleId) -> Result<(), ScrapeError> {
    driver
        .scroll_into_view(handle)
        .await
        .map_err(ScrapeError::driver)?;
    driver
        .wait_for_network_idle()
        .await
        .map_err(ScrapeError::driver)
}

/// Reject a multi-element resolution for a single-element action.
pub fn single_target(name: &str, handles: &Handles) -> Result<Option<HandleId>, ScrapeError> {
    match handles {
        Handles::Many(_) => Err(ScrapeError::MultiElementTarget(name.to_string())),
        Handles::One(handle) => Ok(*handle),
    }
}

/// Scroll the primary element until the target count stops growing or the
/// probe on the primary element reads an empty string.
///
/// Sampled on a 100ms tick, bounded by `timeout_ms` of total elapsed time.
/// Per tick: sample the target's match count, scroll, then succeed if the
/// sampled count exceeded the running maximum or the primary element's
/// extracted value is the empty string. Without a valid (array-flagged)
/// target the loop only sleeps out its deadline.
///
/// Returns `true` on convergence and `false` once the deadline elapses;
/// giving up is a normal outcome, not an error.
pub async fn scroll_until_converged(
    driver: &dyn PageDriver,
    primary: HandleId,
    probe_rule: &ExtractRule,
    params: &WaitParams<'_>,
) -> Result<bool, ScrapeError> {
    let deadline = Duration::from_millis(params.timeout_ms);
    let started = Instant::now();

    let target = params
        .target
        .filter(|t| t.array && t.selector.is_some());

    // Seed the running maximum with the pre-scroll count so that elements
    // already present do not register as growth.
    let mut last_count = match target {
        Some(t) => {
            let css = t.selector.as_deref().unwrap_or_default();
            driver
                .query_all(Scope::Page, css)
                .await
                .map_err(ScrapeError::driver)?
                .len()
        }
        None => 0,
    };

    while started.elapsed() < deadline {
        if let Some(target) = target {
            let css = target.selector.as_deref().unwrap_or_default();
            let count = driver
                .query_all(Scope::Page, css)
                .await
                .map_err(ScrapeError::driver)?
                .len();

            scroll_to(driver, primary).await?;

            let grew = count > last_count;
            if grew {
                last_count = count;
            }

            let probe = extract::extract_handle(driver, primary, probe_rule).await?;
            let drained = matches!(&probe, Value::Text(t) if t.is_empty());

            if grew || drained {
                return Ok(true);
            }
        }

        sleep(POLL_TICK).await;
    }

    Ok(false)
}
