//! Chromium-backed page driver using chromiumoxide.

use super::{HandleId, PageDriver, Scope};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use dashmap::DashMap;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long `wait_for_network_idle` keeps polling before giving up and
/// letting the run proceed with whatever the page has.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between idle-probe samples.
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SCRAPERUN_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SCRAPERUN_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.scraperun/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".scraperun/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".scraperun/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".scraperun/chromium/chrome-linux64/chrome"),
                home.join(".scraperun/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Headless Chromium page driver.
///
/// Owns one browser process and one page. Resolved elements are kept in a
/// registry keyed by opaque [`HandleId`]s; the registry is never pruned
/// within a run because handles die with the page anyway.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handles: DashMap<u64, Arc<Element>>,
    next_handle: AtomicU64,
    nav_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch a headless Chromium instance with a single blank page.
    pub async fn launch(nav_timeout_ms: u64) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome or set SCRAPERUN_CHROMIUM_PATH.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1280, 800)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--lang=en-US,en")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The handler stream must be drained for the browser to function.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create page")?;

        Ok(Self {
            browser,
            page,
            handles: DashMap::new(),
            next_handle: AtomicU64::new(1),
            nav_timeout: Duration::from_millis(nav_timeout_ms),
        })
    }

    /// Close the page and the browser process.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.page.clone().close().await;
        let _ = self.browser.close().await;
        Ok(())
    }

    fn register(&self, element: Element) -> HandleId {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(id, Arc::new(element));
        HandleId(id)
    }

    fn element(&self, handle: HandleId) -> Result<Arc<Element>> {
        self.handles
            .get(&handle.0)
            .map(|entry| Arc::clone(entry.value()))
            .with_context(|| format!("stale element handle {}", handle.0))
    }

    /// Call a zero-argument JS function with the element as `this` and
    /// return its value.
    async fn eval_on(&self, handle: HandleId, function: &str) -> Result<Option<serde_json::Value>> {
        let element = self.element(handle)?;
        let ret = element
            .call_js_fn(function, false)
            .await
            .context("element evaluation failed")?;
        Ok(ret.result.value)
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let result = tokio::time::timeout(self.nav_timeout, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                self.wait_for_network_idle().await
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", self.nav_timeout.as_millis()),
        }
    }

    async fn query(&self, scope: Scope, css: &str) -> Result<Option<HandleId>> {
        let found = match scope {
            Scope::Page => self.page.find_element(css).await,
            Scope::Node(h) => self.element(h)?.find_element(css).await,
        };
        match found {
            Ok(element) => Ok(Some(self.register(element))),
            Err(e) if is_selector_miss(&e) => {
                debug!(selector = css, error = %e, "no match for selector");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("query `{css}` failed")),
        }
    }

    async fn query_all(&self, scope: Scope, css: &str) -> Result<Vec<HandleId>> {
        let found = match scope {
            Scope::Page => self.page.find_elements(css).await,
            Scope::Node(h) => self.element(h)?.find_elements(css).await,
        };
        match found {
            Ok(elements) => Ok(elements.into_iter().map(|e| self.register(e)).collect()),
            Err(e) if is_selector_miss(&e) => {
                debug!(selector = css, error = %e, "no matches for selector");
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("query `{css}` failed")),
        }
    }

    async fn text_content(&self, handle: HandleId) -> Result<String> {
        let value = self
            .eval_on(handle, "function() { return this.textContent ?? ''; }")
            .await?;
        Ok(value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn inner_html(&self, handle: HandleId) -> Result<String> {
        let value = self
            .eval_on(handle, "function() { return this.innerHTML ?? ''; }")
            .await?;
        Ok(value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn attribute(&self, handle: HandleId, name: &str) -> Result<Option<String>> {
        let js = format!(
            "function() {{ return this.getAttribute('{}'); }}",
            sanitize_js_string(name)
        );
        let value = self.eval_on(handle, &js).await?;
        Ok(value.and_then(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }))
    }

    async fn click(&self, handle: HandleId) -> Result<()> {
        self.element(handle)?
            .click()
            .await
            .context("click failed")?;
        Ok(())
    }

    async fn scroll_into_view(&self, handle: HandleId) -> Result<()> {
        self.element(handle)?
            .scroll_into_view()
            .await
            .context("scroll into view failed")?;
        Ok(())
    }

    /// Poll `document.readyState` and the resource-timing entry count until
    /// both hold still for two consecutive samples. CDP has no single
    /// network-idle event, so stability of the resource log is used as the
    /// idle signal.
    async fn wait_for_network_idle(&self) -> Result<()> {
        const PROBE: &str = "({ state: document.readyState, resources: performance.getEntriesByType('resource').length })";

        let deadline = tokio::time::Instant::now() + IDLE_TIMEOUT;
        let mut last_resources: Option<u64> = None;
        let mut stable_samples = 0u32;

        while tokio::time::Instant::now() < deadline {
            let snapshot = self
                .page
                .evaluate(PROBE)
                .await
                .context("network idle probe failed")?;
            let value: serde_json::Value = snapshot
                .into_value()
                .map_err(|e| anyhow::anyhow!("failed to read idle probe result: {e:?}"))?;

            let complete = value.get("state").and_then(|v| v.as_str()) == Some("complete");
            let resources = value.get("resources").and_then(|v| v.as_u64()).unwrap_or(0);

            if complete && last_resources == Some(resources) {
                stable_samples += 1;
                if stable_samples >= 2 {
                    return Ok(());
                }
            } else {
                stable_samples = 0;
            }
            last_resources = Some(resources);

            tokio::time::sleep(IDLE_POLL).await;
        }

        debug!("network never settled within {IDLE_TIMEOUT:?}, continuing");
        Ok(())
    }
}

/// Whether a query error means the selector simply matched nothing (or was
/// not a valid selector), as opposed to the session or transport failing.
/// chromiumoxide reports a miss as a node-not-found error on the element
/// lookup; anything else must propagate and abort the run.
fn is_selector_miss(err: &CdpError) -> bool {
    message_is_selector_miss(&err.to_string())
}

fn message_is_selector_miss(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("could not find node")
        || msg.contains("could not find element")
        || msg.contains("dom error while querying")
}

/// Escape a string for safe injection into a JS string literal.
fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
