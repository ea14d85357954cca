//! Static-HTML page driver for tests and dry runs.
//!
//! Parses a fixed HTML document with `scraper` and serves real CSS queries
//! against it, so selector configuration can be exercised without a browser.
//! A handle is the element's position in the parse tree's node order, which
//! is stable across re-parses of identical markup. Scrolling can advance the
//! document through a queue of snapshots to simulate content loading in;
//! handles into parts of the document that a snapshot replaced go stale, just
//! like element handles on a real page.

use super::{HandleId, PageDriver, Scope};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::warn;

/// In-memory page over fixed markup.
#[derive(Debug, Default)]
pub struct FixtureDriver {
    html: Mutex<String>,
    scroll_feed: Mutex<VecDeque<String>>,
    clicks: Mutex<Vec<HandleId>>,
    scrolls: AtomicUsize,
}

impl FixtureDriver {
    pub fn new(html: &str) -> Self {
        Self {
            html: Mutex::new(html.to_string()),
            ..Self::default()
        }
    }

    /// Replace the document, as a navigation or DOM swap would.
    pub fn set_html(&self, html: &str) {
        *self.html.lock().unwrap() = html.to_string();
    }

    /// Queue a document snapshot to be applied by the next scroll.
    pub fn push_scroll_state(&self, html: &str) {
        self.scroll_feed
            .lock()
            .unwrap()
            .push_back(html.to_string());
    }

    /// Handles clicked so far, in click order.
    pub fn clicks(&self) -> Vec<HandleId> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::Relaxed)
    }

    fn with_doc<T>(&self, f: impl FnOnce(&Html) -> T) -> T {
        let doc = Html::parse_document(&self.html.lock().unwrap());
        f(&doc)
    }
}

/// Position of an element in the tree's node order.
fn node_index(doc: &Html, element: ElementRef<'_>) -> Option<u64> {
    doc.tree
        .nodes()
        .position(|n| n.id() == element.id())
        .map(|i| i as u64)
}

fn element_at(doc: &Html, handle: HandleId) -> Option<ElementRef<'_>> {
    doc.tree
        .nodes()
        .nth(handle.0 as usize)
        .and_then(ElementRef::wrap)
}

/// Elements matching `css` under `scope`, in DOM order. A stale scope or an
/// unparsable selector yields no matches.
fn select<'a>(doc: &'a Html, scope: Scope, css: &str) -> Vec<ElementRef<'a>> {
    let selector = match Selector::parse(css) {
        Ok(s) => s,
        Err(e) => {
            warn!(selector = css, "unparsable CSS selector: {e}");
            return Vec::new();
        }
    };
    let root = match scope {
        Scope::Page => Some(doc.root_element()),
        Scope::Node(h) => element_at(doc, h),
    };
    match root {
        Some(root) => root.select(&selector).collect(),
        None => Vec::new(),
    }
}

#[async_trait]
impl PageDriver for FixtureDriver {
    async fn navigate(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn query(&self, scope: Scope, css: &str) -> Result<Option<HandleId>> {
        Ok(self.with_doc(|doc| {
            select(doc, scope, css)
                .into_iter()
                .next()
                .and_then(|el| node_index(doc, el))
                .map(HandleId)
        }))
    }

    async fn query_all(&self, scope: Scope, css: &str) -> Result<Vec<HandleId>> {
        Ok(self.with_doc(|doc| {
            select(doc, scope, css)
                .into_iter()
                .filter_map(|el| node_index(doc, el))
                .map(HandleId)
                .collect()
        }))
    }

    async fn text_content(&self, handle: HandleId) -> Result<String> {
        self.with_doc(|doc| {
            element_at(doc, handle)
                .map(|el| el.text().collect::<String>())
                .ok_or_else(|| anyhow!("stale element handle {}", handle.0))
        })
    }

    async fn inner_html(&self, handle: HandleId) -> Result<String> {
        self.with_doc(|doc| {
            element_at(doc, handle)
                .map(|el| el.inner_html())
                .ok_or_else(|| anyhow!("stale element handle {}", handle.0))
        })
    }

    async fn attribute(&self, handle: HandleId, name: &str) -> Result<Option<String>> {
        self.with_doc(|doc| {
            element_at(doc, handle)
                .map(|el| el.value().attr(name).map(str::to_string))
                .ok_or_else(|| anyhow!("stale element handle {}", handle.0))
        })
    }

    async fn click(&self, handle: HandleId) -> Result<()> {
        self.with_doc(|doc| {
            element_at(doc, handle)
                .map(|_| ())
                .ok_or_else(|| anyhow!("stale element handle {}", handle.0))
        })?;
        self.clicks.lock().unwrap().push(handle);
        Ok(())
    }

    async fn scroll_into_view(&self, handle: HandleId) -> Result<()> {
        self.with_doc(|doc| {
            element_at(doc, handle)
                .map(|_| ())
                .ok_or_else(|| anyhow!("stale element handle {}", handle.0))
        })?;
        self.scrolls.fetch_add(1, Ordering::Relaxed);
        if let Some(next) = self.scroll_feed.lock().unwrap().pop_front() {
            *self.html.lock().unwrap() = next;
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        Ok(())
    }
}
