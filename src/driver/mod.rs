//! Browser collaborator abstraction.
//!
//! `PageDriver` is the narrow surface the engines need from a browser over
//! one live page: scoped DOM queries, per-element evaluation, interaction
//! primitives, and a network-idle wait. Handles are opaque ids registered by
//! the driver; they are valid only until the page's DOM is replaced and are
//! never shared across actions.

pub mod chromium;
pub mod fixture;

use anyhow::Result;
use async_trait::async_trait;

/// Opaque reference to a live DOM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// Query scope: the whole document, or a previously resolved element.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    Page,
    Node(HandleId),
}

/// One live browser page the engines can query and act on.
///
/// Query misses are `None`/empty, never errors. Evaluation and interaction
/// primitives fail hard (element detached, page gone) and propagate.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the initial load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// First element matching `css` under `scope`, if any.
    async fn query(&self, scope: Scope, css: &str) -> Result<Option<HandleId>>;

    /// Every element matching `css` under `scope`, in DOM order.
    async fn query_all(&self, scope: Scope, css: &str) -> Result<Vec<HandleId>>;

    /// `textContent` of the element.
    async fn text_content(&self, handle: HandleId) -> Result<String>;

    /// `innerHTML` of the element.
    async fn inner_html(&self, handle: HandleId) -> Result<String>;

    /// Value of the named attribute, `None` when absent.
    async fn attribute(&self, handle: HandleId, name: &str) -> Result<Option<String>>;

    /// Click the element.
    async fn click(&self, handle: HandleId) -> Result<()>;

    /// Scroll the element into view.
    async fn scroll_into_view(&self, handle: HandleId) -> Result<()>;

    /// Block until the page reports no pending network activity.
    async fn wait_for_network_idle(&self) -> Result<()>;
}
