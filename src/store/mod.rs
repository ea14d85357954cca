//! Configuration store — selector and action document lookup.
//!
//! The runtime consumes the persisted configuration strictly as a read-only
//! document store: find a selector by id, find selectors by parent id, list
//! actions by ascending order. Persistence mechanics live behind this trait.

pub mod memory;

use crate::record::{ActionRecord, SelectorRecord};
use anyhow::Result;
use async_trait::async_trait;

/// Read-only lookup over the persisted scraping configuration.
///
/// Lookup misses yield `None` or an empty vec, never errors; `Err` is
/// reserved for the backing store itself failing.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The selector record with the given id, if any.
    async fn selector_by_id(&self, id: &str) -> Result<Option<SelectorRecord>>;

    /// Direct children of `parent_id`, in stored order. `None` selects the
    /// root records (those without a parent).
    async fn selectors_by_parent(&self, parent_id: Option<&str>) -> Result<Vec<SelectorRecord>>;

    /// Every action record, sorted by ascending `order`.
    async fn actions_ordered(&self) -> Result<Vec<ActionRecord>>;
}
