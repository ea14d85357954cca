//! In-memory store, loadable from nedb-style datastore files.
//!
//! nedb persists one JSON document per line. `MemoryStore::load` reads that
//! format directly so the `selector.db` / `action.db` files produced by the
//! admin front end work as-is.

use super::ConfigStore;
use crate::record::{ActionRecord, SelectorRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Whole configuration held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    selectors: Vec<SelectorRecord>,
    actions: Vec<ActionRecord>,
}

impl MemoryStore {
    pub fn new(selectors: Vec<SelectorRecord>, actions: Vec<ActionRecord>) -> Self {
        Self { selectors, actions }
    }

    /// Load selector and action datastores from disk.
    pub fn load(selector_path: &Path, action_path: &Path) -> Result<Self> {
        Ok(Self {
            selectors: read_jsonl(selector_path)?,
            actions: read_jsonl(action_path)?,
        })
    }
}

/// Parse a newline-delimited JSON file, skipping blank lines.
fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading datastore {}", path.display()))?;
    let mut docs = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let doc = serde_json::from_str(line)
            .with_context(|| format!("bad document at {}:{}", path.display(), idx + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn selector_by_id(&self, id: &str) -> Result<Option<SelectorRecord>> {
        Ok(self.selectors.iter().find(|s| s.id == id).cloned())
    }

    async fn selectors_by_parent(&self, parent_id: Option<&str>) -> Result<Vec<SelectorRecord>> {
        Ok(self
            .selectors
            .iter()
            .filter(|s| s.parent_id.as_deref() == parent_id)
            .cloned()
            .collect())
    }

    async fn actions_ordered(&self) -> Result<Vec<ActionRecord>> {
        let mut actions = self.actions.clone();
        actions.sort_by_key(|a| a.order);
        Ok(actions)
    }
}
