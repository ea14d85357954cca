//! Selector tree construction.
//!
//! Turns the flat persisted record set into a rooted, ordered tree by
//! following `parent_id` links. Depth is unbounded; a repeated id anywhere
//! along the descent means the stored graph is cyclic and construction fails
//! fast with [`ScrapeError::CyclicSelectorGraph`].

use crate::error::ScrapeError;
use crate::record::SelectorRecord;
use crate::store::ConfigStore;
use std::collections::HashSet;

/// A selector record with its resolved children, in stored sibling order.
#[derive(Debug, Clone)]
pub struct SelectorNode {
    pub record: SelectorRecord,
    /// Empty for leaves.
    pub children: Vec<SelectorNode>,
}

/// Collect every descendant record of `root_id` by repeated parent-id
/// lookup. An unknown `root_id` yields an empty set, not an error.
pub async fn collect_subtree(
    store: &dyn ConfigStore,
    root_id: &str,
) -> Result<Vec<SelectorRecord>, ScrapeError> {
    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(root_id.to_string());

    let mut frontier = vec![root_id.to_string()];
    while let Some(parent) = frontier.pop() {
        let children = store
            .selectors_by_parent(Some(&parent))
            .await
            .map_err(ScrapeError::store)?;
        for child in children {
            if !seen.insert(child.id.clone()) {
                return Err(ScrapeError::CyclicSelectorGraph(child.id));
            }
            frontier.push(child.id.clone());
            records.push(child);
        }
    }
    Ok(records)
}

/// Group a flat record set into trees rooted at the records whose
/// `parent_id` equals `root_parent`, preserving sibling order.
pub fn build_tree(
    records: &[SelectorRecord],
    root_parent: Option<&str>,
) -> Result<Vec<SelectorNode>, ScrapeError> {
    let mut path = Vec::new();
    build_level(records, root_parent, &mut path)
}

fn build_level(
    records: &[SelectorRecord],
    parent: Option<&str>,
    path: &mut Vec<String>,
) -> Result<Vec<SelectorNode>, ScrapeError> {
    let mut nodes = Vec::new();
    for record in records.iter().filter(|r| r.parent_id.as_deref() == parent) {
        if path.iter().any(|id| id == &record.id) {
            return Err(ScrapeError::CyclicSelectorGraph(record.id.clone()));
        }
        path.push(record.id.clone());
        let children = build_level(records, Some(&record.id), path)?;
        path.pop();
        nodes.push(SelectorNode {
            record: record.clone(),
            children,
        });
    }
    Ok(nodes)
}

/// The ordered tree an action operates on: every descendant of the action's
/// `selector_id`, grouped under it.
pub async fn subtree_for(
    store: &dyn ConfigStore,
    selector_id: &str,
) -> Result<Vec<SelectorNode>, ScrapeError> {
    let records = collect_subtree(store, selector_id).await?;
    build_tree(&records, Some(selector_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn record(id: &str, parent: Option<&str>, name: &str) -> SelectorRecord {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "parentId": parent,
            "name": name,
            "selector": format!(".{name}"),
        }))
        .unwrap()
    }

    #[test]
    fn test_forest_grouping_preserves_sibling_order() {
        let records = vec![
            record("a", None, "first"),
            record("a1", Some("a"), "first-child"),
            record("b", None, "second"),
            record("a2", Some("a"), "second-child"),
            record("a1x", Some("a1"), "grandchild"),
        ];
        let roots = build_tree(&records, None).unwrap();

        let names: Vec<&str> = roots.iter().map(|n| n.record.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);

        let a = &roots[0];
        let child_names: Vec<&str> = a.children.iter().map(|n| n.record.name.as_str()).collect();
        assert_eq!(child_names, ["first-child", "second-child"]);
        assert_eq!(a.children[0].children[0].record.name, "grandchild");

        assert!(roots[1].children.is_empty());
    }

    #[test]
    fn test_dangling_parent_is_just_ignored() {
        let records = vec![record("x", Some("ghost"), "orphan")];
        assert!(build_tree(&records, None).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_fails_fast() {
        let records = vec![
            record("a", Some("b"), "a"),
            record("b", Some("a"), "b"),
        ];
        let err = build_tree(&records, Some("a")).unwrap_err();
        assert!(matches!(err, ScrapeError::CyclicSelectorGraph(_)));
    }

    #[test]
    fn test_self_parent_fails_fast() {
        let records = vec![record("a", Some("a"), "loop")];
        let err = build_tree(&records, Some("a")).unwrap_err();
        assert!(matches!(err, ScrapeError::CyclicSelectorGraph(id) if id == "a"));
    }

    #[tokio::test]
    async fn test_collect_subtree_descends_past_two_levels() {
        let store = MemoryStore::new(
            vec![
                record("root", None, "root"),
                record("l1", Some("root"), "one"),
                record("l2", Some("l1"), "two"),
                record("l3", Some("l2"), "three"),
                record("l4", Some("l3"), "four"),
            ],
            Vec::new(),
        );
        let records = collect_subtree(&store, "root").await.unwrap();
        assert_eq!(records.len(), 4);

        let tree = subtree_for(&store, "root").await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree[0].children[0].children[0].children[0].record.name,
            "four"
        );
    }

    #[tokio::test]
    async fn test_collect_subtree_unknown_root_is_empty() {
        let store = MemoryStore::new(vec![record("a", None, "a")], Vec::new());
        assert!(collect_subtree(&store, "missing").await.unwrap().is_empty());
        assert!(subtree_for(&store, "missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_subtree_cycle_fails_fast() {
        let store = MemoryStore::new(
            vec![record("a", Some("b"), "a"), record("b", Some("a"), "b")],
            Vec::new(),
        );
        let err = collect_subtree(&store, "a").await.unwrap_err();
        assert!(matches!(err, ScrapeError::CyclicSelectorGraph(_)));
    }
}
