//! Handle resolution — walk a selector tree against the live page.
//!
//! Produces a tree of live element handles parallel to the selector tree.
//! Resolution of a parent strictly precedes its children, because each
//! child's query scope is the parent's resolved handle. An array-resolved
//! node with children fans out: every matched element gets its own resolved
//! branch. Misses are empty branches, never errors.

use crate::driver::{HandleId, PageDriver, Scope};
use crate::error::ScrapeError;
use crate::record::ExtractRule;
use crate::tree::SelectorNode;
use async_recursion::async_recursion;
use std::collections::BTreeMap;

/// Resolved branch, keyed by selector `name`.
pub type HandleMap = BTreeMap<String, HandleNode>;

/// The element set a single node resolved to.
#[derive(Debug, Clone)]
pub enum Handles {
    /// Single-match query; `None` when the selector matched nothing.
    One(Option<HandleId>),
    /// Multi-match query, in DOM order.
    Many(Vec<HandleId>),
}

/// One node of the resolved tree.
#[derive(Debug, Clone)]
pub enum HandleNode {
    /// Leaf: the raw handle(s) plus the node's extraction rule.
    Leaf {
        handles: Handles,
        rule: ExtractRule,
        suppressed: bool,
    },
    /// Single-resolved node with children, resolved once against its handle.
    Nested(HandleMap),
    /// Array-resolved node with children: one branch per matched element.
    Branches(Vec<HandleMap>),
}

/// Resolve a sequence of sibling selector trees against `scope`.
#[async_recursion]
pub async fn resolve_tree(
    driver: &dyn PageDriver,
    nodes: &[SelectorNode],
    scope: Scope,
) -> Result<HandleMap, ScrapeError> {
    let mut map = HandleMap::new();
    for node in nodes {
        let resolved = resolve_node(driver, node, scope).await?;
        map.insert(node.record.name.clone(), resolved);
    }
    Ok(map)
}

#[async_recursion]
async fn resolve_node(
    driver: &dyn PageDriver,
    node: &SelectorNode,
    scope: Scope,
) -> Result<HandleNode, ScrapeError> {
    let record = &node.record;

    let Some(css) = record.selector.as_deref() else {
        // Page-root sentinel: the scope itself is the resolved handle.
        if node.children.is_empty() {
            let handle = match scope {
                Scope::Page => None,
                Scope::Node(h) => Some(h),
            };
            return Ok(leaf(node, Handles::One(handle)));
        }
        return Ok(HandleNode::Nested(
            resolve_tree(driver, &node.children, scope).await?,
        ));
    };

    if record.array {
        let matches = driver
            .query_all(scope, css)
            .await
            .map_err(ScrapeError::driver)?;
        if node.children.is_empty() {
            return Ok(leaf(node, Handles::Many(matches)));
        }
        // Fan-out: each matched element scopes its own branch.
        let mut branches = Vec::with_capacity(matches.len());
        for handle in matches {
            branches.push(resolve_tree(driver, &node.children, Scope::Node(handle)).await?);
        }
        Ok(HandleNode::Branches(branches))
    } else {
        let matched = driver.query(scope, css).await.map_err(ScrapeError::driver)?;
        if node.children.is_empty() {
            return Ok(leaf(node, Handles::One(matched)));
        }
        match matched {
            Some(handle) => Ok(HandleNode::Nested(
                resolve_tree(driver, &node.children, Scope::Node(handle)).await?,
            )),
            // Parent missed: its whole branch is empty.
            None => Ok(HandleNode::Nested(HandleMap::new())),
        }
    }
}

fn leaf(node: &SelectorNode, handles: Handles) -> HandleNode {
    HandleNode::Leaf {
        handles,
        rule: node.record.extract_rule(),
        suppressed: node.record.suppressed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fixture::FixtureDriver;
    use crate::tree::build_tree;

    const DOC: &str = r#"<html><body>
        <div class="review"><span class="author">ann</span><span class="stars">5</span></div>
        <div class="review"><span class="author">bob</span><span class="stars">4</span></div>
        <div class="review"><span class="author">cyd</span><span class="stars">3</span></div>
        <h1 class="title">Gadget</h1>
    </body></html>"#;

    fn records(json: serde_json::Value) -> Vec<crate::record::SelectorRecord> {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_array_fan_out() {
        let driver = FixtureDriver::new(DOC);
        let tree = build_tree(
            &records(serde_json::json!([
                {"_id":"r","name":"reviews","selector":".review","array":true},
                {"_id":"a","parentId":"r","name":"author","selector":".author","text":true},
                {"_id":"s","parentId":"r","name":"stars","selector":".stars","text":true},
            ])),
            None,
        )
        .unwrap();

        let map = resolve_tree(&driver, &tree, Scope::Page).await.unwrap();
        let HandleNode::Branches(branches) = &map["reviews"] else {
            panic!("expected one branch per matched review");
        };
        assert_eq!(branches.len(), 3);
        for branch in branches {
            assert!(matches!(branch["author"], HandleNode::Leaf { .. }));
            assert!(matches!(branch["stars"], HandleNode::Leaf { .. }));
        }
    }

    #[tokio::test]
    async fn test_single_match_leaf_and_miss() {
        let driver = FixtureDriver::new(DOC);
        let tree = build_tree(
            &records(serde_json::json!([
                {"_id":"t","name":"title","selector":".title","text":true},
                {"_id":"m","name":"missing","selector":".absent","text":true},
            ])),
            None,
        )
        .unwrap();

        let map = resolve_tree(&driver, &tree, Scope::Page).await.unwrap();
        assert!(matches!(
            map["title"],
            HandleNode::Leaf { handles: Handles::One(Some(_)), .. }
        ));
        assert!(matches!(
            map["missing"],
            HandleNode::Leaf { handles: Handles::One(None), .. }
        ));
    }

    #[tokio::test]
    async fn test_missed_parent_yields_empty_branch() {
        let driver = FixtureDriver::new(DOC);
        let tree = build_tree(
            &records(serde_json::json!([
                {"_id":"p","name":"panel","selector":".absent"},
                {"_id":"c","parentId":"p","name":"inner","selector":"span","text":true},
            ])),
            None,
        )
        .unwrap();

        let map = resolve_tree(&driver, &tree, Scope::Page).await.unwrap();
        let HandleNode::Nested(branch) = &map["panel"] else {
            panic!("expected nested node");
        };
        assert!(branch.is_empty());
    }

    #[tokio::test]
    async fn test_root_sentinel_resolves_children_against_scope() {
        let driver = FixtureDriver::new(DOC);
        let tree = build_tree(
            &records(serde_json::json!([
                {"_id":"root","name":"page"},
                {"_id":"t","parentId":"root","name":"title","selector":".title","text":true},
            ])),
            None,
        )
        .unwrap();

        let map = resolve_tree(&driver, &tree, Scope::Page).await.unwrap();
        let HandleNode::Nested(branch) = &map["page"] else {
            panic!("expected nested node for the sentinel");
        };
        assert!(matches!(
            branch["title"],
            HandleNode::Leaf { handles: Handles::One(Some(_)), .. }
        ));
    }
}
