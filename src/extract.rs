//! Extraction — turn a resolved handle tree into plain data.
//!
//! A pure function of the current DOM state at call time: no caching, no
//! memoization. The output shape mirrors the selector tree.

use crate::driver::{HandleId, PageDriver};
use crate::error::ScrapeError;
use crate::record::ExtractRule;
use crate::resolve::{HandleMap, HandleNode, Handles};
use async_recursion::async_recursion;
use serde::Serialize;
use std::collections::BTreeMap;

/// Extracted data: a scalar, an ordered sequence, or a nested mapping.
///
/// Serialized untagged so the JSON output matches the plain objects the
/// admin front end displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Recursively extract every node of a resolved branch.
#[async_recursion]
pub async fn extract_tree(
    driver: &dyn PageDriver,
    map: &HandleMap,
) -> Result<BTreeMap<String, Value>, ScrapeError> {
    let mut out = BTreeMap::new();
    for (name, node) in map {
        out.insert(name.clone(), extract_node(driver, node).await?);
    }
    Ok(out)
}

#[async_recursion]
async fn extract_node(driver: &dyn PageDriver, node: &HandleNode) -> Result<Value, ScrapeError> {
    match node {
        HandleNode::Branches(branches) => {
            let mut items = Vec::with_capacity(branches.len());
            for branch in branches {
                items.push(Value::Map(extract_tree(driver, branch).await?));
            }
            Ok(Value::List(items))
        }
        HandleNode::Nested(map) => Ok(Value::Map(extract_tree(driver, map).await?)),
        HandleNode::Leaf { suppressed: true, .. } => Ok(Value::Null),
        HandleNode::Leaf { handles, rule, .. } => match handles {
            Handles::One(None) => Ok(Value::Null),
            Handles::One(Some(handle)) => extract_handle(driver, *handle, rule).await,
            Handles::Many(list) => {
                let mut items = Vec::with_capacity(list.len());
                for handle in list {
                    items.push(extract_handle(driver, *handle, rule).await?);
                }
                Ok(Value::List(items))
            }
        },
    }
}

/// Apply one extraction rule to one element.
pub(crate) async fn extract_handle(
    driver: &dyn PageDriver,
    handle: HandleId,
    rule: &ExtractRule,
) -> Result<Value, ScrapeError> {
    let value = match rule {
        ExtractRule::Text => Value::Text(
            driver
                .text_content(handle)
                .await
                .map_err(ScrapeError::driver)?,
        ),
        ExtractRule::Html => Value::Text(
            driver
                .inner_html(handle)
                .await
                .map_err(ScrapeError::driver)?,
        ),
        ExtractRule::SplitText(delim) => {
            let text = driver
                .text_content(handle)
                .await
                .map_err(ScrapeError::driver)?;
            // An empty delimiter splits into characters, as String.split does.
            let parts: Vec<Value> = if delim.is_empty() {
                text.chars().map(|c| Value::Text(c.to_string())).collect()
            } else {
                text.split(delim.as_str())
                    .map(|part| Value::Text(part.to_string()))
                    .collect()
            };
            Value::List(parts)
        }
        ExtractRule::AttrText(attr) => driver
            .attribute(handle, attr)
            .await
            .map_err(ScrapeError::driver)?
            .map(Value::Text)
            .unwrap_or(Value::Null),
        ExtractRule::None => Value::Null,
    };
    Ok(value)
}
