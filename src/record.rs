//! Persisted configuration records.
//!
//! Field names follow the nedb document layout written by the admin front
//! end (`_id`, camelCase attributes), so existing `selector.db` and
//! `action.db` files deserialize unchanged.

use serde::{Deserialize, Serialize};

/// A persisted DOM query plus an optional extraction rule.
///
/// Records link into a tree through `parent_id`; a record without one is a
/// root. `selector` is scoped to the nearest resolved ancestor and is absent
/// only for the page-root sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Key under which this node's result appears in the output tree.
    /// Must be unique among siblings.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Multi-match resolution: every matching element instead of the first.
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub text: bool,
    #[serde(default)]
    pub html: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr_text: Option<String>,
    /// Escape hatch: `return: false` suppresses extraction of this node.
    #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
    pub emit: Option<bool>,
}

impl SelectorRecord {
    /// The extraction attribute in effect, picked in fixed priority order:
    /// `text` > `html` > `splitText` > `attrText`.
    pub fn extract_rule(&self) -> ExtractRule {
        if self.text {
            ExtractRule::Text
        } else if self.html {
            ExtractRule::Html
        } else if let Some(delim) = &self.split_text {
            ExtractRule::SplitText(delim.clone())
        } else if let Some(attr) = &self.attr_text {
            ExtractRule::AttrText(attr.clone())
        } else {
            ExtractRule::None
        }
    }

    /// Whether extraction of this node is suppressed (`return: false`).
    pub fn suppressed(&self) -> bool {
        self.emit == Some(false)
    }
}

/// How to turn a resolved element into plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractRule {
    /// `textContent` of the element.
    Text,
    /// `innerHTML` of the element.
    Html,
    /// `textContent` split by the given delimiter.
    SplitText(String),
    /// Value of the named attribute.
    AttrText(String),
    /// No extraction attribute set; extracts `null`.
    None,
}

/// A persisted, ordered instruction to interact with or extract from a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// The selector subtree this action operates on.
    pub selector_id: String,
    /// Actions execute strictly in ascending `order`.
    pub order: i64,
    /// Action kind as stored; parsed via [`ActionKind::parse`] at dispatch
    /// time so unknown kinds can be reported with their original spelling.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_type: Option<String>,
    /// Convergence target selector for `scrollToAndWait`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_second: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Recognized action kinds. Anything else is an
/// [`UnsupportedAction`](crate::ScrapeError::UnsupportedAction) error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Extract a named group of nested results.
    Group,
    /// Extract data for the action's selector subtree.
    Scrap,
    /// Click every resolved element, waiting for network idle after each.
    Click,
    /// Scroll the resolved element into view.
    ScrollTo,
    /// Scroll repeatedly until a measured signal converges.
    ScrollToAndWait,
}

impl ActionKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "group" => Some(Self::Group),
            "scrap" => Some(Self::Scrap),
            "click" => Some(Self::Click),
            "scrollTo" => Some(Self::ScrollTo),
            "scrollToAndWait" => Some(Self::ScrollToAndWait),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_record_nedb_layout() {
        let doc = r#"{
            "_id": "s1",
            "parentId": "s0",
            "name": "title",
            "displayName": "Title",
            "selector": "h1.title",
            "array": true,
            "text": true,
            "splitText": ",",
            "return": false
        }"#;
        let record: SelectorRecord = serde_json::from_str(doc).unwrap();
        assert_eq!(record.id, "s1");
        assert_eq!(record.parent_id.as_deref(), Some("s0"));
        assert_eq!(record.selector.as_deref(), Some("h1.title"));
        assert!(record.array);
        assert!(record.suppressed());
    }

    #[test]
    fn test_selector_record_defaults() {
        let record: SelectorRecord = serde_json::from_str(r#"{"_id":"r","name":"root"}"#).unwrap();
        assert!(record.parent_id.is_none());
        assert!(record.selector.is_none());
        assert!(!record.array);
        assert!(!record.suppressed());
        assert_eq!(record.extract_rule(), ExtractRule::None);
    }

    #[test]
    fn test_extract_rule_priority() {
        let mut record: SelectorRecord =
            serde_json::from_str(r#"{"_id":"s","name":"n","text":true,"html":true}"#).unwrap();
        // text beats html
        assert_eq!(record.extract_rule(), ExtractRule::Text);

        record.text = false;
        assert_eq!(record.extract_rule(), ExtractRule::Html);

        record.html = false;
        record.split_text = Some("|".into());
        record.attr_text = Some("href".into());
        assert_eq!(record.extract_rule(), ExtractRule::SplitText("|".into()));

        record.split_text = None;
        assert_eq!(record.extract_rule(), ExtractRule::AttrText("href".into()));
    }

    #[test]
    fn test_action_record_nedb_layout() {
        let doc = r#"{
            "_id": "a1",
            "name": "loadReviews",
            "selectorId": "s9",
            "order": 2,
            "action": "scrollToAndWait",
            "timeoutType": "count",
            "objectId": "s10",
            "timeoutMs": 5000
        }"#;
        let action: ActionRecord = serde_json::from_str(doc).unwrap();
        assert_eq!(action.selector_id, "s9");
        assert_eq!(action.order, 2);
        assert_eq!(action.timeout_type.as_deref(), Some("count"));
        assert_eq!(action.object_id.as_deref(), Some("s10"));
        assert_eq!(action.timeout_ms, Some(5000));
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!(ActionKind::parse("group"), Some(ActionKind::Group));
        assert_eq!(ActionKind::parse("scrap"), Some(ActionKind::Scrap));
        assert_eq!(ActionKind::parse("click"), Some(ActionKind::Click));
        assert_eq!(ActionKind::parse("scrollTo"), Some(ActionKind::ScrollTo));
        assert_eq!(
            ActionKind::parse("scrollToAndWait"),
            Some(ActionKind::ScrollToAndWait)
        );
        assert_eq!(ActionKind::parse("hover"), None);
        // kinds are case-sensitive, matching the stored strings
        assert_eq!(ActionKind::parse("Scrap"), None);
    }
}
