use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag used by the synthetic node that stands in for omitted children
pub const OMITTED_MARKER_TAG: &str = "...";

/// Layout of a node relative to the viewport, rounded to whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub top: i64,
    pub left: i64,
    pub width: i64,
    pub height: i64,
    /// Entirely inside the viewport
    pub visible: bool,
}

/// Bounded snapshot of one element and its kept descendants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredNode {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Only set on the omitted-children marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omitted: Option<usize>,
    #[serde(default)]
    pub children: Vec<StructuredNode>,
}

impl StructuredNode {
    /// Create a node with only its tag set
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// The sentinel appended when a node has more children than its cap
    pub fn omitted_marker(count: usize) -> Self {
        Self {
            tag: OMITTED_MARKER_TAG.to_string(),
            text: format!("({} more elements omitted)", count),
            omitted: Some(count),
            ..Self::default()
        }
    }

    pub fn is_omitted_marker(&self) -> bool {
        self.omitted.is_some()
    }

    /// Depth of the deepest descendant, 0 for a leaf
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order iterator over this node and all descendants
    pub fn iter(&self) -> impl Iterator<Item = &StructuredNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub alt: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub text: String,
    pub href: String,
}

/// Heuristic summary of a page's main content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub main_content: String,
    pub headings: Vec<Heading>,
    pub images: Vec<ImageRef>,
    pub links: Vec<LinkRef>,
    pub meta_description: String,
    pub meta_keywords: String,
    pub full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
}

/// Everything captured from one page for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub summary: PageSummary,
    pub dom_tree: Option<StructuredNode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_serialization_skips_absent_fields() {
        let mut node = StructuredNode::new("input");
        node.kind = Some("text".to_string());
        node.aria_label = Some("Search".to_string());
        node.data_attributes
            .insert("data-test".to_string(), "q".to_string());

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "tag": "input",
                "type": "text",
                "ariaLabel": "Search",
                "text": "",
                "dataAttributes": {"data-test": "q"},
                "children": []
            })
        );
    }

    #[test]
    fn test_omitted_marker() {
        let marker = StructuredNode::omitted_marker(7);
        assert_eq!(marker.tag, "...");
        assert_eq!(marker.omitted, Some(7));
        assert!(marker.text.contains('7'));
        assert!(marker.is_omitted_marker());
    }

    #[test]
    fn test_depth_and_iter() {
        let mut root = StructuredNode::new("body");
        let mut div = StructuredNode::new("div");
        div.children.push(StructuredNode::new("span"));
        root.children.push(div);
        root.children.push(StructuredNode::new("p"));

        assert_eq!(root.depth(), 2);
        let tags: Vec<&str> = root.iter().map(|node| node.tag.as_str()).collect();
        assert_eq!(tags, vec!["body", "div", "span", "p"]);
    }

    #[test]
    fn test_snapshot_flattens_summary() {
        let snapshot = PageSnapshot {
            title: "T".to_string(),
            url: "https://example.com/".to_string(),
            summary: PageSummary {
                main_content: "main".to_string(),
                ..PageSummary::default()
            },
            dom_tree: None,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["mainContent"], "main");
        assert_eq!(value["metaKeywords"], "");
        assert!(value["domTree"].is_null());
        assert!(value.get("author").is_none());
    }
}
