//! Document-to-snapshot extraction.
//!
//! [`Extractor`] turns an element subtree into a bounded [`StructuredNode`] tree and
//! [`summary::Summarizer`] picks out main content, headings, images and links. Both are
//! synchronous and bounded by depth and breadth caps.

pub mod summary;
pub mod text;

#[cfg(test)]
mod tests;

use crate::dom::{Document, Element, Viewport};
use crate::filter::{ImportanceConfig, NodeFilter};
use crate::results::{PageSnapshot, Position, StructuredNode};
use serde::{Deserialize, Serialize};
use text::TextLimits;

pub use summary::{SiteRule, Summarizer, SummaryConfig};

/// Attributes copied onto the node verbatim when present
const SEMANTIC_ATTRIBUTES: &[&str] = &["role", "aria-label", "title", "name"];

/// Depth and breadth limits for extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Deepest depth that still produces a node (root is 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Nodes at this depth or shallower record their position
    #[serde(default = "default_position_depth")]
    pub position_depth: usize,

    /// Depths below this are never pruned for visibility
    #[serde(default = "default_visibility_exempt_depth")]
    pub visibility_exempt_depth: usize,

    /// Child budget for ordinary nodes
    #[serde(default = "default_max_children")]
    pub max_children: usize,

    /// Child budget for important containers
    #[serde(default = "default_max_important_children")]
    pub max_important_children: usize,

    /// Bound on each node's text, ellipsis included
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
}

fn default_max_depth() -> usize {
    8
}

fn default_position_depth() -> usize {
    5
}

fn default_visibility_exempt_depth() -> usize {
    2
}

fn default_max_children() -> usize {
    50
}

fn default_max_important_children() -> usize {
    100
}

fn default_max_text_len() -> usize {
    500
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            position_depth: default_position_depth(),
            visibility_exempt_depth: default_visibility_exempt_depth(),
            max_children: default_max_children(),
            max_important_children: default_max_important_children(),
            max_text_len: default_max_text_len(),
        }
    }
}

/// Maps an element subtree to a bounded [`StructuredNode`] tree
#[derive(Debug, Clone)]
pub struct Extractor {
    options: ExtractOptions,
    filter: NodeFilter,
    limits: TextLimits,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default(), ImportanceConfig::default())
    }
}

impl Extractor {
    pub fn new(options: ExtractOptions, importance: ImportanceConfig) -> Self {
        let filter = NodeFilter::new(importance, options.visibility_exempt_depth);
        let limits = TextLimits {
            max_len: options.max_text_len,
            fallback_len: options.max_text_len,
        };
        Self {
            options,
            filter,
            limits,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract `root` as depth 0. Returns `None` for a missing root.
    pub fn extract<E: Element>(&self, root: Option<&E>, viewport: &Viewport) -> Option<StructuredNode> {
        self.extract_at(root?, 0, viewport)
    }

    /// Extract the document body
    pub fn extract_document<D: Document>(&self, doc: &D) -> Option<StructuredNode> {
        let viewport = doc.viewport();
        let body = doc.body();
        self.extract(body.as_ref(), &viewport)
    }

    fn extract_at<E: Element>(
        &self,
        element: &E,
        depth: usize,
        viewport: &Viewport,
    ) -> Option<StructuredNode> {
        if depth > self.options.max_depth {
            return None;
        }

        let important = self.filter.is_important(element);
        if self.filter.should_prune(element, depth, important) {
            return None;
        }

        let tag = element.tag_name();
        let mut node = StructuredNode::new(tag.clone());
        node.id = element.attr("id").filter(|id| !id.is_empty());
        node.class_name = element.attr("class").filter(|class| !class.is_empty());
        node.kind = element.attr("type");
        node.text = text::element_text(element, &tag, &self.limits);

        for (name, value) in element.attributes() {
            if name.starts_with("data-") {
                node.data_attributes.insert(name.clone(), value.clone());
            }
            if SEMANTIC_ATTRIBUTES.contains(&name.as_str()) {
                match name.as_str() {
                    "role" => node.role = Some(value),
                    "aria-label" => node.aria_label = Some(value),
                    "title" => node.title = Some(value),
                    _ => node.name = Some(value),
                }
            }
        }

        match tag.as_str() {
            "input" | "textarea" | "select" => {
                node.value = Some(element.form_value().unwrap_or_default());
                node.placeholder = element.attr("placeholder").filter(|p| !p.is_empty());
            }
            "a" => {
                node.href = element.resolved_url("href");
                node.target = element.attr("target").filter(|t| !t.is_empty());
            }
            "img" => {
                node.src = element.resolved_url("src");
                node.alt = element.attr("alt");
            }
            _ => {}
        }

        if depth <= self.options.position_depth {
            node.position = element
                .bounding_rect()
                .filter(|rect| rect.has_area())
                .map(|rect| Position {
                    top: rect.top.round() as i64,
                    left: rect.left.round() as i64,
                    width: rect.width.round() as i64,
                    height: rect.height.round() as i64,
                    visible: viewport.contains(&rect),
                });
        }

        let cap = if important {
            self.options.max_important_children
        } else {
            self.options.max_children
        };

        let children = element.children();
        for child in &children {
            if node.children.len() >= cap {
                break;
            }
            if let Some(child_node) = self.extract_at(child, depth + 1, viewport) {
                node.children.push(child_node);
            }
        }

        let total = element.child_element_count();
        if total > cap {
            node.children.push(StructuredNode::omitted_marker(total - cap));
        }

        Some(node)
    }
}

impl PageSnapshot {
    /// Run the extractor and summarizer over one document
    pub fn capture<D: Document>(doc: &D, extractor: &Extractor, summarizer: &Summarizer) -> Self {
        let summary = summarizer.summarize(doc);
        let dom_tree = extractor.extract_document(doc);

        ::log::debug!(
            "Captured snapshot of {} ({} headings, {} links, tree depth {})",
            doc.url(),
            summary.headings.len(),
            summary.links.len(),
            dom_tree.as_ref().map(StructuredNode::depth).unwrap_or(0)
        );

        Self {
            title: doc.title(),
            url: doc.url(),
            summary,
            dom_tree,
        }
    }
}
