use crate::dom::Element;
use serde::{Deserialize, Serialize};

/// Configuration for classifying "important containers".
///
/// Important containers keep hidden content and get a larger child budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceConfig {
    /// Landmark/sectioning tags that are always important
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    /// Exact `id` values that mark an important container
    #[serde(default = "default_ids")]
    pub ids: Vec<String>,

    /// Substrings of the `class` attribute that mark an important container
    #[serde(default = "default_class_keywords")]
    pub class_keywords: Vec<String>,
}

fn default_tags() -> Vec<String> {
    vec!["main".to_string(), "article".to_string(), "section".to_string()]
}

fn default_ids() -> Vec<String> {
    vec!["main".to_string(), "content".to_string()]
}

fn default_class_keywords() -> Vec<String> {
    vec![
        "main".to_string(),
        "content".to_string(),
        "repository".to_string(),
        "repo".to_string(),
    ]
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            tags: default_tags(),
            ids: default_ids(),
            class_keywords: default_class_keywords(),
        }
    }
}

/// Decides which elements the extractor keeps
#[derive(Debug, Clone)]
pub struct NodeFilter {
    config: ImportanceConfig,
    /// Depths below this are never pruned for visibility
    exempt_depth: usize,
}

impl Default for NodeFilter {
    fn default() -> Self {
        Self::new(ImportanceConfig::default(), 2)
    }
}

impl NodeFilter {
    /// Create a new filter from configuration
    pub fn new(config: ImportanceConfig, exempt_depth: usize) -> Self {
        // Tags compare lowercase; the extractor lowercases element names
        let config = ImportanceConfig {
            tags: config.tags.iter().map(|tag| tag.to_ascii_lowercase()).collect(),
            ..config
        };
        Self {
            config,
            exempt_depth,
        }
    }

    /// Whether the element is a landmark or named like a main content container
    pub fn is_important<E: Element>(&self, element: &E) -> bool {
        let tag = element.tag_name();
        if self.config.tags.iter().any(|candidate| *candidate == tag) {
            return true;
        }

        if let Some(id) = element.attr("id") {
            if self.config.ids.iter().any(|candidate| *candidate == id) {
                return true;
            }
        }

        if let Some(class_name) = element.attr("class") {
            return self
                .config
                .class_keywords
                .iter()
                .any(|keyword| class_name.contains(keyword.as_str()));
        }

        false
    }

    /// Whether the element at `depth` is pruned from the snapshot
    pub fn should_prune<E: Element>(&self, element: &E, depth: usize, important: bool) -> bool {
        if depth < self.exempt_depth || important {
            return false;
        }
        element.computed_style().is_hidden()
    }
}
