//! Read-only views over a rendered document.
//!
//! The extractor and summarizer only ever see a page through these two traits. A live
//! browser page is represented by [`raw::RawPage`], the facts the page probe reports, and
//! an offline HTML file by [`html::StaticDocument`].

pub mod html;
pub mod raw;

use serde::{Deserialize, Serialize};

pub use html::{StaticDocument, StaticElement};
pub use raw::{ProbeQuery, ProbeRequest, RawElement, RawPage};

/// The subset of computed style that decides whether an element renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_opacity")]
    pub opacity: String,
}

fn default_display() -> String {
    "block".to_string()
}

fn default_visibility() -> String {
    "visible".to_string()
}

fn default_opacity() -> String {
    "1".to_string()
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: default_display(),
            visibility: default_visibility(),
            opacity: default_opacity(),
        }
    }
}

impl ComputedStyle {
    /// True when the element is not displayed, invisible or fully transparent
    pub fn is_hidden(&self) -> bool {
        self.display.trim() == "none"
            || self.visibility.trim() == "hidden"
            || self
                .opacity
                .trim()
                .parse::<f64>()
                .map(|opacity| opacity == 0.0)
                .unwrap_or(false)
    }
}

/// Viewport-relative bounding box in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Size of the visible area of the document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl Viewport {
    /// Whether the rect lies entirely inside the viewport rectangle
    pub fn contains(&self, rect: &Rect) -> bool {
        rect.top >= 0.0
            && rect.left >= 0.0
            && rect.bottom() <= self.height
            && rect.right() <= self.width
    }
}

/// One element of a rendered document
pub trait Element: Sized {
    /// Lowercase element name
    fn tag_name(&self) -> String;

    /// All attributes in source order
    fn attributes(&self) -> Vec<(String, String)>;

    fn attr(&self, name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn computed_style(&self) -> ComputedStyle;

    /// Layout box, if the document has layout
    fn bounding_rect(&self) -> Option<Rect>;

    /// Rendered width and height
    fn rendered_size(&self) -> Option<(f64, f64)> {
        self.bounding_rect().map(|rect| (rect.width, rect.height))
    }

    /// Current value of a form control
    fn form_value(&self) -> Option<String>;

    /// Label of the selected option of a choice control
    fn selected_option_text(&self) -> Option<String>;

    /// Absolute form of a URL-valued attribute (`href`, `src`)
    fn resolved_url(&self, attr: &str) -> Option<String>;

    /// Concatenation of the direct text-node children only
    fn own_text(&self) -> String;

    /// All descendant text, unrendered
    fn text_content(&self) -> String;

    /// Rendered descendant text
    fn inner_text(&self) -> String;

    /// Element children in document order
    fn children(&self) -> Vec<Self>;

    fn child_element_count(&self) -> usize {
        self.children().len()
    }
}

/// A whole document
pub trait Document {
    type Element<'a>: Element
    where
        Self: 'a;

    fn title(&self) -> String;

    fn url(&self) -> String;

    fn body(&self) -> Option<Self::Element<'_>>;

    fn viewport(&self) -> Viewport;

    /// All elements matching a CSS selector, in document order
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Element<'_>>;

    fn query_selector(&self, selector: &str) -> Option<Self::Element<'_>> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// Content of `<meta name="...">`
    fn meta_content(&self, name: &str) -> Option<String>;

    /// Rendered text of the whole body
    fn full_text(&self) -> String {
        self.body().map(|body| body.inner_text()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_styles() {
        let mut style = ComputedStyle::default();
        assert!(!style.is_hidden());

        style.display = "none".to_string();
        assert!(style.is_hidden());

        let style = ComputedStyle {
            visibility: "hidden".to_string(),
            ..ComputedStyle::default()
        };
        assert!(style.is_hidden());

        let style = ComputedStyle {
            opacity: "0".to_string(),
            ..ComputedStyle::default()
        };
        assert!(style.is_hidden());

        let style = ComputedStyle {
            opacity: "0.5".to_string(),
            ..ComputedStyle::default()
        };
        assert!(!style.is_hidden());
    }

    #[test]
    fn test_viewport_contains() {
        let viewport = Viewport {
            width: 100.0,
            height: 100.0,
        };
        let inside = Rect {
            top: 10.0,
            left: 10.0,
            width: 50.0,
            height: 50.0,
        };
        let overflowing = Rect {
            top: 60.0,
            left: 10.0,
            width: 50.0,
            height: 50.0,
        };
        let above = Rect {
            top: -1.0,
            ..inside
        };
        assert!(viewport.contains(&inside));
        assert!(!viewport.contains(&overflowing));
        assert!(!viewport.contains(&above));
    }
}
