use super::{ComputedStyle, Document, Element, Rect, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Characters of `textContent` the probe keeps per element
pub const PROBE_TEXT_CLIP: usize = 1000;

/// A selector the probe evaluates on behalf of the summarizer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeQuery {
    pub selector: String,
    /// Collect every match instead of only the first one
    pub all: bool,
}

/// Parameters sent to the in-page probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequest {
    pub max_depth: usize,
    /// Rendered children described per element before the probe stops walking
    pub max_children: usize,
    pub max_important_children: usize,
    pub text_clip: usize,
    pub queries: Vec<ProbeQuery>,
    pub meta_names: Vec<String>,
}

/// Element facts as reported by the page probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawElement {
    pub tag: String,
    /// `[name, value]` pairs in source order
    pub attributes: Vec<(String, String)>,
    pub style: ComputedStyle,
    pub rect: Option<Rect>,
    pub value: Option<String>,
    pub selected_text: Option<String>,
    pub href: Option<String>,
    pub src: Option<String>,
    pub own_text: String,
    /// Clipped to [`PROBE_TEXT_CLIP`] characters
    pub text_content: String,
    /// Only filled for the body and for query matches
    pub inner_text: String,
    pub child_element_count: usize,
    pub children: Vec<RawElement>,
}

/// Everything the probe reports about one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPage {
    pub title: String,
    pub url: String,
    pub viewport: Viewport,
    pub body: Option<RawElement>,
    /// Matches keyed by selector, shallow (no children)
    pub selections: HashMap<String, Vec<RawElement>>,
    pub meta: HashMap<String, String>,
}

impl<'a> Element for &'a RawElement {
    fn tag_name(&self) -> String {
        self.tag.to_ascii_lowercase()
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.attributes.clone()
    }

    fn computed_style(&self) -> ComputedStyle {
        self.style.clone()
    }

    fn bounding_rect(&self) -> Option<Rect> {
        self.rect
    }

    fn form_value(&self) -> Option<String> {
        self.value.clone()
    }

    fn selected_option_text(&self) -> Option<String> {
        self.selected_text.clone()
    }

    fn resolved_url(&self, attr: &str) -> Option<String> {
        match attr {
            "href" => self.href.clone().or_else(|| self.attr("href")),
            "src" => self.src.clone().or_else(|| self.attr("src")),
            other => self.attr(other),
        }
    }

    fn own_text(&self) -> String {
        self.own_text.clone()
    }

    fn text_content(&self) -> String {
        self.text_content.clone()
    }

    fn inner_text(&self) -> String {
        self.inner_text.clone()
    }

    fn children(&self) -> Vec<Self> {
        let element: &'a RawElement = *self;
        element.children.iter().collect()
    }

    fn child_element_count(&self) -> usize {
        self.child_element_count.max(self.children.len())
    }
}

impl Document for RawPage {
    type Element<'a> = &'a RawElement;

    fn title(&self) -> String {
        self.title.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn body(&self) -> Option<&RawElement> {
        self.body.as_ref()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn query_selector_all(&self, selector: &str) -> Vec<&RawElement> {
        match self.selections.get(selector) {
            Some(matches) => matches.iter().collect(),
            None => {
                ::log::debug!("Probe did not evaluate selector {:?}", selector);
                Vec::new()
            }
        }
    }

    fn meta_content(&self, name: &str) -> Option<String> {
        self.meta.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_probe_output() {
        let page: RawPage = serde_json::from_value(json!({
            "title": "Demo",
            "url": "https://example.com/",
            "viewport": {"width": 800.0, "height": 600.0},
            "body": {
                "tag": "BODY",
                "attributes": [["class", "home"], ["data-theme", "dark"]],
                "style": {"display": "block", "visibility": "visible", "opacity": "1"},
                "rect": {"top": 0.0, "left": 0.0, "width": 800.0, "height": 1200.0},
                "ownText": "",
                "textContent": "Hi",
                "innerText": "Hi",
                "childElementCount": 1,
                "children": [{"tag": "p", "ownText": "Hi", "textContent": "Hi"}]
            },
            "selections": {"h1": []},
            "meta": {"description": "demo"}
        }))
        .unwrap();

        let body = page.body().unwrap();
        assert_eq!(body.tag_name(), "body");
        assert_eq!(body.attr("data-theme").as_deref(), Some("dark"));
        assert_eq!(body.children().len(), 1);
        assert_eq!(body.children()[0].computed_style(), ComputedStyle::default());
        assert_eq!(page.meta_content("description").as_deref(), Some("demo"));
        assert!(page.query_selector_all("h1").is_empty());
        assert!(page.query_selector_all("h2").is_empty());
        assert_eq!(page.full_text(), "Hi");
    }
}
