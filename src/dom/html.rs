use super::{ComputedStyle, Document, Element, Rect, Viewport};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Tags a browser never renders
const UNRENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link", "base",
];

/// Tags whose rendered text starts on its own line
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// An HTML document parsed with scraper, without layout.
///
/// Visibility comes from inline `style`, the `hidden` attribute and unrendered tags.
/// There are no bounding boxes, so extracted nodes never carry a position; image sizes
/// are read from the `width`/`height` attributes.
pub struct StaticDocument {
    html: Html,
    url: Option<Url>,
    viewport: Viewport,
}

impl StaticDocument {
    /// Parse a full HTML document. `url` is used to resolve relative links.
    pub fn parse(source: &str, url: Option<&str>) -> Self {
        let url = url.and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                ::log::warn!("Ignoring invalid document URL {}: {}", raw, e);
                None
            }
        });

        Self {
            html: Html::parse_document(source),
            url,
            viewport: Viewport::default(),
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    fn wrap<'a>(&'a self, element: ElementRef<'a>) -> StaticElement<'a> {
        StaticElement {
            element,
            base: self.url.as_ref(),
        }
    }

    fn find_first(&self, name: &str) -> Option<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == name)
    }
}

impl Document for StaticDocument {
    type Element<'a> = StaticElement<'a>;

    fn title(&self) -> String {
        self.find_first("title")
            .map(|title| title.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    fn url(&self) -> String {
        self.url.as_ref().map(Url::to_string).unwrap_or_default()
    }

    fn body(&self) -> Option<StaticElement<'_>> {
        self.find_first("body").map(|body| self.wrap(body))
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn query_selector_all(&self, selector: &str) -> Vec<StaticElement<'_>> {
        match Selector::parse(selector) {
            Ok(parsed) => self
                .html
                .select(&parsed)
                .map(|element| self.wrap(element))
                .collect(),
            Err(e) => {
                ::log::warn!("Skipping unsupported selector {:?}: {:?}", selector, e);
                Vec::new()
            }
        }
    }

    fn meta_content(&self, name: &str) -> Option<String> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name() == "meta")
            .find(|element| {
                element
                    .value()
                    .attr("name")
                    .is_some_and(|value| value.eq_ignore_ascii_case(name))
            })
            .and_then(|element| element.value().attr("content"))
            .map(str::to_string)
    }
}

/// One element of a [`StaticDocument`]
#[derive(Debug, Clone, Copy)]
pub struct StaticElement<'a> {
    element: ElementRef<'a>,
    base: Option<&'a Url>,
}

impl<'a> StaticElement<'a> {
    fn child(&self, element: ElementRef<'a>) -> Self {
        Self {
            element,
            base: self.base,
        }
    }

    fn options(&self) -> Vec<ElementRef<'a>> {
        self.element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name() == "option")
            .collect()
    }

    fn selected_option(&self) -> Option<ElementRef<'a>> {
        let mut first = None;
        for option in self.options() {
            if option.value().attr("selected").is_some() {
                return Some(option);
            }
            first.get_or_insert(option);
        }
        first
    }

    fn dimension(&self, name: &str) -> Option<f64> {
        self.element
            .value()
            .attr(name)
            .and_then(|value| value.trim().trim_end_matches("px").parse::<f64>().ok())
    }
}

impl Element for StaticElement<'_> {
    fn tag_name(&self) -> String {
        self.element.value().name().to_ascii_lowercase()
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.element.value().attr(name).map(str::to_string)
    }

    fn computed_style(&self) -> ComputedStyle {
        let value = self.element.value();
        let mut style = ComputedStyle::default();

        if UNRENDERED_TAGS.contains(&value.name())
            || value.attr("hidden").is_some()
            || (value.name() == "input"
                && value
                    .attr("type")
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("hidden")))
        {
            style.display = "none".to_string();
        }

        if let Some(inline) = value.attr("style") {
            for declaration in inline.split(';') {
                let Some((property, raw)) = declaration.split_once(':') else {
                    continue;
                };
                let raw = raw.trim().trim_end_matches("!important").trim().to_string();
                match property.trim().to_ascii_lowercase().as_str() {
                    "display" => style.display = raw,
                    "visibility" => style.visibility = raw,
                    "opacity" => style.opacity = raw,
                    _ => {}
                }
            }
        }

        style
    }

    fn bounding_rect(&self) -> Option<Rect> {
        None
    }

    fn rendered_size(&self) -> Option<(f64, f64)> {
        Some((self.dimension("width")?, self.dimension("height")?))
    }

    fn form_value(&self) -> Option<String> {
        match self.element.value().name() {
            "input" => Some(self.attr("value").unwrap_or_default()),
            "textarea" => Some(self.text_content()),
            "select" => Some(
                self.selected_option()
                    .map(|option| match option.value().attr("value") {
                        Some(value) => value.to_string(),
                        None => option.text().collect::<String>().trim().to_string(),
                    })
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }

    fn selected_option_text(&self) -> Option<String> {
        if self.element.value().name() != "select" {
            return None;
        }
        self.selected_option()
            .map(|option| option.text().collect::<String>().trim().to_string())
    }

    fn resolved_url(&self, attr: &str) -> Option<String> {
        let raw = self.element.value().attr(attr)?;
        match self.base {
            Some(base) => Some(
                base.join(raw)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| raw.to_string()),
            ),
            None => Some(raw.to_string()),
        }
    }

    fn own_text(&self) -> String {
        let mut text = String::new();
        for child in self.element.children() {
            if let Node::Text(fragment) = child.value() {
                text.push_str(fragment);
            }
        }
        text
    }

    fn text_content(&self) -> String {
        self.element.text().collect()
    }

    fn inner_text(&self) -> String {
        let mut raw = String::new();
        collect_rendered_text(self, &mut raw);

        raw.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn children(&self) -> Vec<Self> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|element| self.child(element))
            .collect()
    }
}

/// Approximates `innerText`: skips hidden subtrees and breaks lines around blocks
fn collect_rendered_text(element: &StaticElement<'_>, out: &mut String) {
    for child in element.element.children() {
        match child.value() {
            Node::Text(fragment) => out.push_str(fragment),
            Node::Element(value) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let view = element.child(child_ref);
                if view.computed_style().is_hidden() {
                    continue;
                }
                if value.name() == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_TAGS.contains(&value.name());
                if block {
                    out.push('\n');
                }
                collect_rendered_text(&view, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
