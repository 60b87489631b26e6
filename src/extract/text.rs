use crate::dom::Element;

/// Marker appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Tags whose full descendant text is always worth keeping
const TEXTUAL_TAGS: &[&str] = &[
    "button", "a", "h1", "h2", "h3", "h4", "h5", "h6", "li", "label", "summary",
];

/// Limits applied when deriving a node's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    /// Final bound on the normalized text, ellipsis included
    pub max_len: usize,
    /// Descendant text shorter than this is taken whole
    pub fallback_len: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            max_len: 500,
            fallback_len: 500,
        }
    }
}

/// Derives the text a node owns.
///
/// Form controls report their current value (or the selected option's label). Other
/// elements report their direct text nodes; when those are blank, descendant text is
/// used for naturally textual tags or when it is short, and clipped otherwise. The
/// result is whitespace-collapsed and bounded by `limits.max_len`.
pub fn element_text<E: Element>(element: &E, tag: &str, limits: &TextLimits) -> String {
    let text = match tag {
        "input" | "textarea" => element.form_value().unwrap_or_default(),
        "select" => element.selected_option_text().unwrap_or_default(),
        _ => {
            let own = element.own_text();
            if !own.trim().is_empty() {
                own
            } else {
                let descendant = element.text_content();
                if TEXTUAL_TAGS.contains(&tag)
                    || descendant.chars().count() < limits.fallback_len
                {
                    descendant
                } else {
                    let keep = limits.fallback_len.saturating_sub(ELLIPSIS.len());
                    let mut clipped: String = descendant.chars().take(keep).collect();
                    clipped.push_str(ELLIPSIS);
                    clipped
                }
            }
        }
    };

    truncate_with_ellipsis(&normalize_whitespace(&text), limits.max_len)
}

/// Collapses every whitespace run to a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bounds `text` to `max_len` characters, replacing the tail with [`ELLIPSIS`]
pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
