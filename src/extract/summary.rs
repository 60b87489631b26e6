use crate::dom::{Document, Element, ProbeQuery};
use crate::results::{Heading, ImageRef, LinkRef, PageSummary};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";
pub const IMAGE_SELECTOR: &str = r#"img[alt]:not([alt=""])"#;
pub const LINK_SELECTOR: &str = r#"a[href]:not([href=""])"#;

const META_NAMES: &[&str] = &["description", "keywords"];

/// Best-effort enrichment for one publishing platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRule {
    /// Regex matched against the document URL
    pub url_pattern: String,
    pub author_selector: String,
    pub date_selector: String,
}

/// Configuration for the content summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Tried in order; precise article containers come before generic landmarks
    #[serde(default = "default_main_content_selectors")]
    pub main_content_selectors: Vec<String>,

    /// A main-content candidate needs more rendered characters than this
    #[serde(default = "default_min_main_content_chars")]
    pub min_main_content_chars: usize,

    /// Images must be larger than this in both dimensions
    #[serde(default = "default_min_image_size")]
    pub min_image_size: f64,

    #[serde(default = "default_site_rules")]
    pub site_rules: Vec<SiteRule>,
}

fn default_main_content_selectors() -> Vec<String> {
    [
        ".o-articleBody",
        ".o-articleContainer",
        ".note-common-styles__textnote-body",
        ".article-content",
        ".post-content",
        ".entry-content",
        ".post__content",
        ".post-body",
        ".article__content",
        ".article__body",
        "article",
        "main",
        ".main",
        ".content",
        "#content",
        ".post",
        ".article",
        ".blog-post",
        r#"[role="article"]"#,
        ".note-common-styles__container",
    ]
    .iter()
    .map(|selector| selector.to_string())
    .collect()
}

fn default_min_main_content_chars() -> usize {
    100
}

fn default_min_image_size() -> f64 {
    100.0
}

fn default_site_rules() -> Vec<SiteRule> {
    vec![SiteRule {
        url_pattern: r"note\.com".to_string(),
        author_selector: ".o-authorNoteInfo__name, .o-noteContentText__author".to_string(),
        date_selector: ".o-noteContentText__date, time".to_string(),
    }]
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            main_content_selectors: default_main_content_selectors(),
            min_main_content_chars: default_min_main_content_chars(),
            min_image_size: default_min_image_size(),
            site_rules: default_site_rules(),
        }
    }
}

/// Picks out main content, headings, images, links and metadata
#[derive(Debug, Clone)]
pub struct Summarizer {
    config: SummaryConfig,
    site_patterns: Vec<(Regex, SiteRule)>,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(SummaryConfig::default())
    }
}

impl Summarizer {
    /// Create a summarizer; site rules with an invalid URL pattern are skipped
    pub fn new(config: SummaryConfig) -> Self {
        let site_patterns = config
            .site_rules
            .iter()
            .filter_map(|rule| match Regex::new(&rule.url_pattern) {
                Ok(regex) => Some((regex, rule.clone())),
                Err(e) => {
                    ::log::warn!("Ignoring site rule {:?}: {}", rule.url_pattern, e);
                    None
                }
            })
            .collect();

        Self {
            config,
            site_patterns,
        }
    }

    /// Selectors a live page must evaluate for [`Summarizer::summarize`] to work
    pub fn probe_queries(&self) -> Vec<ProbeQuery> {
        let mut queries: Vec<ProbeQuery> = Vec::new();
        let mut push = |selector: &str, all: bool| {
            match queries.iter_mut().find(|query| query.selector == selector) {
                Some(existing) => existing.all |= all,
                None => queries.push(ProbeQuery {
                    selector: selector.to_string(),
                    all,
                }),
            }
        };

        for selector in &self.config.main_content_selectors {
            push(selector, false);
        }
        for selector in [HEADING_SELECTOR, IMAGE_SELECTOR, LINK_SELECTOR] {
            push(selector, true);
        }
        for (_, rule) in &self.site_patterns {
            push(&rule.author_selector, false);
            push(&rule.date_selector, false);
        }

        queries
    }

    /// Meta tag names a live page must report
    pub fn meta_names(&self) -> Vec<String> {
        META_NAMES.iter().map(|name| name.to_string()).collect()
    }

    pub fn summarize<D: Document>(&self, doc: &D) -> PageSummary {
        let full_text = doc.full_text();
        let main_content = self
            .main_content(doc)
            .unwrap_or_else(|| full_text.clone());

        let mut summary = PageSummary {
            main_content,
            headings: self.headings(doc),
            images: self.images(doc),
            links: self.links(doc),
            meta_description: doc.meta_content("description").unwrap_or_default(),
            meta_keywords: doc.meta_content("keywords").unwrap_or_default(),
            full_text,
            author: None,
            publish_date: None,
        };

        self.apply_site_rules(doc, &mut summary);
        summary
    }

    /// Rendered text of the first selector match with enough text
    fn main_content<D: Document>(&self, doc: &D) -> Option<String> {
        for selector in &self.config.main_content_selectors {
            let Some(element) = doc.query_selector(selector) else {
                continue;
            };
            let text = element.inner_text();
            if text.trim().chars().count() > self.config.min_main_content_chars {
                ::log::debug!("Main content matched selector {}", selector);
                return Some(text);
            }
        }
        ::log::debug!("No main content container qualified, using full body text");
        None
    }

    fn headings<D: Document>(&self, doc: &D) -> Vec<Heading> {
        doc.query_selector_all(HEADING_SELECTOR)
            .iter()
            .filter_map(|heading| {
                let text = heading.inner_text().trim().to_string();
                if text.is_empty() {
                    return None;
                }
                let level = heading
                    .tag_name()
                    .strip_prefix('h')
                    .and_then(|digit| digit.parse::<u8>().ok())?;
                Some(Heading { level, text })
            })
            .collect()
    }

    fn images<D: Document>(&self, doc: &D) -> Vec<ImageRef> {
        let min = self.config.min_image_size;
        doc.query_selector_all(IMAGE_SELECTOR)
            .iter()
            .filter_map(|image| {
                let alt = image.attr("alt")?.trim().to_string();
                if alt.is_empty() {
                    return None;
                }
                let (width, height) = image.rendered_size()?;
                if width <= min || height <= min {
                    return None;
                }
                Some(ImageRef {
                    alt,
                    src: image.resolved_url("src").unwrap_or_default(),
                })
            })
            .collect()
    }

    fn links<D: Document>(&self, doc: &D) -> Vec<LinkRef> {
        doc.query_selector_all(LINK_SELECTOR)
            .iter()
            .filter_map(|link| {
                let text = link.inner_text().trim().to_string();
                if text.is_empty() {
                    return None;
                }
                let href = link.resolved_url("href")?;
                if href.is_empty() || href.trim_start().to_ascii_lowercase().starts_with("javascript:") {
                    return None;
                }
                Some(LinkRef { text, href })
            })
            .collect()
    }

    fn apply_site_rules<D: Document>(&self, doc: &D, summary: &mut PageSummary) {
        let url = doc.url();
        for (pattern, rule) in &self.site_patterns {
            if !pattern.is_match(&url) {
                continue;
            }

            if let Some(author) = doc.query_selector(&rule.author_selector) {
                let text = author.inner_text().trim().to_string();
                if !text.is_empty() {
                    summary.author = Some(text);
                }
            }

            if let Some(date) = doc.query_selector(&rule.date_selector) {
                let text = date.inner_text().trim().to_string();
                summary.publish_date = if text.is_empty() {
                    date.attr("datetime")
                } else {
                    Some(text)
                };
            }

            ::log::debug!(
                "Applied site rule {} (author: {}, date: {})",
                rule.url_pattern,
                summary.author.is_some(),
                summary.publish_date.is_some()
            );
        }
    }
}
