use crate::dom::{RawElement, RawPage, Rect, StaticDocument};
use crate::extract::summary::{HEADING_SELECTOR, IMAGE_SELECTOR, LINK_SELECTOR};
use crate::extract::{SiteRule, Summarizer, SummaryConfig};
use crate::results::{Heading, ImageRef, LinkRef};

fn paragraph(words: usize) -> String {
    format!("<p>{}</p>", "lorem ".repeat(words))
}

fn summarize(html: &str, url: &str) -> crate::results::PageSummary {
    let doc = StaticDocument::parse(html, Some(url));
    Summarizer::default().summarize(&doc)
}

#[cfg(test)]
mod main_content_tests {
    use super::*;

    #[test]
    fn test_selector_order_beats_document_order() {
        let html = format!(
            r#"<body><div class="content">generic {}</div><div class="article-content">precise {}</div></body>"#,
            paragraph(30),
            paragraph(30)
        );
        let summary = summarize(&html, "https://example.com/");
        assert!(summary.main_content.starts_with("precise"));
    }

    #[test]
    fn test_short_candidates_are_skipped() {
        let html = format!(
            r#"<body><article>too short</article><main>long enough {}</main></body>"#,
            paragraph(30)
        );
        let summary = summarize(&html, "https://example.com/");
        assert!(summary.main_content.starts_with("long enough"));
    }

    #[test]
    fn test_falls_back_to_full_text() {
        let summary = summarize("<body><div>just a little text</div></body>", "https://example.com/");
        assert_eq!(summary.main_content, "just a little text");
        assert_eq!(summary.main_content, summary.full_text);
    }

    #[test]
    fn test_metadata() {
        let html = r#"<html><head>
            <meta name="description" content="About things">
            <meta name="keywords" content="a, b">
        </head><body></body></html>"#;
        let summary = summarize(html, "https://example.com/");
        assert_eq!(summary.meta_description, "About things");
        assert_eq!(summary.meta_keywords, "a, b");

        let summary = summarize("<body></body>", "https://example.com/");
        assert_eq!(summary.meta_description, "");
        assert_eq!(summary.meta_keywords, "");
    }
}

#[cfg(test)]
mod collection_tests {
    use super::*;

    #[test]
    fn test_headings_in_document_order() {
        let html = "<body><h2>Intro</h2><h1>Top</h1><h3>   </h3><h6>Fine print</h6></body>";
        let summary = summarize(html, "https://example.com/");
        assert_eq!(
            summary.headings,
            vec![
                Heading {
                    level: 2,
                    text: "Intro".to_string()
                },
                Heading {
                    level: 1,
                    text: "Top".to_string()
                },
                Heading {
                    level: 6,
                    text: "Fine print".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_images_need_alt_and_size() {
        let html = r#"<body>
            <img src="/big.png" alt="Big" width="300" height="200">
            <img src="/icon.png" alt="Icon" width="16" height="16">
            <img src="/wide.png" alt="Banner" width="800" height="100">
            <img src="/noalt.png" width="300" height="300">
            <img src="/blank.png" alt="" width="300" height="300">
        </body>"#;
        let summary = summarize(html, "https://example.com/post/");
        assert_eq!(
            summary.images,
            vec![ImageRef {
                alt: "Big".to_string(),
                src: "https://example.com/big.png".to_string()
            }]
        );
    }

    #[test]
    fn test_links_skip_scripts_and_empty_text() {
        let html = r#"<body>
            <a href="guide">Guide</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="https://other.example/"> </a>
            <a href="">Nowhere</a>
            <a>Anchor</a>
        </body>"#;
        let summary = summarize(html, "https://example.com/docs/");
        assert_eq!(
            summary.links,
            vec![LinkRef {
                text: "Guide".to_string(),
                href: "https://example.com/docs/guide".to_string()
            }]
        );
    }
}

#[cfg(test)]
mod site_rule_tests {
    use super::*;

    const NOTE_PAGE: &str = r#"<body>
        <span class="o-noteContentText__author"> Writer </span>
        <time datetime="2024-05-01T09:00:00+09:00"></time>
    </body>"#;

    #[test]
    fn test_matching_site_gets_author_and_date() {
        let summary = summarize(NOTE_PAGE, "https://note.com/writer/n/abc");
        assert_eq!(summary.author.as_deref(), Some("Writer"));
        assert_eq!(
            summary.publish_date.as_deref(),
            Some("2024-05-01T09:00:00+09:00")
        );
    }

    #[test]
    fn test_date_text_preferred_over_attribute() {
        let html = r#"<body><time datetime="2024-05-01">May 1</time></body>"#;
        let summary = summarize(html, "https://note.com/writer/n/abc");
        assert_eq!(summary.publish_date.as_deref(), Some("May 1"));
        assert_eq!(summary.author, None);
    }

    #[test]
    fn test_other_sites_untouched() {
        let summary = summarize(NOTE_PAGE, "https://example.com/writer");
        assert_eq!(summary.author, None);
        assert_eq!(summary.publish_date, None);
    }

    #[test]
    fn test_invalid_rule_pattern_is_ignored() {
        let config = SummaryConfig {
            site_rules: vec![SiteRule {
                url_pattern: "(unclosed".to_string(),
                author_selector: ".author".to_string(),
                date_selector: "time".to_string(),
            }],
            ..SummaryConfig::default()
        };
        let summarizer = Summarizer::new(config);
        let doc = StaticDocument::parse(r#"<body><i class="author">A</i></body>"#, Some("https://x.test/"));
        assert_eq!(summarizer.summarize(&doc).author, None);
    }
}

#[cfg(test)]
mod probe_tests {
    use super::*;

    #[test]
    fn test_probe_queries_cover_summary_needs() {
        let queries = Summarizer::default().probe_queries();
        let find = |selector: &str| queries.iter().find(|q| q.selector == selector).unwrap();

        assert!(find(HEADING_SELECTOR).all);
        assert!(find(IMAGE_SELECTOR).all);
        assert!(find(LINK_SELECTOR).all);
        assert!(!find(".article-content").all);
        assert!(!find(".o-noteContentText__date, time").all);

        let mut selectors: Vec<&str> = queries.iter().map(|q| q.selector.as_str()).collect();
        let total = selectors.len();
        selectors.sort_unstable();
        selectors.dedup();
        assert_eq!(selectors.len(), total);
    }

    #[test]
    fn test_summarize_raw_page() {
        let mut heading = RawElement {
            tag: "H2".to_string(),
            inner_text: "Releases".to_string(),
            ..RawElement::default()
        };
        heading.text_content = heading.inner_text.clone();

        let image = RawElement {
            tag: "img".to_string(),
            attributes: vec![("alt".to_string(), "Chart".to_string())],
            src: Some("https://example.com/chart.png".to_string()),
            rect: Some(Rect {
                top: 0.0,
                left: 0.0,
                width: 400.0,
                height: 300.0,
            }),
            ..RawElement::default()
        };

        let mut page = RawPage {
            url: "https://example.com/".to_string(),
            body: Some(RawElement {
                tag: "body".to_string(),
                inner_text: "Releases".to_string(),
                ..RawElement::default()
            }),
            ..RawPage::default()
        };
        page.selections.insert(HEADING_SELECTOR.to_string(), vec![heading]);
        page.selections.insert(IMAGE_SELECTOR.to_string(), vec![image]);

        let summary = Summarizer::default().summarize(&page);
        assert_eq!(summary.main_content, "Releases");
        assert_eq!(summary.headings[0].level, 2);
        assert_eq!(summary.images[0].src, "https://example.com/chart.png");
        assert!(summary.links.is_empty());
    }
}
