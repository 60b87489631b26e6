use url::Url;

/// Adds `https://` to bare host input such as `example.com/page`
pub fn normalize_url(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) if url.has_host() || url.scheme() == "file" => Some(url.to_string()),
        _ => Url::parse(&format!("https://{}", input))
            .ok()
            .filter(|url| url.has_host())
            .map(|url| url.to_string()),
    }
}

/// The first `max_lines` lines of a script, with a note about the rest
pub fn script_preview(code: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = code.lines().collect();
    if lines.len() <= max_lines {
        return code.to_string();
    }
    format!(
        "{}\n... ({} more lines)",
        lines[..max_lines].join("\n"),
        lines.len() - max_lines
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://example.com/a").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            normalize_url(" example.com/page ").as_deref(),
            Some("https://example.com/page")
        );
        assert_eq!(
            normalize_url("localhost:8080").as_deref(),
            Some("https://localhost:8080/")
        );
        assert_eq!(normalize_url("file:///tmp/x.html").as_deref(), Some("file:///tmp/x.html"));
        assert_eq!(normalize_url("   "), None);
    }

    #[test]
    fn test_script_preview() {
        assert_eq!(script_preview("a\nb", 5), "a\nb");
        assert_eq!(script_preview("1\n2\n3\n4", 2), "1\n2\n... (2 more lines)");
    }
}
