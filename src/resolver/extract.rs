//! Image reference extraction from page HTML.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Matches the `src` attribute of `<img>` tags, double-quoted.
#[allow(clippy::expect_used)]
static IMG_SRC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*"([^"\s]+)""#).expect("img src regex is valid") // Static pattern, safe to panic
});

/// Returns every `<img src="...">` value in document order.
///
/// `&amp;` inside the attribute is unescaped; duplicates are kept so ids stay
/// aligned with page order.
///
/// # Examples
///
/// ```
/// use telegrab_core::resolver::extract_image_sources;
///
/// let html = r#"<figure><img src="/file/a.jpg"></figure><img alt="x" src="https://cdn/b.png">"#;
/// assert_eq!(extract_image_sources(html), vec!["/file/a.jpg", "https://cdn/b.png"]);
/// ```
#[must_use]
pub fn extract_image_sources(html: &str) -> Vec<String> {
    IMG_SRC_PATTERN
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let src = m.as_str().replace("&amp;", "&");
            trace!(src = %src, "found image reference");
            src
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_tags_are_not_merged() {
        let html = r#"<img src="/file/a.jpg"><img src="/file/b.jpg">"#;
        assert_eq!(extract_image_sources(html), vec!["/file/a.jpg", "/file/b.jpg"]);
    }

    #[test]
    fn test_attributes_before_src() {
        let html = r#"<IMG class="big" SRC="/file/c.jpg" alt="c">"#;
        assert_eq!(extract_image_sources(html), vec!["/file/c.jpg"]);
    }

    #[test]
    fn test_unescapes_ampersand() {
        let html = r#"<img src="https://cdn/x.jpg?a=1&amp;b=2">"#;
        assert_eq!(extract_image_sources(html), vec!["https://cdn/x.jpg?a=1&b=2"]);
    }

    #[test]
    fn test_no_images() {
        assert!(extract_image_sources("<p>text only</p>").is_empty());
        assert!(extract_image_sources(r#"<img data-src="/file/lazy.jpg">"#).is_empty());
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let html = r#"<img src="/file/a.jpg"><img src="/file/a.jpg">"#;
        assert_eq!(extract_image_sources(html).len(), 2);
    }
}
