//! HTML cleanup helpers for generated content
//!
//! The model hands back HTML wrapped in markdown fences, sometimes escaped
//! more than once, with stray empty elements. These helpers repair that
//! without another API round trip. None of them fails: bad input degrades
//! to a placeholder fragment.

use regex::Regex;
use std::sync::OnceLock;

fn fence_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^```html\s*").unwrap())
}

fn fence_bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```\s*").unwrap())
}

fn fence_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```$").unwrap())
}

fn empty_paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<p[^>]*>(\s|&nbsp;|<br\s*/?>)*</p>").unwrap())
}

fn list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(ul|ol)[^>]*>.*?</(ul|ol)>").unwrap())
}

fn li_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<li[\s>]").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

/// Unescape the five HTML entities the model mixes into its output.
fn unescape_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Purify model-generated HTML without spending another API call.
///
/// Removes residual markdown fences and unescapes entities in a loop until
/// the text stabilizes, so double-escaped fragments (e.g. `&amp;lt;div&gt;`)
/// are fully decoded.
pub fn clean_model_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = fence_open_re().replace(text.trim(), "").to_string();
    text = fence_bare_re().replace(&text, "").to_string();
    text = fence_close_re().replace(&text, "").to_string();

    loop {
        let unescaped = unescape_entities(&text);
        if unescaped == text {
            break;
        }
        text = unescaped;
    }

    text.trim().to_string()
}

/// Finalize generated HTML for display.
///
/// Never fails: empty or blank input produces a placeholder paragraph naming
/// the product. Empty `<p>` elements and `<ul>`/`<ol>` lists without a single
/// `<li>` are dropped, and one empty trailing paragraph is appended as a
/// spacing element.
pub fn finalize_for_display(html_content: &str, product_name: &str) -> String {
    if html_content.trim().is_empty() {
        log::warn!("HTML content for finalization is empty or invalid");
        return format!("<p>Content for {} could not be generated.</p>", product_name);
    }

    let mut html = empty_paragraph_re().replace_all(html_content, "").to_string();

    html = list_re()
        .replace_all(&html, |caps: &regex::Captures| {
            let block = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            if li_re().is_match(block) {
                block.to_string()
            } else {
                String::new()
            }
        })
        .to_string();

    format!("{}<p></p>", html.trim())
}

/// Strip tags from an HTML fragment, yielding whitespace-normalized plain
/// text. Used to turn existing catalog descriptions into prompt context.
pub fn strip_tags(html: &str) -> String {
    let text = tag_re().replace_all(html, " ");
    let text = unescape_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_html_fence() {
        let text = "```html\n<p>Hello</p>\n```";
        assert_eq!(clean_model_html(text), "<p>Hello</p>");
    }

    #[test]
    fn test_clean_removes_bare_fence() {
        let text = "```\n<div>x</div>\n```";
        assert_eq!(clean_model_html(text), "<div>x</div>");
    }

    #[test]
    fn test_clean_unescapes_once() {
        let text = "&lt;p&gt;Hi&lt;/p&gt;";
        assert_eq!(clean_model_html(text), "<p>Hi</p>");
    }

    #[test]
    fn test_clean_unescapes_double_escaping() {
        let text = "&amp;lt;div&amp;gt;deep&amp;lt;/div&amp;gt;";
        assert_eq!(clean_model_html(text), "<div>deep</div>");
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_model_html(""), "");
    }

    #[test]
    fn test_clean_plain_html_untouched() {
        let text = "<p>Already clean</p>";
        assert_eq!(clean_model_html(text), "<p>Already clean</p>");
    }

    #[test]
    fn test_finalize_empty_produces_placeholder() {
        let html = finalize_for_display("", "Aspirin");
        assert_eq!(html, "<p>Content for Aspirin could not be generated.</p>");
    }

    #[test]
    fn test_finalize_blank_produces_placeholder() {
        let html = finalize_for_display("   \n  ", "Aspirin");
        assert!(html.contains("Aspirin"));
        assert!(!html.is_empty());
    }

    #[test]
    fn test_finalize_removes_empty_paragraphs() {
        let html = finalize_for_display("<p>Real</p><p></p><p>  </p>", "X");
        assert_eq!(html, "<p>Real</p><p></p>");
    }

    #[test]
    fn test_finalize_removes_nbsp_paragraphs() {
        let html = finalize_for_display("<p>&nbsp;</p><p>Keep</p>", "X");
        assert_eq!(html, "<p>Keep</p><p></p>");
    }

    #[test]
    fn test_finalize_removes_empty_lists() {
        let html = finalize_for_display("<ul></ul><p>Body</p>", "X");
        assert_eq!(html, "<p>Body</p><p></p>");
    }

    #[test]
    fn test_finalize_keeps_populated_lists() {
        let input = "<ul><li>Item</li></ul>";
        let html = finalize_for_display(input, "X");
        assert_eq!(html, "<ul><li>Item</li></ul><p></p>");
    }

    #[test]
    fn test_finalize_appends_trailing_paragraph() {
        let html = finalize_for_display("<p>Body</p>", "X");
        assert!(html.ends_with("<p></p>"));
    }

    #[test]
    fn test_finalize_never_empty() {
        for input in ["", "<p></p>", "<ul></ul>", "text"] {
            assert!(!finalize_for_display(input, "Product").is_empty());
        }
    }

    #[test]
    fn test_strip_tags_basic() {
        let text = strip_tags("<p>Hydrating <b>serum</b> for daily use</p>");
        assert_eq!(text, "Hydrating serum for daily use");
    }

    #[test]
    fn test_strip_tags_normalizes_whitespace() {
        let text = strip_tags("<div>\n  spaced\n\n   out  </div>");
        assert_eq!(text, "spaced out");
    }

    #[test]
    fn test_strip_tags_unescapes_entities() {
        let text = strip_tags("<p>Day &amp; Night</p>");
        assert_eq!(text, "Day & Night");
    }

    #[test]
    fn test_strip_tags_plain_text_passthrough() {
        assert_eq!(strip_tags("no tags"), "no tags");
    }
}
