//! HTML sanitising for editor content
//!
//! Post bodies come from a rich-text editor and are rendered unescaped, so
//! they are parsed and rebuilt from an allowlist before storage. Anything
//! not on the list is dropped: unknown elements lose their tags (and, for
//! `script`, `style`, `iframe`, `object` and `embed`, their content too),
//! unknown attributes disappear, and URLs must be relative or use
//! `http`, `https` or `mailto`.

use ammonia::{Builder, UrlRelative};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Default excerpt length in characters
pub const EXCERPT_LEN: usize = 200;

const URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

const DROPPED_WITH_CONTENT: [&str; 5] = ["script", "style", "iframe", "object", "embed"];

static CLEANER: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::default();
    builder
        .url_schemes(URL_SCHEMES.into_iter().collect::<HashSet<_>>())
        .url_relative(UrlRelative::PassThrough)
        .link_rel(Some("noopener noreferrer"))
        .add_generic_attributes(["class"])
        .add_tag_attributes("img", ["loading"])
        .add_tag_attributes("a", ["target"])
        .add_clean_content_tags(DROPPED_WITH_CONTENT);
    builder
});

static TAGS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").ok());

static WHITESPACE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

/// Remove active content from editor HTML.
pub fn sanitize_html(html: &str) -> String {
    CLEANER.clean(html).to_string()
}

/// Plain text of an HTML fragment: tags dropped, common entities decoded,
/// whitespace collapsed.
pub fn plain_text(html: &str) -> String {
    let cleaned = sanitize_html(html);
    let stripped = match &*TAGS {
        Some(re) => re.replace_all(&cleaned, " ").into_owned(),
        None => cleaned,
    };
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    match &*WHITESPACE {
        Some(re) => re.replace_all(decoded.trim(), " ").into_owned(),
        None => decoded.trim().to_string(),
    }
}

/// Excerpt of at most `max_chars` characters, cut at a word boundary with
/// a trailing ellipsis when shortened.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = plain_text(html);
    if text.chars().count() <= max_chars {
        return text;
    }

    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > max_chars / 2 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// True when any serialized attribute in `html` is an `on*` handler
    fn has_event_handler(html: &str) -> bool {
        let attribute = Regex::new(r#"\s([^\s"'<>/=]+)="[^"]*""#).unwrap();
        let found = attribute
            .captures_iter(html)
            .any(|c| c[1].to_ascii_lowercase().starts_with("on"));
        found
    }

    #[test]
    fn test_removes_script_and_style_blocks() {
        let html = "<p>Hi</p><script>alert(1)</script><STYLE>body{}</STYLE><p>there</p>";
        assert_eq!(sanitize_html(html), "<p>Hi</p><p>there</p>");
    }

    #[test]
    fn test_removes_iframes_and_unclosed_tags() {
        assert_eq!(sanitize_html(r#"<iframe src="x"></iframe>ok"#), "ok");
        let out = sanitize_html("a<script src=evil.js>b");
        assert!(out.starts_with('a'));
        assert!(!out.contains("script"));
        assert!(!out.contains("evil"));
    }

    #[test]
    fn test_removes_event_handlers() {
        let html = r#"<img src="/a.png" onerror="alert(1)" alt='x' onload=go()>"#;
        assert_eq!(sanitize_html(html), r#"<img src="/a.png" alt="x">"#);
    }

    #[test]
    fn test_slash_separated_attributes() {
        // The unquoted value swallows the rest, leaving an inert relative src
        let out = sanitize_html("<img/src=x/onerror=alert(document.cookie)>");
        assert_eq!(out, r#"<img src="x/onerror=alert(document.cookie)">"#);
        assert!(!has_event_handler(&out));

        let out = sanitize_html("<img src=x onerror=alert(document.cookie)>");
        assert_eq!(out, r#"<img src="x">"#);

        let out = sanitize_html(r#"<svg/onload=alert(1)><p/onclick="x()">hi</p>"#);
        assert!(!out.contains("svg"));
        assert!(!has_event_handler(&out));
        assert!(out.contains("hi"));
    }

    #[test]
    fn test_removes_javascript_urls() {
        let html = r#"<a href="javascript:alert(1)">x</a><a href=' JavaScript:void(0)'>y</a><a href="/ok">z</a>"#;
        assert_eq!(
            sanitize_html(html),
            r#"<a rel="noopener noreferrer">x</a><a rel="noopener noreferrer">y</a><a href="/ok" rel="noopener noreferrer">z</a>"#
        );
    }

    #[test]
    fn test_removes_encoded_script_urls() {
        for html in [
            r#"<a href="&#106;avascript:alert(1)">x</a>"#,
            r#"<a href="&#x6A;&#x61;vascript:alert(1)">x</a>"#,
            "<a href=\"java\tscript:alert(1)\">x</a>",
            "<a href=\"java&#9;script:alert(1)\">x</a>",
            "<a href=\"\njavascript:alert(1)\">x</a>",
            r#"<img src="vbscript:msgbox(1)">"#,
            r#"<a href="data:text/html;base64,PHNjcmlwdD4=">x</a>"#,
        ] {
            let out = sanitize_html(html);
            let lower = out.to_lowercase();
            assert!(!lower.contains("script:"), "{} -> {}", html, out);
            assert!(!lower.contains("data:"), "{} -> {}", html, out);
            assert!(!lower.contains("href"), "{} -> {}", html, out);
            assert!(!lower.contains("src"), "{} -> {}", html, out);
        }
    }

    #[test]
    fn test_removes_meta_refresh_and_forms() {
        let html = r#"<meta http-equiv="refresh" content="0;url=javascript:alert(1)"><form action="/x"><button formaction="javascript:alert(1)">go</button></form><p>ok</p>"#;
        let out = sanitize_html(html);
        assert!(!out.contains("meta"));
        assert!(!out.contains("refresh"));
        assert!(!out.contains("form"));
        assert!(!out.contains("javascript"));
        assert!(out.ends_with("<p>ok</p>"));
    }

    #[test]
    fn test_nested_obfuscation() {
        let html = "<scr<script></script>ipt>alert(1)</script>";
        assert!(!sanitize_html(html).to_lowercase().contains("<script"));
    }

    #[test]
    fn test_keeps_ordinary_markup() {
        let html = r#"<h2>Title</h2><p>Some <strong>bold</strong> text and <em class="note">notes</em>.</p>"#;
        assert_eq!(sanitize_html(html), html);

        let link = sanitize_html(r#"<a href="https://kiny.example">a link</a>"#);
        assert_eq!(link, r#"<a href="https://kiny.example" rel="noopener noreferrer">a link</a>"#);
        assert!(sanitize_html(r#"<a href="mailto:hi@kiny.example">mail</a>"#).contains("mailto:"));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            plain_text("<p>Fish &amp; chips</p>\n<p>  are   <em>great</em></p>"),
            "Fish & chips are great"
        );
    }

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!(excerpt("<p>Short post</p>", 50), "Short post");
    }

    #[test]
    fn test_excerpt_cuts_at_word_boundary() {
        let html = "<p>The quick brown fox jumps over the lazy dog</p>";
        assert_eq!(excerpt(html, 20), "The quick brown fox…");
    }

    proptest! {
        #[test]
        fn prop_no_script_tag_survives(prefix in "[a-zA-Z0-9 <>/]{0,20}", body in "[a-zA-Z0-9 ();]{0,20}", suffix in "[a-zA-Z0-9 ]{0,20}") {
            let html = format!("{}<script>{}</script>{}", prefix, body, suffix);
            prop_assert!(!sanitize_html(&html).to_lowercase().contains("<script"));
        }

        #[test]
        fn prop_no_event_handler_survives(
            tag in "(img|a|p|div|svg|body|details)",
            sep in "[ /\t\n]{1,3}",
            event in "on[a-z]{1,10}",
            quote in "[\"' ]?",
            noise in "[a-zA-Z0-9=/ ]{0,12}",
        ) {
            let html = format!("<{tag}{sep}{noise}{sep}{event}={quote}alert(1){quote}>x</{tag}>");
            let out = sanitize_html(&html);
            prop_assert!(!has_event_handler(&out), "{} -> {}", html, out);
        }

        #[test]
        fn prop_excerpt_respects_limit(text in "[a-zA-Z ]{0,400}", max in 10usize..250) {
            let out = excerpt(&text, max);
            // The ellipsis is the only character allowed past the limit
            prop_assert!(out.chars().count() <= max + 1);
        }
    }
}
