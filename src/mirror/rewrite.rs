//! Image reference scanning and boundary-aware replacement
//!
//! Pure text functions; the mirror drives them around the network work.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Bare asset URLs on Supabase Storage, e.g.
/// `https://abc.supabase.co/storage/v1/object/public/bucket/pic.jpg`
pub const DEFAULT_PROVIDER_PATTERN: &str =
    r#"https://[^"'\s)<>/\]`*]*supabase[^"'\s)<>/\]`*]*\.co(?::\d+)?/[^"'\s)<>\]`]*?storage/v1/[^"'\s)<>\]`]*"#;

static MARKDOWN_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"!\[[^\]]*\]\(\s*<?((?:[^()\s<>]|\([^()\s<>]*\))+)>?(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#,
    )
    .unwrap()
});

static HTML_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap()
});

static DEFAULT_PROVIDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PROVIDER_PATTERN).unwrap());

/// Finds image references in markdown/HTML documents
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    provider: Option<Regex>,
}

impl ReferenceScanner {
    /// Scanner with an optional bare-URL provider pattern.
    ///
    /// # Errors
    /// Returns the regex error if `provider_pattern` does not compile.
    pub fn new(provider_pattern: Option<&str>) -> Result<Self, regex::Error> {
        let provider = provider_pattern
            .filter(|p| !p.trim().is_empty())
            .map(Regex::new)
            .transpose()?;
        Ok(Self { provider })
    }

    /// Distinct candidate URLs, in the order they first appear.
    ///
    /// Markdown images come first, then `<img>` tags, then bare provider
    /// URLs.
    pub fn candidates(&self, document: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        let markdown = MARKDOWN_IMAGE_RE
            .captures_iter(document)
            .filter_map(|cap| cap.get(1));
        let html = HTML_IMG_RE
            .captures_iter(document)
            .filter_map(|cap| cap.get(1));
        let bare = self
            .provider
            .iter()
            .flat_map(|re| re.find_iter(document));

        let found = markdown
            .chain(html)
            .map(|m| m.as_str())
            .chain(bare.map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION)));

        for url in found {
            if !url.is_empty() && seen.insert(url) {
                urls.push(url.to_string());
            }
        }

        urls
    }
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self {
            provider: Some(DEFAULT_PROVIDER_RE.clone()),
        }
    }
}

/// Sentence punctuation and emphasis markers that can trail a bare URL in prose
const TRAILING_PUNCTUATION: [char; 9] = ['.', ',', ';', ':', '!', '?', '*', '_', '~'];

/// Characters that may directly precede a reference
const OPENING_DELIMITERS: [char; 9] = ['(', '"', '\'', '<', '>', '[', '`', '*', '_'];

/// Whether `before` (the text up to a match) leaves the match at a token start
fn starts_token(before: &str) -> bool {
    match before.chars().next_back() {
        None => true,
        Some(c) => c.is_whitespace() || OPENING_DELIMITERS.contains(&c),
    }
}

/// Whether `rest` (the text right after a match) closes the URL token.
///
/// Delimiters are end of text, whitespace, `)`, `]`, backticks, quotes and
/// angle brackets. Sentence punctuation and emphasis markers count only
/// when a delimiter follows them, so the `.png` in `…/a.png` still
/// continues the token `…/a`.
fn ends_token(rest: &str) -> bool {
    let after_punctuation = rest.trim_start_matches(TRAILING_PUNCTUATION);
    match after_punctuation.chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, ')' | '"' | '\'' | '<' | '>' | ']' | '`'),
    }
}

/// Replace every boundary-delimited occurrence of each original URL.
///
/// A URL that is a prefix of a longer one (`…/a.png` vs `…/a.png?v=2`) is
/// only replaced where it ends at a delimiter, and a URL embedded in another
/// (`…/web/2020/https://x.io/a.png`) only where it starts at one. When two
/// originals start at the same offset the longer one wins.
pub fn replace_references(document: &str, replacements: &[(String, String)]) -> String {
    let mut edits: Vec<(usize, usize, &str)> = Vec::new();

    for (original, replacement) in replacements {
        if original.is_empty() || original == replacement {
            continue;
        }
        for (start, _) in document.match_indices(original.as_str()) {
            let end = start + original.len();
            if starts_token(&document[..start]) && ends_token(&document[end..]) {
                edits.push((start, end, replacement.as_str()));
            }
        }
    }

    if edits.is_empty() {
        return document.to_string();
    }

    edits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut out = String::with_capacity(document.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        if start < cursor {
            continue;
        }
        out.push_str(&document[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&document[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_markdown_candidates() {
        let doc = "Intro ![cover](https://cdn.example.com/a.png) and ![](https://cdn.example.com/b.jpg \"Title\")";
        let urls = ReferenceScanner::default().candidates(doc);
        assert_eq!(
            urls,
            vec!["https://cdn.example.com/a.png", "https://cdn.example.com/b.jpg"]
        );
    }

    #[test]
    fn test_html_candidates() {
        let doc = r#"<p><IMG class="wide" SRC='https://cdn.example.com/c.gif' alt="c"></p>
<img
  src="https://cdn.example.com/d.webp">"#;
        let urls = ReferenceScanner::default().candidates(doc);
        assert_eq!(
            urls,
            vec!["https://cdn.example.com/c.gif", "https://cdn.example.com/d.webp"]
        );
    }

    #[test]
    fn test_bare_provider_candidates() {
        let doc = "Download: https://abc.supabase.co/storage/v1/object/public/media/e.png, thanks";
        let urls = ReferenceScanner::default().candidates(doc);
        assert_eq!(
            urls,
            vec!["https://abc.supabase.co/storage/v1/object/public/media/e.png"]
        );
    }

    #[test]
    fn test_replace_before_sentence_punctuation() {
        let doc = "Photo: https://x.io/a.png. Next: ![a](https://x.io/a)";
        let out = replace_references(
            doc,
            &[
                pair("https://x.io/a.png", "/images/content/1.png"),
                pair("https://x.io/a", "/images/content/2.jpg"),
            ],
        );
        assert_eq!(out, "Photo: /images/content/1.png. Next: ![a](/images/content/2.jpg)");
    }

    #[test]
    fn test_markdown_destination_with_balanced_parens() {
        let url = "https://upload.wikimedia.org/wikipedia/commons/a/a5/Gate_(Accra).jpg";
        let doc = format!("![gate]({url}) and ![gate again]({url} \"Accra\")");
        let urls = ReferenceScanner::default().candidates(&doc);
        assert_eq!(urls, vec![url]);

        let out = replace_references(&doc, &[pair(url, "/images/content/1.jpg")]);
        assert_eq!(
            out,
            "![gate](/images/content/1.jpg) and ![gate again](/images/content/1.jpg \"Accra\")"
        );
    }

    #[test]
    fn test_bare_provider_url_inside_emphasis() {
        let url = "https://abc.supabase.co/storage/v1/object/public/media/p.png";
        let doc = format!("Poster: **{url}** and _{url}_ and `{url}` and [{url}]");
        let urls = ReferenceScanner::default().candidates(&doc);
        assert_eq!(urls, vec![url]);

        let out = replace_references(&doc, &[pair(url, "/images/content/p.png")]);
        assert_eq!(
            out,
            "Poster: **/images/content/p.png** and _/images/content/p.png_ and `/images/content/p.png` and [/images/content/p.png]"
        );
    }

    #[test]
    fn test_replace_skips_url_embedded_in_another() {
        let doc = "![a](https://x.io/a.png) [archived](https://web.archive.org/web/2020/https://x.io/a.png)";
        let out = replace_references(doc, &[pair("https://x.io/a.png", "/images/content/1.png")]);
        assert_eq!(
            out,
            "![a](/images/content/1.png) [archived](https://web.archive.org/web/2020/https://x.io/a.png)"
        );
    }

    #[test]
    fn test_bare_urls_from_other_hosts_are_ignored() {
        let doc = "See https://cdn.example.com/storage/v1/f.png for details";
        assert!(ReferenceScanner::default().candidates(doc).is_empty());
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let doc = "![a](https://cdn.example.com/a.png) <img src=\"https://cdn.example.com/a.png\">";
        let urls = ReferenceScanner::default().candidates(doc);
        assert_eq!(urls, vec!["https://cdn.example.com/a.png"]);
    }

    #[test]
    fn test_provider_pattern_can_be_disabled() {
        let scanner = ReferenceScanner::new(Some("")).unwrap();
        let doc = "https://abc.supabase.co/storage/v1/object/public/media/e.png";
        assert!(scanner.candidates(doc).is_empty());
    }

    #[test]
    fn test_invalid_provider_pattern() {
        assert!(ReferenceScanner::new(Some("https://(")).is_err());
    }

    #[test]
    fn test_replace_all_occurrences() {
        let doc = "![a](https://x.io/a.png) caption: https://x.io/a.png\n<img src=\"https://x.io/a.png\">";
        let out = replace_references(doc, &[pair("https://x.io/a.png", "/images/content/1.png")]);
        assert_eq!(
            out,
            "![a](/images/content/1.png) caption: /images/content/1.png\n<img src=\"/images/content/1.png\">"
        );
    }

    #[test]
    fn test_replace_respects_token_boundary() {
        let doc = "![a](https://x.io/a.png) ![b](https://x.io/a.png?v=2)";
        let out = replace_references(doc, &[pair("https://x.io/a.png", "/images/content/1.png")]);
        assert_eq!(out, "![a](/images/content/1.png) ![b](https://x.io/a.png?v=2)");
    }

    #[test]
    fn test_replace_prefers_longest_match() {
        let doc = "![b](https://x.io/a.png?v=2) ![a](https://x.io/a.png)";
        let out = replace_references(
            doc,
            &[
                pair("https://x.io/a.png", "/images/content/1.png"),
                pair("https://x.io/a.png?v=2", "/images/content/2.png"),
            ],
        );
        assert_eq!(out, "![b](/images/content/2.png) ![a](/images/content/1.png)");
    }

    #[test]
    fn test_replace_without_edits_is_identity() {
        let doc = "nothing to see";
        assert_eq!(replace_references(doc, &[pair("https://x.io/a.png", "/p.png")]), doc);
        assert_eq!(replace_references(doc, &[]), doc);
    }
}
