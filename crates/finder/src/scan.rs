// ABOUTME: HTML scanning for feed candidates: head alternate links, then feed-shaped anchors.
// ABOUTME: Kept synchronous on purpose; parsed documents never cross an await point.

use scraper::{Html, Selector};
use url::Url;

use crate::specifier::{CandidateSource, FeedSpecifier};

const FEED_MIME_TYPES: &[&str] = &[
    "application/rss+xml",
    "application/atom+xml",
    "application/feed+json",
    "application/json",
];

/// Extracts feed candidates from a page, head links first.
///
/// Relative hrefs resolve against `base_url`; anything that does not resolve
/// is skipped. Duplicate URLs keep their first (best-ranked) occurrence.
pub(crate) fn scan_html(html: &str, base_url: &Url) -> Vec<FeedSpecifier> {
    let doc = Html::parse_document(html);
    let mut out: Vec<FeedSpecifier> = Vec::new();
    let mut order: u32 = 0;

    if let Ok(selector) = Selector::parse(r#"link[rel="alternate"]"#) {
        for link in doc.select(&selector) {
            let mime = link.value().attr("type").unwrap_or_default().trim();
            if !FEED_MIME_TYPES.iter().any(|t| mime.eq_ignore_ascii_case(t)) {
                continue;
            }
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = base_url.join(href) else {
                continue;
            };
            let title = link
                .value()
                .attr("title")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            push_unique(
                &mut out,
                FeedSpecifier::new(title, resolved.to_string(), CandidateSource::HtmlHead, order),
            );
            order += 1;
        }
    }

    if let Ok(selector) = Selector::parse("a[href]") {
        for anchor in doc.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !looks_feed_shaped(href) {
                continue;
            }
            let Ok(resolved) = base_url.join(href) else {
                continue;
            };
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                continue;
            }
            let title = {
                let text = anchor.text().collect::<String>();
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            };
            push_unique(
                &mut out,
                FeedSpecifier::new(title, resolved.to_string(), CandidateSource::HtmlBody, order),
            );
            order += 1;
        }
    }

    out
}

/// First occurrence wins (head before body, earlier before later), but a
/// later duplicate may still donate a title the first one lacked.
fn push_unique(out: &mut Vec<FeedSpecifier>, specifier: FeedSpecifier) {
    if let Some(existing) = out.iter_mut().find(|s| s.url_string == specifier.url_string) {
        if existing.title.is_none() {
            existing.title = specifier.title;
        }
        return;
    }
    out.push(specifier);
}

/// Heuristic for body anchors. Head links are trusted by MIME type; anchors
/// only by the shape of their href.
fn looks_feed_shaped(href: &str) -> bool {
    let href = href.split(['?', '#']).next().unwrap_or(href);
    let lower = href.to_ascii_lowercase();
    let trimmed = lower.trim_end_matches('/');

    trimmed.ends_with(".xml")
        || trimmed.ends_with(".rss")
        || trimmed.ends_with(".atom")
        || trimmed.ends_with("/feed")
        || trimmed.ends_with("/rss")
        || trimmed.ends_with("/atom")
        || trimmed.ends_with("/feed.json")
        || lower.contains("/feeds/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(html: &str) -> Vec<FeedSpecifier> {
        let base = Url::parse("https://example.com/blog/").unwrap();
        scan_html(html, &base)
    }

    #[test]
    fn finds_head_alternate_links() {
        let html = r#"<html><head>
<link rel="alternate" type="application/rss+xml" title="Posts" href="/feed.xml">
<link rel="alternate" type="application/feed+json" href="https://example.com/feed.json">
<link rel="stylesheet" href="/style.css">
</head><body></body></html>"#;

        let found = scan(html);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url_string, "https://example.com/feed.xml");
        assert_eq!(found[0].title.as_deref(), Some("Posts"));
        assert_eq!(found[0].source, CandidateSource::HtmlHead);
        assert_eq!(found[0].order_found, 0);
        assert_eq!(found[1].order_found, 1);
    }

    #[test]
    fn finds_feed_shaped_body_anchors() {
        let html = r#"<html><body>
<a href="/about">About</a>
<a href="/index.xml">Subscribe</a>
<a href="https://example.com/feed/">RSS</a>
<a href="mailto:feed@example.com">mail</a>
</body></html>"#;

        let found = scan(html);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url_string, "https://example.com/index.xml");
        assert_eq!(found[0].source, CandidateSource::HtmlBody);
        assert_eq!(found[0].title.as_deref(), Some("Subscribe"));
        assert_eq!(found[1].url_string, "https://example.com/feed/");
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let html = r#"<html><head>
<link rel="alternate" type="application/rss+xml" href="/feed.xml">
</head><body>
<a href="/feed.xml">same feed again</a>
</body></html>"#;

        let found = scan(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, CandidateSource::HtmlHead);
        // The untitled head link picked up the anchor's text.
        assert_eq!(found[0].title.as_deref(), Some("same feed again"));
    }

    #[test]
    fn relative_hrefs_resolve_against_the_base() {
        let html = r#"<html><body><a href="archive/feed">feed</a></body></html>"#;
        let found = scan(html);
        assert_eq!(found[0].url_string, "https://example.com/blog/archive/feed");
    }

    #[test]
    fn wrong_mime_types_are_ignored_in_head() {
        let html = r#"<html><head>
<link rel="alternate" type="text/html" href="/translated.html">
</head></html>"#;
        assert!(scan(html).is_empty());
    }
}
