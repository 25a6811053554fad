// ABOUTME: Byte-level format sniffer that classifies buffers without fully parsing them.
// ABOUTME: JSON checks run before XML checks, with a partial-data escape hatch for JSON.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

use crate::models::FeedType;

/// Buffers below this size always classify as `Unknown`; callers should
/// retry once more bytes have arrived.
pub const MIN_SNIFF_BYTES: usize = 128;

/// How many leading bytes (after a BOM) may be whitespace before the first
/// meaningful character.
const LEADING_ALLOWANCE: usize = 4;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// The JSON Feed version marker, in literal and JSON-escaped-slash forms.
/// It can legally appear anywhere in the document, including the end.
static JSON_FEED_MARKERS: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(["jsonfeed.org/version/", r"jsonfeed.org\/version\/"])
        .expect("static patterns")
});

/// RSS-in-JSON has no version marker; all three tokens must be present.
static RSS_IN_JSON_TOKENS: Lazy<AhoCorasick> =
    Lazy::new(|| AhoCorasick::new(["rss", "channel", "item"]).expect("static patterns"));

/// XML root/element markers, checked in priority order by index:
/// 0 `<rss`, 1 `<rdf:RDF`, 2 `<channel>`, 3 `<pubDate`, 4 `<feed`.
static XML_MARKERS: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(["<rss", "<rdf:RDF", "<channel>", "<pubDate", "<feed"])
        .expect("static patterns")
});

/// Classifies a byte buffer, possibly from a download still in progress.
///
/// Never fails: `Unknown` and `NotAFeed` are valid answers. When
/// `is_partial` is true and the buffer is JSON-shaped, the answer is
/// `Unknown` rather than a guess, because the version marker may simply not
/// have arrived yet.
pub fn classify(data: &[u8], is_partial: bool) -> FeedType {
    if data.len() < MIN_SNIFF_BYTES {
        return FeedType::Unknown;
    }

    if is_json_shaped(data) {
        if is_partial {
            return FeedType::Unknown;
        }
        if JSON_FEED_MARKERS.is_match(data) {
            return FeedType::JsonFeed;
        }
        if contains_all_patterns(&RSS_IN_JSON_TOKENS, data, 3) {
            return FeedType::RssInJson;
        }
        return FeedType::NotAFeed;
    }

    let found = found_pattern_set(&XML_MARKERS, data);
    if found[0] || found[1] {
        return FeedType::Rss;
    }
    if found[2] && found[3] {
        return FeedType::Rss;
    }
    if found[4] {
        return FeedType::Atom;
    }

    FeedType::NotAFeed
}

/// True when the first non-whitespace byte (within the leading allowance,
/// BOM excluded) is `{`.
fn is_json_shaped(data: &[u8]) -> bool {
    let data = data.strip_prefix(&UTF8_BOM[..]).unwrap_or(data);
    for (i, b) in data.iter().enumerate() {
        if i > LEADING_ALLOWANCE {
            return false;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        return *b == b'{';
    }
    false
}

fn contains_all_patterns(ac: &AhoCorasick, data: &[u8], count: usize) -> bool {
    let mut seen = vec![false; count];
    for m in ac.find_overlapping_iter(data) {
        seen[m.pattern().as_usize()] = true;
        if seen.iter().all(|s| *s) {
            return true;
        }
    }
    false
}

fn found_pattern_set(ac: &AhoCorasick, data: &[u8]) -> [bool; 5] {
    let mut found = [false; 5];
    for m in ac.find_overlapping_iter(data) {
        found[m.pattern().as_usize()] = true;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(s: &str) -> Vec<u8> {
        // Pads a document past the sniffing threshold with trailing spaces.
        let mut v = s.as_bytes().to_vec();
        while v.len() < MIN_SNIFF_BYTES {
            v.push(b' ');
        }
        v
    }

    #[test]
    fn short_buffers_are_always_unknown() {
        assert_eq!(classify(b"", false), FeedType::Unknown);
        assert_eq!(classify(b"<rss version=\"2.0\">", false), FeedType::Unknown);
        assert_eq!(classify(b"{\"version\":\"x\"}", true), FeedType::Unknown);
        let just_under = vec![b'x'; MIN_SNIFF_BYTES - 1];
        assert_eq!(classify(&just_under, false), FeedType::Unknown);
    }

    #[test]
    fn classifies_rss() {
        let doc = padded("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>T</title></channel></rss>");
        assert_eq!(classify(&doc, false), FeedType::Rss);
    }

    #[test]
    fn classifies_rss_one_dot_zero() {
        let doc = padded("<?xml version=\"1.0\"?><rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\"></rdf:RDF>");
        assert_eq!(classify(&doc, false), FeedType::Rss);
    }

    #[test]
    fn classifies_rss_by_channel_and_pubdate() {
        let doc = padded(
            "<?xml version=\"1.0\"?><channel><title>T</title><pubDate>Mon, 15 Jan 2024 10:00:00 +0000</pubDate></channel>",
        );
        assert_eq!(classify(&doc, false), FeedType::Rss);
    }

    #[test]
    fn classifies_atom() {
        let doc = padded("<?xml version=\"1.0\"?><feed xmlns=\"http://www.w3.org/2005/Atom\"><title>T</title></feed>");
        assert_eq!(classify(&doc, false), FeedType::Atom);
    }

    #[test]
    fn classifies_json_feed() {
        let doc = padded(
            r#"{"version":"https://jsonfeed.org/version/1.1","title":"T","items":[{"id":"1","content_text":"hi"}]}"#,
        );
        assert_eq!(classify(&doc, false), FeedType::JsonFeed);
    }

    #[test]
    fn classifies_json_feed_with_escaped_slashes() {
        let doc = padded(
            r#"{"version":"https:\/\/jsonfeed.org\/version\/1.1","title":"T","items":[{"id":"1","content_text":"hi"}]}"#,
        );
        assert_eq!(classify(&doc, false), FeedType::JsonFeed);
    }

    #[test]
    fn partial_json_is_unknown_not_a_guess() {
        // The version marker could still arrive at the end of the document.
        let doc = padded(r#"{"title":"T","items":[{"id":"1","content_text":"hello there world"}]"#);
        assert_eq!(classify(&doc, true), FeedType::Unknown);
        assert_eq!(classify(&doc, false), FeedType::NotAFeed);
    }

    #[test]
    fn classifies_rss_in_json() {
        let doc = padded(
            r#"{"rss":{"version":"2.0","channel":{"title":"T","item":[{"guid":"1","title":"a"}]}}}"#,
        );
        assert_eq!(classify(&doc, false), FeedType::RssInJson);
    }

    #[test]
    fn html_is_not_a_feed() {
        let doc = padded("<!DOCTYPE html><html><head><title>Page</title></head><body><p>hello</p></body></html>");
        assert_eq!(classify(&doc, false), FeedType::NotAFeed);
    }

    #[test]
    fn bom_and_leading_whitespace_are_tolerated() {
        let mut doc = vec![0xEF, 0xBB, 0xBF, b' ', b'\n'];
        doc.extend_from_slice(
            r#"{"version":"https://jsonfeed.org/version/1.1","title":"T","items":[{"id":"1","content_text":"hi"}]}"#
                .as_bytes(),
        );
        while doc.len() < MIN_SNIFF_BYTES {
            doc.push(b' ');
        }
        assert_eq!(classify(&doc, false), FeedType::JsonFeed);
    }

    #[test]
    fn classification_is_stable_under_append() {
        let head = "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Feed</title><link>https://example.com</link><description>D</description>";
        let mut doc = head.as_bytes().to_vec();
        while doc.len() < MIN_SNIFF_BYTES {
            doc.extend_from_slice(b"<item><guid>x</guid></item>");
        }
        assert_eq!(classify(&doc, true), FeedType::Rss);
        doc.extend_from_slice(b"<item><guid>y</guid><title>More</title></item></channel></rss>");
        assert_eq!(classify(&doc, false), FeedType::Rss);
    }
}
