// ABOUTME: Parsers for JSON Feed 1.x and RSS-in-JSON documents.
// ABOUTME: Tree-walks serde_json values; bad items are dropped, bad documents are errors.

use std::collections::HashSet;

use serde_json::Value;

use crate::dates::parse_date;
use crate::entities::decode_entities;
use crate::error::ParserError;
use crate::models::{
    FeedType, ParsedAttachment, ParsedAuthor, ParsedFeed, ParsedHub, ParsedItem,
};

const VERSION_MARKER: &str = "jsonfeed.org/version/";

/// Hosts known to ship entity-encoded titles in otherwise valid JSON Feeds.
const ENTITY_DECODE_HOSTS: &[&str] = &["daringfireball.net", "df4.us"];

pub(crate) fn parse(data: &[u8], feed_url: &str) -> Result<ParsedFeed, ParserError> {
    let root: Value = serde_json::from_slice(data)
        .map_err(|e| ParserError::MalformedMarkup(e.to_string()))?;

    let version = root
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !version.contains(VERSION_MARKER) {
        return Err(ParserError::MissingVersionMarker);
    }

    let title = string_field(&root, "title").ok_or(ParserError::MissingTitle)?;
    let raw_items = root
        .get("items")
        .and_then(Value::as_array)
        .ok_or(ParserError::MissingItems)?;

    let resolved_feed_url = string_field(&root, "feed_url").unwrap_or_else(|| feed_url.to_string());
    let home_page_url = string_field(&root, "home_page_url");

    let feed_authors = parse_authors(&root);
    let decode_titles = wants_entity_decoding(home_page_url.as_deref(), &resolved_feed_url);

    let mut items = HashSet::new();
    for raw in raw_items {
        if let Some(item) = parse_item(raw, &resolved_feed_url, &feed_authors, decode_titles) {
            items.insert(item);
        }
    }

    Ok(ParsedFeed {
        feed_type: FeedType::JsonFeed,
        title: Some(title),
        home_page_url,
        feed_url: resolved_feed_url,
        description: string_field(&root, "description"),
        next_url: string_field(&root, "next_url"),
        icon_url: string_field(&root, "icon"),
        favicon_url: string_field(&root, "favicon"),
        language: string_field(&root, "language"),
        expired: root.get("expired").and_then(Value::as_bool).unwrap_or(false),
        authors: feed_authors,
        hubs: parse_hubs(&root),
        items,
    })
}

pub(crate) fn parse_rss_in_json(data: &[u8], feed_url: &str) -> Result<ParsedFeed, ParserError> {
    let root: Value = serde_json::from_slice(data)
        .map_err(|e| ParserError::MalformedMarkup(e.to_string()))?;

    let channel = root
        .get("rss")
        .and_then(|rss| rss.get("channel"))
        .ok_or(ParserError::NotAFeed)?;

    let mut items = HashSet::new();
    // "item" is an array for most feeds but a bare object for one-item feeds.
    let raw_items: Vec<&Value> = match channel.get("item") {
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };
    for raw in raw_items {
        if let Some(item) = parse_rss_in_json_item(raw, feed_url) {
            items.insert(item);
        }
    }

    Ok(ParsedFeed {
        feed_type: FeedType::RssInJson,
        title: string_field(channel, "title"),
        home_page_url: string_field(channel, "link"),
        feed_url: feed_url.to_string(),
        description: string_field(channel, "description"),
        next_url: None,
        icon_url: None,
        favicon_url: None,
        language: string_field(channel, "language"),
        expired: false,
        authors: HashSet::new(),
        hubs: HashSet::new(),
        items,
    })
}

fn parse_item(
    raw: &Value,
    feed_url: &str,
    feed_authors: &HashSet<ParsedAuthor>,
    decode_titles: bool,
) -> Option<ParsedItem> {
    let unique_id = coerce_id(raw.get("id")?)?;

    let content_html = string_field(raw, "content_html");
    let content_text = string_field(raw, "content_text");
    if content_html.is_none() && content_text.is_none() {
        return None;
    }

    let mut title = string_field(raw, "title");
    if decode_titles {
        title = title.map(|t| decode_entities(&t));
    }

    // Items without their own authors inherit the feed's.
    let mut authors = parse_authors(raw);
    if authors.is_empty() {
        authors = feed_authors.clone();
    }

    let tags = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut attachments = HashSet::new();
    if let Some(arr) = raw.get("attachments").and_then(Value::as_array) {
        for a in arr {
            let url = string_field(a, "url").unwrap_or_default();
            if let Some(attachment) = ParsedAttachment::new(
                url,
                string_field(a, "mime_type"),
                string_field(a, "title"),
                a.get("size_in_bytes").and_then(Value::as_u64),
                a.get("duration_in_seconds").and_then(Value::as_u64),
            ) {
                attachments.insert(attachment);
            }
        }
    }

    Some(ParsedItem {
        unique_id,
        feed_url: feed_url.to_string(),
        url: string_field(raw, "url"),
        external_url: string_field(raw, "external_url"),
        title,
        content_html,
        content_text,
        summary: string_field(raw, "summary"),
        image_url: string_field(raw, "image"),
        banner_image_url: string_field(raw, "banner_image"),
        date_published: raw
            .get("date_published")
            .and_then(Value::as_str)
            .and_then(parse_date),
        date_modified: raw
            .get("date_modified")
            .and_then(Value::as_str)
            .and_then(parse_date),
        authors,
        tags,
        attachments,
    })
}

fn parse_rss_in_json_item(raw: &Value, feed_url: &str) -> Option<ParsedItem> {
    // guid is a string or an object with a "#value" payload.
    let guid = match raw.get("guid") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(obj @ Value::Object(_)) => string_field(obj, "#value"),
        _ => None,
    };
    let link = string_field(raw, "link");
    let unique_id = guid.or_else(|| link.clone()).filter(|id| !id.is_empty())?;

    let content_html = string_field(raw, "description")?;

    let mut authors = HashSet::new();
    if let Some(author) = string_field(raw, "author") {
        authors.insert(ParsedAuthor {
            name: Some(author),
            ..Default::default()
        });
    }

    let tags = match raw.get("category") {
        Some(Value::String(s)) => HashSet::from([s.clone()]),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => HashSet::new(),
    };

    let mut attachments = HashSet::new();
    if let Some(enclosure) = raw.get("enclosure") {
        let url = string_field(enclosure, "url").unwrap_or_default();
        if let Some(attachment) = ParsedAttachment::new(
            url,
            string_field(enclosure, "type"),
            None,
            enclosure.get("length").and_then(Value::as_u64),
            None,
        ) {
            attachments.insert(attachment);
        }
    }

    Some(ParsedItem {
        unique_id,
        feed_url: feed_url.to_string(),
        url: link,
        external_url: None,
        title: string_field(raw, "title"),
        content_html: Some(content_html),
        content_text: None,
        summary: None,
        image_url: None,
        banner_image_url: None,
        date_published: raw
            .get("pubDate")
            .and_then(Value::as_str)
            .and_then(parse_date),
        date_modified: None,
        authors,
        tags,
        attachments,
    })
}

/// JSON Feed 1.1 has an "authors" array; 1.0 has a single "author" object.
fn parse_authors(value: &Value) -> HashSet<ParsedAuthor> {
    let mut out = HashSet::new();

    let raw_authors: Vec<&Value> = match value.get("authors") {
        Some(Value::Array(arr)) => arr.iter().collect(),
        _ => match value.get("author") {
            Some(obj @ Value::Object(_)) => vec![obj],
            _ => Vec::new(),
        },
    };

    for raw in raw_authors {
        let author = ParsedAuthor {
            name: string_field(raw, "name"),
            url: string_field(raw, "url"),
            avatar_url: string_field(raw, "avatar"),
            email_address: None,
        };
        if !author.is_empty() {
            out.insert(author);
        }
    }

    out
}

fn parse_hubs(root: &Value) -> HashSet<ParsedHub> {
    let mut out = HashSet::new();
    if let Some(arr) = root.get("hubs").and_then(Value::as_array) {
        for raw in arr {
            let hub_type = string_field(raw, "type");
            let url = string_field(raw, "url");
            if let (Some(hub_type), Some(url)) = (hub_type, url) {
                out.insert(ParsedHub { hub_type, url });
            }
        }
    }
    out
}

/// Item ids are strings in well-formed feeds, but numbers show up in the
/// wild and must not sink the item.
fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(value: &Value, name: &str) -> Option<String> {
    value
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn wants_entity_decoding(home_page_url: Option<&str>, feed_url: &str) -> bool {
    let host_matches = |candidate: &str| {
        url::Url::parse(candidate)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .is_some_and(|host| {
                ENTITY_DECODE_HOSTS
                    .iter()
                    .any(|known| host == *known || host.ends_with(&format!(".{}", known)))
            })
    };
    home_page_url.is_some_and(host_matches) || host_matches(feed_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_URL: &str = "https://example.com/feed.json";

    fn item_by_id<'f>(feed: &'f ParsedFeed, id: &str) -> &'f ParsedItem {
        feed.items
            .iter()
            .find(|i| i.unique_id == id)
            .unwrap_or_else(|| panic!("no item with id {}", id))
    }

    #[test]
    fn parses_basic_json_feed() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "My Feed",
            "home_page_url": "https://example.com/",
            "feed_url": "https://example.com/real.json",
            "description": "things",
            "icon": "https://example.com/icon.png",
            "favicon": "https://example.com/favicon.ico",
            "language": "en",
            "authors": [{"name": "Jane", "url": "https://jane.example"}],
            "items": [
                {"id": "1", "url": "https://example.com/1", "title": "One",
                 "content_html": "<p>hi</p>", "date_published": "2024-01-15T10:00:00Z"},
                {"id": "2", "content_text": "plain"}
            ]
        }"#;

        let feed = parse(json.as_bytes(), FEED_URL).unwrap();
        assert_eq!(feed.feed_type, FeedType::JsonFeed);
        assert_eq!(feed.title.as_deref(), Some("My Feed"));
        assert_eq!(feed.feed_url, "https://example.com/real.json");
        assert_eq!(feed.icon_url.as_deref(), Some("https://example.com/icon.png"));
        assert_eq!(feed.items.len(), 2);

        let one = item_by_id(&feed, "1");
        assert_eq!(one.content_html.as_deref(), Some("<p>hi</p>"));
        assert!(one.date_published.is_some());
        // Inherited from the feed.
        assert_eq!(one.authors.len(), 1);
    }

    #[test]
    fn version_title_and_items_are_hard_requirements() {
        let no_version = r#"{"title":"T","items":[]}"#;
        assert!(matches!(
            parse(no_version.as_bytes(), FEED_URL).unwrap_err(),
            ParserError::MissingVersionMarker
        ));

        let no_title = r#"{"version":"https://jsonfeed.org/version/1.1","items":[]}"#;
        assert!(matches!(
            parse(no_title.as_bytes(), FEED_URL).unwrap_err(),
            ParserError::MissingTitle
        ));

        let no_items = r#"{"version":"https://jsonfeed.org/version/1.1","title":"T"}"#;
        assert!(matches!(
            parse(no_items.as_bytes(), FEED_URL).unwrap_err(),
            ParserError::MissingItems
        ));

        assert!(matches!(
            parse(b"{not json", FEED_URL).unwrap_err(),
            ParserError::MalformedMarkup(_)
        ));
    }

    #[test]
    fn numeric_ids_are_coerced_to_strings() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1",
            "title": "T",
            "items": [
                {"id": 42, "content_text": "int"},
                {"id": 4.5, "content_text": "float"}
            ]
        }"#;

        let feed = parse(json.as_bytes(), FEED_URL).unwrap();
        assert_eq!(feed.items.len(), 2);
        assert!(feed.items.iter().any(|i| i.unique_id == "42"));
        assert!(feed.items.iter().any(|i| i.unique_id == "4.5"));
    }

    #[test]
    fn items_without_id_or_content_are_dropped() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "T",
            "items": [
                {"content_text": "no id"},
                {"id": "no-content", "title": "headline only"},
                {"id": "ok", "content_text": "fine"}
            ]
        }"#;

        let feed = parse(json.as_bytes(), FEED_URL).unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items.iter().next().unwrap().unique_id, "ok");
    }

    #[test]
    fn item_authors_override_feed_authors() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "T",
            "author": {"name": "Feed Author"},
            "items": [
                {"id": "own", "content_text": "x", "authors": [{"name": "Item Author"}]},
                {"id": "inherited", "content_text": "y"}
            ]
        }"#;

        let feed = parse(json.as_bytes(), FEED_URL).unwrap();
        let own = item_by_id(&feed, "own");
        assert_eq!(
            own.authors.iter().next().unwrap().name.as_deref(),
            Some("Item Author")
        );
        let inherited = item_by_id(&feed, "inherited");
        assert_eq!(
            inherited.authors.iter().next().unwrap().name.as_deref(),
            Some("Feed Author")
        );
    }

    #[test]
    fn attachments_and_hubs() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "T",
            "hubs": [{"type": "WebSub", "url": "https://hub.example/"}],
            "items": [{
                "id": "ep",
                "content_text": "notes",
                "attachments": [
                    {"url": "https://cdn.example/ep.mp3", "mime_type": "audio/mpeg",
                     "size_in_bytes": 1000, "duration_in_seconds": 300},
                    {"mime_type": "audio/mpeg"}
                ]
            }]
        }"#;

        let feed = parse(json.as_bytes(), FEED_URL).unwrap();
        assert_eq!(feed.hubs.len(), 1);
        let item = item_by_id(&feed, "ep");
        // The url-less attachment was discarded.
        assert_eq!(item.attachments.len(), 1);
        let a = item.attachments.iter().next().unwrap();
        assert_eq!(a.duration_in_seconds, Some(300));
    }

    #[test]
    fn expired_flag_round_trips() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "T",
            "expired": true,
            "items": []
        }"#;
        let feed = parse(json.as_bytes(), FEED_URL).unwrap();
        assert!(feed.expired);
    }

    #[test]
    fn known_hosts_get_entity_decoded_titles() {
        let json = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "DF",
            "home_page_url": "https://daringfireball.net/",
            "items": [{"id": "1", "title": "It&#8217;s Fine", "content_html": "x"}]
        }"#;

        let feed = parse(json.as_bytes(), "https://daringfireball.net/feeds/json").unwrap();
        let item = item_by_id(&feed, "1");
        assert_eq!(item.title.as_deref(), Some("It\u{2019}s Fine"));

        // Everyone else's titles stay untouched.
        let other = r#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "T",
            "items": [{"id": "1", "title": "It&#8217;s Fine", "content_html": "x"}]
        }"#;
        let feed = parse(other.as_bytes(), FEED_URL).unwrap();
        assert_eq!(item_by_id(&feed, "1").title.as_deref(), Some("It&#8217;s Fine"));
    }

    #[test]
    fn parses_rss_in_json() {
        let json = r#"{
            "rss": {
                "version": "2.0",
                "channel": {
                    "title": "Scripting News",
                    "link": "http://scripting.com/",
                    "description": "blog",
                    "item": [
                        {"guid": "g1", "title": "Post", "link": "http://scripting.com/1",
                         "description": "<p>body</p>", "pubDate": "Mon, 15 Jan 2024 10:00:00 GMT",
                         "category": "essays",
                         "enclosure": {"url": "http://cdn.example/a.mp3", "type": "audio/mpeg", "length": 5}},
                        {"title": "no identity at all", "description": "x", "guid": null, "link": ""}
                    ]
                }
            }
        }"#;

        let feed = parse_rss_in_json(json.as_bytes(), FEED_URL).unwrap();
        assert_eq!(feed.feed_type, FeedType::RssInJson);
        assert_eq!(feed.title.as_deref(), Some("Scripting News"));
        assert_eq!(feed.items.len(), 1);

        let item = item_by_id(&feed, "g1");
        assert_eq!(item.content_html.as_deref(), Some("<p>body</p>"));
        assert!(item.tags.contains("essays"));
        assert_eq!(item.attachments.len(), 1);
        assert!(item.date_published.is_some());
    }

    #[test]
    fn rss_in_json_single_item_object() {
        let json = r##"{
            "rss": {"channel": {"title": "T", "item":
                {"guid": {"#value": "only"}, "description": "body"}}}
        }"##;

        let feed = parse_rss_in_json(json.as_bytes(), FEED_URL).unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items.iter().next().unwrap().unique_id, "only");
    }

    #[test]
    fn rss_in_json_without_channel_is_not_a_feed() {
        let err = parse_rss_in_json(br#"{"rss": {}}"#, FEED_URL).unwrap_err();
        assert!(matches!(err, ParserError::NotAFeed));
    }
}
