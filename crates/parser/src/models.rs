// ABOUTME: Canonical feed model shared by every format parser.
// ABOUTME: Value types with identity-based equality so collections de-duplicate correctly.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The syndication formats the sniffer can classify bytes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedType {
    Rss,
    Atom,
    JsonFeed,
    RssInJson,
    /// Not enough data to decide yet. Ask again with more bytes.
    Unknown,
    NotAFeed,
}

impl FeedType {
    /// True for the four concrete formats a parser exists for.
    pub fn is_feed(self) -> bool {
        matches!(
            self,
            FeedType::Rss | FeedType::Atom | FeedType::JsonFeed | FeedType::RssInJson
        )
    }
}

/// A parsed feed, independent of the source format.
///
/// Collections are unordered sets; parsers never promise insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedFeed {
    pub feed_type: FeedType,
    pub title: Option<String>,
    pub home_page_url: Option<String>,
    /// Where the feed itself lives. Falls back to the source URL when the
    /// document does not declare one.
    pub feed_url: String,
    pub description: Option<String>,
    pub next_url: Option<String>,
    pub icon_url: Option<String>,
    pub favicon_url: Option<String>,
    pub language: Option<String>,
    pub expired: bool,
    pub authors: HashSet<ParsedAuthor>,
    pub hubs: HashSet<ParsedHub>,
    pub items: HashSet<ParsedItem>,
}

/// A single entry within a feed.
///
/// Identity is `unique_id` scoped to a feed: two items with the same
/// `unique_id` are the same item, whatever their other fields say.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedItem {
    pub unique_id: String,
    pub feed_url: String,
    pub url: Option<String>,
    pub external_url: Option<String>,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub banner_image_url: Option<String>,
    pub date_published: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub authors: HashSet<ParsedAuthor>,
    pub tags: HashSet<String>,
    pub attachments: HashSet<ParsedAttachment>,
}

impl PartialEq for ParsedItem {
    fn eq(&self, other: &Self) -> bool {
        self.unique_id == other.unique_id
    }
}

impl Eq for ParsedItem {}

impl Hash for ParsedItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_id.hash(state);
    }
}

/// An author attached to a feed or an item. All fields are optional, but an
/// author with every field empty is useless and callers should not build one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedAuthor {
    pub name: Option<String>,
    pub url: Option<String>,
    pub avatar_url: Option<String>,
    pub email_address: Option<String>,
}

impl ParsedAuthor {
    /// The field used for de-duplication: name, else URL, else email,
    /// else avatar, in that priority order.
    pub fn identity(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.url.as_deref())
            .or(self.email_address.as_deref())
            .or(self.avatar_url.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.identity().is_none()
    }
}

impl PartialEq for ParsedAuthor {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ParsedAuthor {}

impl Hash for ParsedAuthor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// A media attachment (enclosure). Identity is the URL.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedAttachment {
    pub url: String,
    pub mime_type: Option<String>,
    pub title: Option<String>,
    pub size_in_bytes: Option<u64>,
    pub duration_in_seconds: Option<u64>,
}

impl ParsedAttachment {
    /// Construction is the validation gate: an empty URL yields no attachment.
    pub fn new(
        url: String,
        mime_type: Option<String>,
        title: Option<String>,
        size_in_bytes: Option<u64>,
        duration_in_seconds: Option<u64>,
    ) -> Option<Self> {
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url,
            mime_type,
            title,
            size_in_bytes,
            duration_in_seconds,
        })
    }
}

impl PartialEq for ParsedAttachment {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for ParsedAttachment {}

impl Hash for ParsedAttachment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// A publish/subscribe hub declaration. Identity is the (type, url) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParsedHub {
    pub hub_type: String,
    pub url: String,
}
