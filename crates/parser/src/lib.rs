// ABOUTME: Core feed parsing library for feedsift.
// ABOUTME: Provides format sniffing, RSS/Atom/JSON Feed/RSS-in-JSON parsing, and OPML reading.

pub mod dates;
pub mod entities;
pub mod error;
pub mod models;
pub mod opml;
pub mod sniffer;
pub mod xml;

mod atom;
mod json_feed;
mod rss;

pub use dates::parse_date;
pub use entities::decode_entities;
pub use error::ParserError;
pub use models::{
    FeedType, ParsedAttachment, ParsedAuthor, ParsedFeed, ParsedHub, ParsedItem,
};
pub use opml::{parse_opml, OpmlDocument, OpmlItem};
pub use sniffer::{classify, MIN_SNIFF_BYTES};

/// Sniffs the buffer and runs the matching format parser.
///
/// `feed_url` is where the bytes came from; it becomes the fallback
/// `feed_url` of the result and the `feed_url` stamped on every item.
/// Buffers that sniff as `Unknown` or `NotAFeed` fail with
/// [`ParserError::NotAFeed`].
pub fn parse_feed(data: &[u8], feed_url: &str) -> Result<ParsedFeed, ParserError> {
    match sniffer::classify(data, false) {
        FeedType::Rss => rss::parse(data, feed_url),
        FeedType::Atom => atom::parse(data, feed_url),
        FeedType::JsonFeed => json_feed::parse(data, feed_url),
        FeedType::RssInJson => json_feed::parse_rss_in_json(data, feed_url),
        FeedType::Unknown | FeedType::NotAFeed => Err(ParserError::NotAFeed),
    }
}
