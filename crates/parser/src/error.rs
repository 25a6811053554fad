// ABOUTME: Error types for feed parsing operations.
// ABOUTME: Document-level failures only; item-level defects drop the item, not the parse.

use thiserror::Error;

/// Errors a format parser can return.
///
/// Sniffing never fails; these surface only when a parser cannot produce a
/// usable feed at the document level.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The data is not any recognized feed format.
    #[error("data is not a recognized feed format")]
    NotAFeed,

    /// A JSON Feed without the jsonfeed.org version marker.
    #[error("json feed is missing its version marker")]
    MissingVersionMarker,

    /// A JSON Feed without a top-level title.
    #[error("feed is missing a title")]
    MissingTitle,

    /// A JSON Feed without a top-level items array.
    #[error("feed is missing its items")]
    MissingItems,

    /// The document could not be read at all (hopelessly broken JSON/XML).
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),
}
