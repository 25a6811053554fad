// ABOUTME: State-machine RSS parser (RSS 0.9x/2.0 and RSS 1.0 RDF) over the XML tokenizer.
// ABOUTME: Element meaning is scope-sensitive; unknown elements and prefixes are ignored.

use std::collections::HashSet;
use std::mem;

use crate::dates::parse_date;
use crate::error::ParserError;
use crate::models::{FeedType, ParsedAuthor, ParsedFeed, ParsedHub, ParsedItem};
use crate::xml::{attribute, ElementName, XmlEvent, XmlTokenizer};

pub(crate) fn parse(data: &[u8], feed_url: &str) -> Result<ParsedFeed, ParserError> {
    RssParser::new(data, feed_url).run()
}

/// In-progress item state. Finalized (moved) into the item set on `</item>`;
/// never a committed list entry before that.
#[derive(Default)]
struct ItemBuilder {
    guid: Option<String>,
    guid_is_permalink: bool,
    rdf_about: Option<String>,
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content_html: Option<String>,
    creator: Option<String>,
    author_text: Option<String>,
    pub_date: Option<String>,
    dc_date: Option<String>,
    tags: HashSet<String>,
    attachments: HashSet<crate::models::ParsedAttachment>,
}

struct RssParser<'a> {
    tokenizer: XmlTokenizer<'a>,
    feed_url: String,

    saw_root: bool,
    is_rdf: bool,
    in_channel: bool,
    in_item: bool,
    in_channel_image: bool,
    end_of_document: bool,

    capturing: bool,
    text: String,

    title: Option<String>,
    home_page_url: Option<String>,
    description: Option<String>,
    language: Option<String>,
    self_url: Option<String>,
    next_url: Option<String>,
    feed_authors: HashSet<ParsedAuthor>,
    hubs: HashSet<ParsedHub>,
    items: HashSet<ParsedItem>,
    current_item: Option<ItemBuilder>,
}

impl<'a> RssParser<'a> {
    fn new(data: &'a [u8], feed_url: &str) -> Self {
        Self {
            tokenizer: XmlTokenizer::new(data),
            feed_url: feed_url.to_string(),
            saw_root: false,
            is_rdf: false,
            in_channel: false,
            in_item: false,
            in_channel_image: false,
            end_of_document: false,
            capturing: false,
            text: String::new(),
            title: None,
            home_page_url: None,
            description: None,
            language: None,
            self_url: None,
            next_url: None,
            feed_authors: HashSet::new(),
            hubs: HashSet::new(),
            items: HashSet::new(),
            current_item: None,
        }
    }

    fn run(mut self) -> Result<ParsedFeed, ParserError> {
        loop {
            match self.tokenizer.next_event() {
                XmlEvent::Start { name, attributes } => {
                    if self.end_of_document {
                        continue;
                    }
                    self.handle_start(&name, &attributes)?;
                }
                XmlEvent::Text(text) => {
                    if self.capturing && !self.end_of_document {
                        self.text.push_str(&text);
                    }
                }
                XmlEvent::End { name } => {
                    if !self.end_of_document {
                        self.handle_end(&name);
                    }
                }
                XmlEvent::Eof => break,
            }
        }

        if !self.saw_root {
            return Err(ParserError::NotAFeed);
        }

        Ok(ParsedFeed {
            feed_type: FeedType::Rss,
            title: self.title,
            home_page_url: self.home_page_url,
            feed_url: self.self_url.unwrap_or(self.feed_url),
            description: self.description,
            next_url: self.next_url,
            icon_url: None,
            favicon_url: None,
            language: self.language,
            expired: false,
            authors: self.feed_authors,
            hubs: self.hubs,
            items: self.items,
        })
    }

    fn handle_start(
        &mut self,
        name: &ElementName,
        attributes: &[(String, String)],
    ) -> Result<(), ParserError> {
        if !self.saw_root {
            if name.is(None, "rss") {
                self.saw_root = true;
                return Ok(());
            }
            if name.is(Some("rdf"), "RDF") {
                self.saw_root = true;
                self.is_rdf = true;
                return Ok(());
            }
            return Err(ParserError::NotAFeed);
        }

        // The channel image block is discarded wholesale so its <title> and
        // <link> cannot clobber the channel's own.
        if self.in_channel_image {
            return Ok(());
        }

        match (name.prefix.as_deref(), name.local.as_str()) {
            (None, "channel") => self.in_channel = true,
            (None, "item") => {
                self.in_item = true;
                let mut builder = ItemBuilder {
                    guid_is_permalink: true,
                    ..Default::default()
                };
                if self.is_rdf {
                    // RSS 1.0 carries the item identity as an attribute.
                    builder.rdf_about = attribute(attributes, "rdf:about").map(str::to_string);
                }
                self.current_item = Some(builder);
            }
            (None, "image") if !self.in_item => self.in_channel_image = true,
            (None, "enclosure") if self.in_item => {
                let url = attribute(attributes, "url").unwrap_or_default().to_string();
                let mime_type = attribute(attributes, "type").map(str::to_string);
                let size = attribute(attributes, "length").and_then(|v| v.parse::<u64>().ok());
                if let Some(attachment) =
                    crate::models::ParsedAttachment::new(url, mime_type, None, size, None)
                {
                    if let Some(builder) = self.current_item.as_mut() {
                        builder.attachments.insert(attachment);
                    }
                }
            }
            (None, "guid") if self.in_item => {
                if let Some(builder) = self.current_item.as_mut() {
                    builder.guid_is_permalink = attribute(attributes, "isPermaLink")
                        .map(|v| !v.eq_ignore_ascii_case("false"))
                        .unwrap_or(true);
                }
                self.begin_capture();
            }
            (None, "category") if self.in_item => self.begin_capture(),
            (None, "title" | "link" | "description" | "pubDate" | "author") => self.begin_capture(),
            (None, "language" | "managingEditor") if !self.in_item => self.begin_capture(),
            (Some("content"), "encoded") if self.in_item => self.begin_capture(),
            (Some("dc"), "creator" | "date") => self.begin_capture(),
            (Some("atom"), "link") if !self.in_item => self.handle_atom_link(attributes),
            _ => {}
        }
        Ok(())
    }

    fn handle_end(&mut self, name: &ElementName) {
        match (name.prefix.as_deref(), name.local.as_str()) {
            (None, "rss") | (Some("rdf"), "RDF") => {
                // Anything after the logical close tag is malformed trailing
                // content and gets ignored.
                self.end_of_document = true;
            }
            (None, "channel") => self.in_channel = false,
            (None, "image") if self.in_channel_image => self.in_channel_image = false,
            (None, "item") if self.in_item => {
                self.capturing = false;
                self.text.clear();
                self.finalize_item();
                self.in_item = false;
            }
            (prefix, local) => {
                if !self.capturing {
                    return;
                }
                let value = mem::take(&mut self.text).trim().to_string();
                self.capturing = false;
                if value.is_empty() {
                    return;
                }
                if self.in_item {
                    self.assign_item_value(prefix, local, value);
                } else {
                    self.assign_channel_value(prefix, local, value);
                }
            }
        }
    }

    fn begin_capture(&mut self) {
        self.capturing = true;
        self.text.clear();
    }

    fn handle_atom_link(&mut self, attributes: &[(String, String)]) {
        let Some(href) = attribute(attributes, "href").filter(|h| !h.is_empty()) else {
            return;
        };
        match attribute(attributes, "rel") {
            Some("self") => self.self_url = Some(href.to_string()),
            Some("next") => self.next_url = Some(href.to_string()),
            Some("hub") => {
                self.hubs.insert(ParsedHub {
                    hub_type: "WebSub".to_string(),
                    url: href.to_string(),
                });
            }
            _ => {}
        }
    }

    fn assign_item_value(&mut self, prefix: Option<&str>, local: &str, value: String) {
        let Some(builder) = self.current_item.as_mut() else {
            return;
        };
        match (prefix, local) {
            (None, "title") => builder.title = Some(value),
            (None, "link") => builder.link = Some(value),
            (None, "guid") => builder.guid = Some(value),
            (None, "description") => builder.description = Some(value),
            (None, "pubDate") => builder.pub_date = Some(value),
            (None, "author") => builder.author_text = Some(value),
            (None, "category") => {
                builder.tags.insert(value);
            }
            (Some("content"), "encoded") => builder.content_html = Some(value),
            (Some("dc"), "creator") => builder.creator = Some(value),
            (Some("dc"), "date") => builder.dc_date = Some(value),
            _ => {}
        }
    }

    fn assign_channel_value(&mut self, prefix: Option<&str>, local: &str, value: String) {
        match (prefix, local) {
            (None, "title") => self.title = Some(value),
            (None, "link") => self.home_page_url = Some(value),
            (None, "description") => self.description = Some(value),
            (None, "language") => self.language = Some(value),
            (None, "managingEditor") => {
                if let Some(author) = author_from_rss_text(&value) {
                    self.feed_authors.insert(author);
                }
            }
            _ => {}
        }
    }

    fn finalize_item(&mut self) {
        let Some(builder) = self.current_item.take() else {
            return;
        };

        let unique_id = builder
            .guid
            .clone()
            .or_else(|| builder.rdf_about.clone())
            .or_else(|| builder.link.clone())
            .filter(|id| !id.is_empty());
        let Some(unique_id) = unique_id else {
            // No usable identity at all; drop this one item, keep the feed.
            return;
        };

        let mut url = builder.link.clone();
        if url.is_none() && builder.guid_is_permalink {
            url = builder.guid.clone().filter(|g| g.starts_with("http"));
        }
        if url.is_none() {
            url = builder.rdf_about.clone();
        }

        // <description> is the body unless <content:encoded> supplies one,
        // in which case it demotes to the summary.
        let (content_html, summary) = match builder.content_html {
            Some(html) => (Some(html), builder.description),
            None => (builder.description, None),
        };
        if content_html.is_none() {
            return;
        }

        let mut authors = HashSet::new();
        if let Some(creator) = builder.creator {
            authors.insert(ParsedAuthor {
                name: Some(creator),
                ..Default::default()
            });
        }
        if let Some(raw) = builder.author_text {
            if let Some(author) = author_from_rss_text(&raw) {
                authors.insert(author);
            }
        }

        let date_published = builder
            .pub_date
            .as_deref()
            .and_then(parse_date)
            .or_else(|| builder.dc_date.as_deref().and_then(parse_date));

        self.items.insert(ParsedItem {
            unique_id,
            feed_url: self.feed_url.clone(),
            url,
            external_url: None,
            title: builder.title,
            content_html,
            content_text: None,
            summary,
            image_url: None,
            banner_image_url: None,
            date_published,
            date_modified: None,
            authors,
            tags: builder.tags,
            attachments: builder.attachments,
        });
    }
}

/// RSS author elements are email-shaped: `editor@example.com (Jane Doe)`.
fn author_from_rss_text(raw: &str) -> Option<ParsedAuthor> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(open) = raw.find('(') {
        let email = raw[..open].trim();
        let name = raw[open + 1..].trim_end_matches(')').trim();
        return Some(ParsedAuthor {
            name: (!name.is_empty()).then(|| name.to_string()),
            email_address: (!email.is_empty()).then(|| email.to_string()),
            ..Default::default()
        });
    }

    if raw.contains('@') {
        return Some(ParsedAuthor {
            email_address: Some(raw.to_string()),
            ..Default::default()
        });
    }

    Some(ParsedAuthor {
        name: Some(raw.to_string()),
        ..Default::default()
    })
}
