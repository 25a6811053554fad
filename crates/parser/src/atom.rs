// ABOUTME: State-machine Atom parser over the XML tokenizer.
// ABOUTME: Reconstructs type="xhtml" content as raw markup instead of collapsing it to text.

use std::collections::HashSet;
use std::mem;

use crate::dates::parse_date;
use crate::error::ParserError;
use crate::models::{FeedType, ParsedAuthor, ParsedFeed, ParsedHub, ParsedItem};
use crate::xml::{attribute, ElementName, XmlEvent, XmlTokenizer};

pub(crate) fn parse(data: &[u8], feed_url: &str) -> Result<ParsedFeed, ParserError> {
    AtomParser::new(data, feed_url).run()
}

#[derive(Default)]
struct EntryBuilder {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    external_url: Option<String>,
    content_html: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    authors: HashSet<ParsedAuthor>,
    tags: HashSet<String>,
    attachments: HashSet<crate::models::ParsedAttachment>,
}

#[derive(Default)]
struct AuthorBuilder {
    name: Option<String>,
    uri: Option<String>,
    email: Option<String>,
}

impl AuthorBuilder {
    fn build(self) -> Option<ParsedAuthor> {
        let author = ParsedAuthor {
            name: self.name,
            url: self.uri,
            avatar_url: None,
            email_address: self.email,
        };
        (!author.is_empty()).then_some(author)
    }
}

struct AtomParser<'a> {
    tokenizer: XmlTokenizer<'a>,
    feed_url: String,

    saw_root: bool,
    in_entry: bool,
    in_author: bool,
    in_source: bool,
    end_of_document: bool,

    capturing: bool,
    text: String,

    // type="xhtml" content is captured as re-serialized markup.
    capturing_xhtml: bool,
    xhtml_depth: usize,
    xhtml_buf: String,

    title: Option<String>,
    description: Option<String>,
    home_page_url: Option<String>,
    self_url: Option<String>,
    next_url: Option<String>,
    icon_url: Option<String>,
    favicon_url: Option<String>,
    feed_authors: HashSet<ParsedAuthor>,
    hubs: HashSet<ParsedHub>,
    items: HashSet<ParsedItem>,
    current_entry: Option<EntryBuilder>,
    current_author: Option<AuthorBuilder>,
}

impl<'a> AtomParser<'a> {
    fn new(data: &'a [u8], feed_url: &str) -> Self {
        Self {
            tokenizer: XmlTokenizer::new(data),
            feed_url: feed_url.to_string(),
            saw_root: false,
            in_entry: false,
            in_author: false,
            in_source: false,
            end_of_document: false,
            capturing: false,
            text: String::new(),
            capturing_xhtml: false,
            xhtml_depth: 0,
            xhtml_buf: String::new(),
            title: None,
            description: None,
            home_page_url: None,
            self_url: None,
            next_url: None,
            icon_url: None,
            favicon_url: None,
            feed_authors: HashSet::new(),
            hubs: HashSet::new(),
            items: HashSet::new(),
            current_entry: None,
            current_author: None,
        }
    }

    fn run(mut self) -> Result<ParsedFeed, ParserError> {
        loop {
            match self.tokenizer.next_event() {
                XmlEvent::Start { name, attributes } => {
                    if self.end_of_document {
                        continue;
                    }
                    if self.capturing_xhtml {
                        self.xhtml_push_start(&name, &attributes);
                        continue;
                    }
                    self.handle_start(&name, &attributes)?;
                }
                XmlEvent::Text(text) => {
                    if self.end_of_document {
                        continue;
                    }
                    if self.capturing_xhtml {
                        self.xhtml_buf.push_str(&escape_markup(&text));
                    } else if self.capturing {
                        self.text.push_str(&text);
                    }
                }
                XmlEvent::End { name } => {
                    if self.end_of_document {
                        continue;
                    }
                    if self.capturing_xhtml {
                        self.xhtml_push_end(&name);
                        continue;
                    }
                    self.handle_end(&name);
                }
                XmlEvent::Eof => break,
            }
        }

        if !self.saw_root {
            return Err(ParserError::NotAFeed);
        }

        Ok(ParsedFeed {
            feed_type: FeedType::Atom,
            title: self.title,
            home_page_url: self.home_page_url,
            feed_url: self.self_url.unwrap_or(self.feed_url),
            description: self.description,
            next_url: self.next_url,
            icon_url: self.icon_url,
            favicon_url: self.favicon_url,
            language: None,
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
            if name.local == "feed" {
                self.saw_root = true;
                return Ok(());
            }
            return Err(ParserError::NotAFeed);
        }

        // An entry's <source> is a snapshot of another feed; its <id> and
        // <title> must not leak into the entry.
        if self.in_source {
            return Ok(());
        }

        match name.local.as_str() {
            "entry" => {
                self.in_entry = true;
                self.current_entry = Some(EntryBuilder::default());
            }
            "source" if self.in_entry => self.in_source = true,
            "author" => {
                self.in_author = true;
                self.current_author = Some(AuthorBuilder::default());
            }
            "name" | "uri" | "email" if self.in_author => self.begin_capture(),
            "link" => self.handle_link(attributes),
            "category" => {
                if self.in_entry {
                    if let Some(term) = attribute(attributes, "term").filter(|t| !t.is_empty()) {
                        if let Some(entry) = self.current_entry.as_mut() {
                            entry.tags.insert(term.to_string());
                        }
                    }
                }
            }
            "content" if self.in_entry => {
                if attribute(attributes, "type") == Some("xhtml") {
                    self.capturing_xhtml = true;
                    self.xhtml_depth = 0;
                    self.xhtml_buf.clear();
                } else {
                    self.begin_capture();
                }
            }
            "id" | "published" | "updated" | "summary" if self.in_entry => self.begin_capture(),
            "title" if !self.in_author => self.begin_capture(),
            "subtitle" | "icon" | "logo" if !self.in_entry => self.begin_capture(),
            _ => {}
        }
        Ok(())
    }

    fn handle_end(&mut self, name: &ElementName) {
        match name.local.as_str() {
            "feed" => self.end_of_document = true,
            "source" if self.in_source => self.in_source = false,
            "entry" if self.in_entry => {
                self.capturing = false;
                self.text.clear();
                self.finalize_entry();
                self.in_entry = false;
            }
            "author" if self.in_author => {
                self.in_author = false;
                if let Some(author) = self.current_author.take().and_then(AuthorBuilder::build) {
                    if self.in_entry {
                        if let Some(entry) = self.current_entry.as_mut() {
                            entry.authors.insert(author);
                        }
                    } else {
                        self.feed_authors.insert(author);
                    }
                }
            }
            local => {
                if !self.capturing {
                    return;
                }
                let value = mem::take(&mut self.text).trim().to_string();
                self.capturing = false;
                if value.is_empty() {
                    return;
                }
                self.assign_value(local, value);
            }
        }
    }

    fn begin_capture(&mut self) {
        self.capturing = true;
        self.text.clear();
    }

    fn assign_value(&mut self, local: &str, value: String) {
        if self.in_author {
            if let Some(author) = self.current_author.as_mut() {
                match local {
                    "name" => author.name = Some(value),
                    "uri" => author.uri = Some(value),
                    "email" => author.email = Some(value),
                    _ => {}
                }
            }
            return;
        }

        if self.in_entry {
            if let Some(entry) = self.current_entry.as_mut() {
                match local {
                    "id" => entry.id = Some(value),
                    "title" => entry.title = Some(value),
                    "published" => entry.published = Some(value),
                    "updated" => entry.updated = Some(value),
                    "summary" => entry.summary = Some(value),
                    "content" => entry.content_html = Some(value),
                    _ => {}
                }
            }
            return;
        }

        match local {
            "title" => self.title = Some(value),
            "subtitle" => self.description = Some(value),
            // Atom's <logo> is the large image, <icon> the small square one.
            "logo" => self.icon_url = Some(value),
            "icon" => self.favicon_url = Some(value),
            _ => {}
        }
    }

    fn handle_link(&mut self, attributes: &[(String, String)]) {
        let Some(href) = attribute(attributes, "href").filter(|h| !h.is_empty()) else {
            return;
        };
        let rel = attribute(attributes, "rel").unwrap_or("alternate");

        if self.in_entry {
            let Some(entry) = self.current_entry.as_mut() else {
                return;
            };
            match rel {
                "alternate" => entry.url = Some(href.to_string()),
                "related" => entry.external_url = Some(href.to_string()),
                "enclosure" => {
                    let mime_type = attribute(attributes, "type").map(str::to_string);
                    let size = attribute(attributes, "length").and_then(|v| v.parse::<u64>().ok());
                    let title = attribute(attributes, "title").map(str::to_string);
                    if let Some(attachment) = crate::models::ParsedAttachment::new(
                        href.to_string(),
                        mime_type,
                        title,
                        size,
                        None,
                    ) {
                        entry.attachments.insert(attachment);
                    }
                }
                _ => {}
            }
            return;
        }

        match rel {
            "alternate" => self.home_page_url = Some(href.to_string()),
            "self" => self.self_url = Some(href.to_string()),
            "next" => self.next_url = Some(href.to_string()),
            "hub" => {
                self.hubs.insert(ParsedHub {
                    hub_type: "WebSub".to_string(),
                    url: href.to_string(),
                });
            }
            _ => {}
        }
    }

    fn xhtml_push_start(&mut self, name: &ElementName, attributes: &[(String, String)]) {
        self.xhtml_depth += 1;
        self.xhtml_buf.push('<');
        self.xhtml_buf.push_str(&name.qualified());
        for (key, value) in attributes {
            self.xhtml_buf.push(' ');
            self.xhtml_buf.push_str(key);
            self.xhtml_buf.push_str("=\"");
            self.xhtml_buf.push_str(&escape_attribute(value));
            self.xhtml_buf.push('"');
        }
        self.xhtml_buf.push('>');
    }

    fn xhtml_push_end(&mut self, name: &ElementName) {
        if self.xhtml_depth == 0 {
            // This is </content> itself.
            self.capturing_xhtml = false;
            let markup = mem::take(&mut self.xhtml_buf).trim().to_string();
            if let Some(entry) = self.current_entry.as_mut() {
                if !markup.is_empty() {
                    entry.content_html = Some(markup);
                }
            }
            return;
        }
        self.xhtml_depth -= 1;
        self.xhtml_buf.push_str("</");
        self.xhtml_buf.push_str(&name.qualified());
        self.xhtml_buf.push('>');
    }

    fn finalize_entry(&mut self) {
        let Some(entry) = self.current_entry.take() else {
            return;
        };

        // No <id>, no entry. Unlike RSS there is no fallback identity here.
        let Some(unique_id) = entry.id.filter(|id| !id.is_empty()) else {
            return;
        };

        let (content_html, summary) = match entry.content_html {
            Some(html) => (Some(html), entry.summary),
            None => (entry.summary, None),
        };
        if content_html.is_none() {
            return;
        }

        self.items.insert(ParsedItem {
            unique_id,
            feed_url: self.feed_url.clone(),
            url: entry.url,
            external_url: entry.external_url,
            title: entry.title,
            content_html,
            content_text: None,
            summary,
            image_url: None,
            banner_image_url: None,
            date_published: entry.published.as_deref().and_then(parse_date),
            date_modified: entry.updated.as_deref().and_then(parse_date),
            authors: entry.authors,
            tags: entry.tags,
            attachments: entry.attachments,
        });
    }
}

fn escape_markup(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(s: &str) -> String {
    escape_markup(s).replace('"', "&quot;")
}
