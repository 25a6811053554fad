// ABOUTME: OPML subscription-list parser producing a tree of outline items.
// ABOUTME: Attribute keys are stored lowercased so lookups survive casing drift.

use std::collections::HashMap;
use std::mem;

use crate::xml::{XmlEvent, XmlTokenizer};

/// A parsed OPML document: the head title plus the outline tree.
#[derive(Debug, Clone)]
pub struct OpmlDocument {
    pub title: Option<String>,
    /// Where the document was loaded from.
    pub url: String,
    pub items: Vec<OpmlItem>,
}

/// One `<outline>` node. A node is either a subscription (it has an
/// `xmlUrl`) or a folder (it has children), sometimes both.
#[derive(Debug, Clone, Default)]
pub struct OpmlItem {
    attributes: HashMap<String, String>,
    pub items: Vec<OpmlItem>,
}

impl OpmlItem {
    /// Attribute lookup, case-insensitive on the name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The display title: `text` wins, `title` is the fallback.
    pub fn title(&self) -> Option<&str> {
        self.attribute("text").or_else(|| self.attribute("title"))
    }

    pub fn xml_url(&self) -> Option<&str> {
        self.attribute("xmlUrl")
    }

    pub fn html_url(&self) -> Option<&str> {
        self.attribute("htmlUrl")
    }

    pub fn is_folder(&self) -> bool {
        !self.items.is_empty()
    }
}

/// Parses OPML bytes. Returns `None` when the document is not OPML at all;
/// an OPML document with zero usable outlines still parses.
pub fn parse_opml(data: &[u8], url: &str) -> Option<OpmlDocument> {
    let mut tokenizer = XmlTokenizer::new(data);

    let mut saw_root = false;
    let mut in_head = false;
    let mut capturing_title = false;
    let mut title_text = String::new();
    let mut title: Option<String> = None;

    // Index 0 is a synthetic root holding the top-level outlines.
    let mut stack: Vec<OpmlItem> = vec![OpmlItem::default()];

    loop {
        match tokenizer.next_event() {
            XmlEvent::Start { name, attributes } => {
                if !saw_root {
                    if !name.is(None, "opml") {
                        return None;
                    }
                    saw_root = true;
                    continue;
                }
                match name.local.as_str() {
                    "head" => in_head = true,
                    "title" if in_head => {
                        capturing_title = true;
                        title_text.clear();
                    }
                    "outline" => {
                        let attributes = attributes
                            .into_iter()
                            .map(|(k, v)| (k.to_ascii_lowercase(), v))
                            .collect();
                        stack.push(OpmlItem {
                            attributes,
                            items: Vec::new(),
                        });
                    }
                    _ => {}
                }
            }
            XmlEvent::Text(text) => {
                if capturing_title {
                    title_text.push_str(&text);
                }
            }
            XmlEvent::End { name } => match name.local.as_str() {
                "head" => in_head = false,
                "title" if capturing_title => {
                    capturing_title = false;
                    let value = mem::take(&mut title_text).trim().to_string();
                    if !value.is_empty() {
                        title = Some(value);
                    }
                }
                "outline" => {
                    if stack.len() > 1 {
                        let finished = stack.pop().unwrap_or_default();
                        // A node with neither a feed URL nor children carries
                        // no information; drop it.
                        if finished.xml_url().is_some() || !finished.items.is_empty() {
                            if let Some(parent) = stack.last_mut() {
                                parent.items.push(finished);
                            }
                        }
                    }
                }
                _ => {}
            },
            XmlEvent::Eof => break,
        }
    }

    if !saw_root {
        return None;
    }

    let root = stack.swap_remove(0);
    Some(OpmlDocument {
        title,
        url: url.to_string(),
        items: root.items,
    })
}
