// ABOUTME: Pull-based XML tokenizer over a byte buffer, built on quick-xml.
// ABOUTME: Emits start/end/text events with no semantic interpretation; never panics on garbage.

use std::collections::VecDeque;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::entities::decode_entities;

/// An element name split into namespace prefix and local part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementName {
    pub prefix: Option<String>,
    pub local: String,
}

impl ElementName {
    fn from_qname(raw: &[u8]) -> Self {
        let full = String::from_utf8_lossy(raw);
        match full.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => Self {
                prefix: None,
                local: full.into_owned(),
            },
        }
    }

    /// Matches both the prefix and the local name.
    pub fn is(&self, prefix: Option<&str>, local: &str) -> bool {
        self.prefix.as_deref() == prefix && self.local == local
    }

    /// The name as written in the document, `prefix:local` or just `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// One tokenizer event. Format parsers consume these in a loop.
#[derive(Debug)]
pub enum XmlEvent {
    Start {
        name: ElementName,
        attributes: Vec<(String, String)>,
    },
    End {
        name: ElementName,
    },
    Text(String),
    Eof,
}

/// Single-pass tokenizer over an XML byte buffer.
///
/// Empty elements are expanded into a Start followed by a synthesized End, so
/// parsers only ever see balanced pairs. quick-xml splits character data at
/// every entity reference; the fragments are resolved and glued back into a
/// single Text event, untrimmed — whitespace is the consumer's call. Read
/// errors terminate the stream as Eof: aborting on malformed markup is not
/// acceptable for real-world feeds.
pub struct XmlTokenizer<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    pending: VecDeque<XmlEvent>,
    done: bool,
}

impl<'a> XmlTokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: Reader::from_reader(data),
            buf: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    pub fn next_event(&mut self) -> XmlEvent {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        if self.done {
            return XmlEvent::Eof;
        }

        // Accumulate text fragments until the next structural event; that
        // event waits in the queue behind the coalesced text.
        let mut text = String::new();
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Text(ref e)) => {
                    let raw = e.decode().map(|s| s.into_owned()).unwrap_or_default();
                    text.push_str(&decode_entities(&raw));
                }
                Ok(Event::GeneralRef(ref e)) => {
                    // The reference body without its `&`/`;` framing.
                    // Unresolvable references pass through verbatim.
                    let name = String::from_utf8_lossy(e).into_owned();
                    text.push_str(&decode_entities(&format!("&{};", name)));
                }
                Ok(Event::CData(ref e)) => {
                    // CDATA is literal content; entities inside it stay as-is.
                    text.push_str(&String::from_utf8_lossy(e));
                }
                Ok(Event::Start(ref e)) => {
                    let name = ElementName::from_qname(e.name().as_ref());
                    let attributes = read_attributes(e);
                    self.pending.push_back(XmlEvent::Start { name, attributes });
                    break;
                }
                Ok(Event::Empty(ref e)) => {
                    let name = ElementName::from_qname(e.name().as_ref());
                    let attributes = read_attributes(e);
                    self.pending.push_back(XmlEvent::Start {
                        name: name.clone(),
                        attributes,
                    });
                    self.pending.push_back(XmlEvent::End { name });
                    break;
                }
                Ok(Event::End(ref e)) => {
                    let name = ElementName::from_qname(e.name().as_ref());
                    self.pending.push_back(XmlEvent::End { name });
                    break;
                }
                Ok(Event::Eof) | Err(_) => {
                    self.done = true;
                    break;
                }
                // Declarations, comments, processing instructions, doctypes.
                Ok(_) => continue,
            }
        }

        if !text.is_empty() {
            return XmlEvent::Text(text);
        }
        self.pending.pop_front().unwrap_or(XmlEvent::Eof)
    }
}

fn read_attributes(e: &quick_xml::events::BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = decode_entities(&String::from_utf8_lossy(&attr.value));
            (key, value)
        })
        .collect()
}

/// Looks up an attribute by name, ignoring ASCII case.
pub fn attribute<'v>(attributes: &'v [(String, String)], name: &str) -> Option<&'v str> {
    attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
