//! Minimal RSS 2.0 / Atom parsing for the news and research sources.
//!
//! Only the fields RAYA uses are kept: title, link, date and summary.
//! `<item>` (RSS) and `<entry>` (Atom) are both treated as entries; text and
//! CDATA content are concatenated; an Atom `<link href="..."/>` fills the
//! link when no text link was seen first. Namespaced children such as
//! `<media:title>` are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::traits::SourceError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub updated: String,
    pub summary: String,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Updated,
    Summary,
}

impl FeedEntry {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Updated => &mut self.updated,
            Field::Summary => &mut self.summary,
        };
        target.push_str(text);
    }

    fn finish(mut self) -> Self {
        self.title = collapse(&self.title);
        self.link = self.link.trim().to_string();
        self.updated = self.updated.trim().to_string();
        self.summary = collapse(&self.summary);
        self
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn href(e: &BytesStart) -> Option<String> {
    e.try_get_attribute("href")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse a feed document into its entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().prefix().is_some() => field = None,
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    current = Some(FeedEntry::default());
                    field = None;
                }
                b"title" => field = Some(Field::Title),
                b"link" => match (current.as_mut(), href(&e)) {
                    (Some(entry), Some(h)) => {
                        if entry.link.is_empty() {
                            entry.link = h;
                        }
                        field = None;
                    }
                    _ => field = Some(Field::Link),
                },
                b"updated" | b"published" | b"pubDate" => field = Some(Field::Updated),
                b"summary" | b"description" => field = Some(Field::Summary),
                _ => field = None,
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let (Some(entry), Some(h)) = (current.as_mut(), href(&e)) {
                        if entry.link.is_empty() {
                            entry.link = h;
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    entry.push(f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    entry.push(f, &String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry.finish());
                    }
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}
