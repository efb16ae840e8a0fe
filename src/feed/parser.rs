use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::util::html_to_snippet;

/// Errors that can occur while parsing a feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed XML, or ends before its channel does.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The document is XML but its root is not `<rss>`.
    #[error("Feed not recognized as RSS 2.0")]
    NotRss,
}

impl From<rss::Error> for ParseError {
    fn from(err: rss::Error) -> Self {
        match err {
            rss::Error::InvalidStartTag => ParseError::NotRss,
            rss::Error::Eof => ParseError::Xml("unexpected end of document".to_string()),
            other => ParseError::Xml(other.to_string()),
        }
    }
}

/// A parsed feed whose items have not been validated yet.
///
/// Items are kept as loose JSON objects so that the validator decides what
/// a well-formed entry is. Keys follow the usual RSS-to-JSON naming:
/// `title`, `link`, `pubDate`, `guid`, `dc:creator`, `creator`, `content`,
/// `content:encoded`, `contentSnippet`, `isoDate`, `enclosure`, `categories`.
#[derive(Debug, Clone, Default)]
pub struct RawFeed {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub items: Vec<Value>,
}

/// Parses an RSS 2.0 document.
///
/// Entries are returned in document order. A channel without `<item>`
/// elements yields an empty item list rather than an error.
///
/// # Errors
///
/// - [`ParseError::Xml`] if the bytes are not well-formed XML or contain no
///   complete `<channel>`
/// - [`ParseError::NotRss`] if the root element is not `<rss>`
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeed, ParseError> {
    // SEC-002: the underlying quick-xml reader never expands <!ENTITY>
    // declarations, only the five XML builtins.
    let channel = rss::Channel::read_from(bytes)?;
    Ok(raw_feed(&channel))
}

/// Converts a parsed channel into a [`RawFeed`].
fn raw_feed(channel: &rss::Channel) -> RawFeed {
    RawFeed {
        title: non_empty(channel.title()),
        link: non_empty(channel.link()),
        description: non_empty(channel.description()),
        items: channel.items().iter().map(raw_item).collect(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Renders one `<item>` as a JSON object, omitting absent fields.
fn raw_item(item: &rss::Item) -> Value {
    let mut fields = Map::new();
    let mut put = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            fields.insert(key.to_string(), Value::String(value.to_string()));
        }
    };

    put("title", item.title());
    put("link", item.link());
    put("pubDate", item.pub_date());
    put("guid", item.guid().map(|g| g.value()));
    put("author", item.author());
    put("comments", item.comments());
    put("content", item.description());
    put("content:encoded", item.content());

    let creator = dc_creator(item);
    put("dc:creator", creator);
    put("creator", creator);

    if let Some(snippet) = item.description().map(html_to_snippet) {
        fields.insert("contentSnippet".to_string(), Value::String(snippet));
    }
    if let Some(iso_date) = item.pub_date().and_then(to_iso_date) {
        fields.insert("isoDate".to_string(), Value::String(iso_date));
    }
    if let Some(enclosure) = item.enclosure() {
        fields.insert("enclosure".to_string(), enclosure_object(enclosure));
    }
    if !item.categories().is_empty() {
        let categories = item
            .categories()
            .iter()
            .map(|c| Value::String(c.name().to_string()))
            .collect();
        fields.insert("categories".to_string(), Value::Array(categories));
    }

    Value::Object(fields)
}

/// First `dc:creator` of an item.
///
/// Falls back to the raw extension map for feeds that use the `dc` prefix
/// without binding it to the Dublin Core namespace.
fn dc_creator(item: &rss::Item) -> Option<&str> {
    if let Some(creator) = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first())
    {
        return Some(creator.as_str());
    }
    item.extensions()
        .get("dc")
        .and_then(|ext| ext.get("creator"))
        .and_then(|values| values.first())
        .and_then(|ext| ext.value())
}

/// Enclosure attributes as strings; attributes missing from the element are
/// left out so validation reports them as required.
fn enclosure_object(enclosure: &rss::Enclosure) -> Value {
    let mut object = Map::new();
    for (key, value) in [
        ("url", enclosure.url()),
        ("length", enclosure.length()),
        ("type", enclosure.mime_type()),
    ] {
        if !value.is_empty() {
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(object)
}

/// Renders an RSS date as a UTC ISO-8601 timestamp with millisecond precision.
///
/// RFC 2822 is the RSS date format; RFC 3339 is accepted too because some
/// generators emit it. Returns `None` for anything else.
fn to_iso_date(date: &str) -> Option<String> {
    let date = date.trim();
    let parsed = DateTime::parse_from_rfc2822(date)
        .or_else(|_| DateTime::parse_from_rfc3339(date))
        .ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}
