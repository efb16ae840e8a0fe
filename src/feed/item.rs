use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use thiserror::Error;

use crate::util::validate_absolute_url;

/// Media attachment of a feed entry (the article's cover image on Zenn).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    /// Size in bytes. Feeds emit it as an attribute string; it is always a
    /// JSON number once validated. Integral input stays integral.
    pub length: Number,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// One validated feed entry, as published to the store.
///
/// Serializes with the field names used on the wire (`pubDate`,
/// `dc:creator`, `contentSnippet`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub creator: String,
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub enclosure: Enclosure,
    #[serde(rename = "dc:creator")]
    pub dc_creator: String,
    pub content: String,
    #[serde(rename = "contentSnippet")]
    pub content_snippet: String,
    pub guid: String,
    #[serde(rename = "isoDate")]
    pub iso_date: String,
}

/// A single reason a value failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted path to the offending field, e.g. `enclosure.length`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every issue found while validating one value.
///
/// Validation does not stop at the first problem; all fields are checked so
/// the diagnostic lists everything wrong with an entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

fn format_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(Issue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates issues for one object, prefixing paths with the object's own.
struct Checker<'a> {
    object: Option<&'a serde_json::Map<String, Value>>,
    prefix: &'a str,
    issues: Vec<Issue>,
}

impl<'a> Checker<'a> {
    fn new(value: &'a Value, prefix: &'a str) -> Self {
        let mut checker = Self {
            object: value.as_object(),
            prefix,
            issues: Vec::new(),
        };
        if checker.object.is_none() {
            checker.issues.push(Issue {
                path: prefix.to_string(),
                message: format!("expected object, received {}", type_name(value)),
            });
        }
        checker
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    fn fail(&mut self, key: &str, message: impl Into<String>) {
        let path = self.path(key);
        self.issues.push(Issue {
            path,
            message: message.into(),
        });
    }

    fn field(&self, key: &str) -> Option<&'a Value> {
        self.object.and_then(|o| o.get(key))
    }

    /// Required string field.
    fn string(&mut self, key: &str) -> Option<String> {
        // The whole object is already reported when it is not an object
        self.object?;
        match self.field(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                let message = format!("expected string, received {}", type_name(other));
                self.fail(key, message);
                None
            }
            None => {
                self.fail(key, "required");
                None
            }
        }
    }

    /// Required string field holding an absolute URL.
    fn url(&mut self, key: &str) -> Option<String> {
        let s = self.string(key)?;
        match validate_absolute_url(&s) {
            Ok(_) => Some(s),
            Err(e) => {
                self.fail(key, format!("invalid url ({})", e));
                None
            }
        }
    }

    /// Required string field holding a `YYYY-MM-DDTHH:MM:SS[.fff]Z` timestamp.
    fn datetime(&mut self, key: &str) -> Option<String> {
        let s = self.string(key)?;
        if is_iso_datetime(&s) {
            Some(s)
        } else {
            self.fail(key, "invalid datetime");
            None
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(ValidationError {
                issues: self.issues,
            }),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerces an enclosure length to a JSON number.
///
/// Accepts any JSON number, or a string whose trimmed content parses as a
/// finite number (`"12345"`, `"12.5"`, `"1e3"`, `"-1"`). Integer strings
/// stay integers. Empty, non-numeric and non-finite strings are rejected
/// rather than silently becoming zero.
pub fn coerce_length(value: &Value) -> Result<Number, String> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        Value::String(s) => parse_number(s.trim())
            .ok_or_else(|| format!("expected numeric string, received {:?}", s)),
        other => Err(format!(
            "expected string or number, received {}",
            type_name(other)
        )),
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<u64>() {
        return Some(n.into());
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(n.into());
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Strict ISO-8601 date-time check: `YYYY-MM-DDTHH:MM:SS`, an optional
/// fraction, and a literal `Z`. Offsets and date-only strings are rejected.
fn is_iso_datetime(s: &str) -> bool {
    let Some(body) = s.strip_suffix('Z') else {
        return false;
    };
    let bytes = body.as_bytes();
    if bytes.len() < 19 {
        return false;
    }
    let shape_ok = bytes[..19].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b'T',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return false;
    }
    let fraction = &bytes[19..];
    if !fraction.is_empty()
        && (fraction[0] != b'.'
            || fraction.len() == 1
            || !fraction[1..].iter().all(u8::is_ascii_digit))
    {
        return false;
    }
    // Shape is right; reject impossible dates such as 2024-02-30
    NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Validates an enclosure object.
///
/// `url` must be an absolute URL, `type` a string, and `length` a number or
/// numeric string (normalized to a number, see [`coerce_length`]).
pub fn validate_enclosure(value: &Value) -> Result<Enclosure, ValidationError> {
    validate_enclosure_at(value, "")
}

fn validate_enclosure_at(value: &Value, prefix: &str) -> Result<Enclosure, ValidationError> {
    let mut check = Checker::new(value, prefix);

    let url = check.url("url");
    let length = if check.object.is_some() {
        match check.field("length") {
            Some(raw) => match coerce_length(raw) {
                Ok(n) => Some(n),
                Err(message) => {
                    check.fail("length", message);
                    None
                }
            },
            None => {
                check.fail("length", "required");
                None
            }
        }
    } else {
        None
    };
    let mime_type = check.string("type");

    let enclosure = match (url, length, mime_type) {
        (Some(url), Some(length), Some(mime_type)) => Some(Enclosure {
            url,
            length,
            mime_type,
        }),
        _ => None,
    };
    check.finish(enclosure)
}

/// Validates a raw feed entry, reporting every failing field.
///
/// All string fields are required, `link` must be an absolute URL, `isoDate`
/// a strict ISO-8601 timestamp, and `enclosure` must be present and valid.
/// Fields not in the schema (`categories`, `content:encoded`, ...) are
/// dropped.
pub fn validate_item(value: &Value) -> Result<FeedItem, ValidationError> {
    let mut check = Checker::new(value, "");

    let creator = check.string("creator");
    let title = check.string("title");
    let link = check.url("link");
    let pub_date = check.string("pubDate");
    let enclosure = match check.field("enclosure") {
        Some(raw) => match validate_enclosure_at(raw, "enclosure") {
            Ok(enclosure) => Some(enclosure),
            Err(e) => {
                check.issues.extend(e.issues);
                None
            }
        },
        None => {
            if check.object.is_some() {
                check.fail("enclosure", "required");
            }
            None
        }
    };
    let dc_creator = check.string("dc:creator");
    let content = check.string("content");
    let content_snippet = check.string("contentSnippet");
    let guid = check.string("guid");
    let iso_date = check.datetime("isoDate");

    let item = (|| {
        Some(FeedItem {
            creator: creator?,
            title: title?,
            link: link?,
            pub_date: pub_date?,
            enclosure: enclosure?,
            dc_creator: dc_creator?,
            content: content?,
            content_snippet: content_snippet?,
            guid: guid?,
            iso_date: iso_date?,
        })
    })();
    check.finish(item)
}

/// Best-effort identifier of a raw entry for diagnostics.
///
/// Uses `guid` when it is a string, number or boolean; `"unknown"` otherwise.
pub fn item_id(value: &Value) -> String {
    match value.get("guid") {
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Validates one raw entry, logging and discarding it when invalid.
///
/// Returns `None` instead of an error so the caller can count the rejection
/// and move on to the next entry.
pub fn process_item(value: &Value) -> Option<FeedItem> {
    match validate_item(value) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(
                guid = %item_id(value),
                issues = e.issues.len(),
                error = %e,
                "Failed to parse RSS item"
            );
            None
        }
    }
}
