//! Page property values in the shape the Notion API expects.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Notion rejects rich-text segments longer than this.
pub const RICH_TEXT_LIMIT: usize = 2000;

/// An ordered set of named property values for a page create/update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(self, name: &str, text: &str) -> Self {
        self.with(name, json!({ "title": [text_segment(text)] }))
    }

    pub fn rich_text(self, name: &str, text: &str) -> Self {
        self.with(name, json!({ "rich_text": [text_segment(text)] }))
    }

    /// `None` clears the column.
    pub fn url(self, name: &str, url: Option<&str>) -> Self {
        self.with(name, json!({ "url": url }))
    }

    pub fn number(self, name: &str, value: u64) -> Self {
        self.with(name, json!({ "number": value }))
    }

    /// `None` clears the column.
    pub fn date(self, name: &str, at: Option<DateTime<Utc>>) -> Self {
        let value = match at {
            Some(at) => json!({ "date": { "start": at.to_rfc3339_opts(SecondsFormat::Millis, true) } }),
            None => json!({ "date": null }),
        };
        self.with(name, value)
    }

    pub fn multi_select(self, name: &str, options: &[&str]) -> Self {
        let options: Vec<Value> = options.iter().map(|o| json!({ "name": o })).collect();
        self.with(name, json!({ "multi_select": options }))
    }

    /// Overlay `other` onto `self`; `other` wins on shared names.
    pub fn merge(mut self, other: Properties) -> Self {
        for (name, value) in other.0 {
            self.0.insert(name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn with(mut self, name: &str, value: Value) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }
}

fn text_segment(text: &str) -> Value {
    json!({ "text": { "content": clip(text, RICH_TEXT_LIMIT) } })
}

/// First `limit` characters of `text`, never splitting a code point.
fn clip(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
