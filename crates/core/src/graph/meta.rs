//! Open metadata records attached to nodes and edges.
//!
//! Metadata is an open JSON map rather than a closed enum so transports and
//! downstream consumers can add fields without schema churn. The typed
//! accessors here and the constructors on [`Node`](super::Node) keep the
//! per-kind required keys honest.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::location::{Position, Span};

/// Free-form metadata for a node or edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(Map<String, Value>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Store a span as `start`/`end` objects with `line` and `column`.
    pub fn set_span(&mut self, span: &Span) {
        self.set("start", position_value(&span.start));
        self.set("end", position_value(&span.end));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn position(&self, key: &str) -> Option<Position> {
        let obj = self.0.get(key)?.as_object()?;
        Some(Position {
            line: obj.get("line")?.as_u64()? as u32,
            column: obj.get("column")?.as_u64()? as u32,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Parse the JSON text stored in a `meta` column. `None`/empty → empty.
    pub fn from_column(text: Option<&str>) -> Self {
        match text {
            Some(t) if !t.is_empty() => serde_json::from_str(t).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Serialize for a `meta` column. Empty maps store NULL.
    pub fn to_column(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            serde_json::to_string(&self.0).ok()
        }
    }
}

fn position_value(pos: &Position) -> Value {
    let mut obj = Map::new();
    obj.insert("line".to_string(), Value::from(pos.line));
    obj.insert("column".to_string(), Value::from(pos.column));
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_round_trips_through_column_text() {
        let mut meta = Meta::new();
        meta.set_span(&Span::new(Position::new(3, 1), Position::new(9, 0)));
        meta.set("name", "handler");

        let text = meta.to_column().unwrap();
        let back = Meta::from_column(Some(&text));
        assert_eq!(back.position("start"), Some(Position::new(3, 1)));
        assert_eq!(back.position("end"), Some(Position::new(9, 0)));
        assert_eq!(back.str("name"), Some("handler"));
    }

    #[test]
    fn empty_meta_stores_null() {
        assert_eq!(Meta::new().to_column(), None);
        assert!(Meta::from_column(None).is_empty());
    }
}
