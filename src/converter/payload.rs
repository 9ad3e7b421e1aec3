use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// A token travelling through the pipeline.
///
/// This is the value handed to the publisher by the surrounding engine and
/// the value a receiver gets back after decoding a message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Payload {
    /// Absence of a value.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A 64-bit signed integer (delivery tags arrive as this kind).
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw binary data (images, serialized models).
    Bytes(Vec<u8>),
    /// An ordered sequence of payloads.
    List(Vec<Payload>),
    /// A string-keyed map of payloads.
    Map(BTreeMap<String, Payload>),
}

/// The kind of a [`Payload`], used to describe what a converter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    List,
    Map,
}

impl PayloadKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [PayloadKind] = &[
        PayloadKind::Null,
        PayloadKind::Bool,
        PayloadKind::Int,
        PayloadKind::Float,
        PayloadKind::Text,
        PayloadKind::Bytes,
        PayloadKind::List,
        PayloadKind::Map,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Null => "null",
            PayloadKind::Bool => "bool",
            PayloadKind::Int => "int",
            PayloadKind::Float => "float",
            PayloadKind::Text => "text",
            PayloadKind::Bytes => "bytes",
            PayloadKind::List => "list",
            PayloadKind::Map => "map",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payload {
    /// Returns the kind of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Null => PayloadKind::Null,
            Payload::Bool(_) => PayloadKind::Bool,
            Payload::Int(_) => PayloadKind::Int,
            Payload::Float(_) => PayloadKind::Float,
            Payload::Text(_) => PayloadKind::Text,
            Payload::Bytes(_) => PayloadKind::Bytes,
            Payload::List(_) => PayloadKind::List,
            Payload::Map(_) => PayloadKind::Map,
        }
    }

    /// Returns the text if this is a `Text` payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int` payload.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Payload::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Converts the payload into a JSON value for display purposes.
    ///
    /// Binary data is rendered as an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Payload::Null => Json::Null,
            Payload::Bool(b) => Json::Bool(*b),
            Payload::Int(n) => Json::from(*n),
            Payload::Float(x) => Json::from(*x),
            Payload::Text(s) => Json::String(s.clone()),
            Payload::Bytes(b) => Json::Array(b.iter().map(|v| Json::from(*v)).collect()),
            Payload::List(items) => Json::Array(items.iter().map(Payload::to_json).collect()),
            Payload::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Int(value)
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}
