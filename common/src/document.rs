//! Read-only view over a parsed YAML document
//!
//! The compiler walks the document the way a generic tree parser exposes it: every node may
//! carry a key (when it is an entry of a mapping) and either a scalar value or children.
//! Mappings keep their entries in order and keep repeated keys, so callers decide what a
//! duplicate means at each level.

use std::borrow::Cow;

/// YAML document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Vec<(Value, Value)>),
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> serde::de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: serde::Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        serde::Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: serde::de::MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(Value::Mapping(entries))
    }
}

/// Parse YAML text into a document tree.
pub fn parse(text: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// A node of the document: an optional key together with the node's content.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    key: Option<&'a Value>,
    value: &'a Value,
}

impl<'a> Node<'a> {
    /// The document root (a node without a key).
    pub fn root(value: &'a Value) -> Self {
        Self { key: None, value }
    }

    pub fn is_map(&self) -> bool {
        matches!(self.value, Value::Mapping(_))
    }

    pub fn is_seq(&self) -> bool {
        matches!(self.value, Value::Sequence(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// True when the node holds a scalar (an empty string counts as a value, null does not).
    pub fn has_val(&self) -> bool {
        scalar_text(self.value).is_some()
    }

    pub fn key(&self) -> Option<Cow<'a, str>> {
        self.key.and_then(scalar_text)
    }

    pub fn key_is(&self, name: &str) -> bool {
        self.key().is_some_and(|key| key == name)
    }

    pub fn val(&self) -> Option<Cow<'a, str>> {
        scalar_text(self.value)
    }

    /// The scalar value as a decimal integer, if it is one.
    pub fn val_integer(&self) -> Option<i64> {
        match self.value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Child lookup by key (mappings only).
    pub fn get(&self, name: &str) -> Option<Node<'a>> {
        self.children().find(|child| child.key_is(name))
    }

    /// Mapping entries come back with their keys, sequence items without; scalars have no
    /// children.
    pub fn children(&self) -> Children<'a> {
        match self.value {
            Value::Mapping(mapping) => Children::Mapping(mapping.iter()),
            Value::Sequence(sequence) => Children::Sequence(sequence.iter()),
            _ => Children::Empty,
        }
    }
}

pub enum Children<'a> {
    Mapping(std::slice::Iter<'a, (Value, Value)>),
    Sequence(std::slice::Iter<'a, Value>),
    Empty,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Children::Mapping(entries) => entries.next().map(|(key, value)| Node {
                key: Some(key),
                value,
            }),
            Children::Sequence(items) => items.next().map(|value| Node { key: None, value }),
            Children::Empty => None,
        }
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(text) => Some(Cow::Borrowed(text.as_str())),
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        Value::Bool(flag) => Some(Cow::Owned(flag.to_string())),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
