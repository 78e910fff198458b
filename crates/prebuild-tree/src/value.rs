//! The configuration value tree.

use std::fmt;

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Insertion-ordered, key-unique map of child values.
pub type Mapping = IndexMap<String, ValueTree>;

/// A parsed configuration value.
///
/// Every node owns its children exclusively. Mappings keep document order so
/// dumps are deterministic; equality compares mappings by key, not order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueTree {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<ValueTree>),
    Mapping(Mapping),
}

impl ValueTree {
    /// An empty mapping.
    pub fn mapping() -> Self {
        ValueTree::Mapping(Mapping::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueTree::Null)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, ValueTree::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, ValueTree::Sequence(_))
    }

    /// True for everything that is neither a mapping nor a sequence.
    pub fn is_scalar(&self) -> bool {
        !self.is_mapping() && !self.is_sequence()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueTree::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueTree::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueTree::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ValueTree::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ValueTree]> {
        match self {
            ValueTree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ValueTree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueTree::Null => "null",
            ValueTree::Bool(_) => "bool",
            ValueTree::Number(_) => "number",
            ValueTree::String(_) => "string",
            ValueTree::Sequence(_) => "sequence",
            ValueTree::Mapping(_) => "mapping",
        }
    }

    /// Indented JSON rendering.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<Value> for ValueTree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ValueTree::Null,
            Value::Bool(b) => ValueTree::Bool(b),
            Value::Number(n) => ValueTree::Number(n),
            Value::String(s) => ValueTree::String(s),
            Value::Array(items) => {
                ValueTree::Sequence(items.into_iter().map(ValueTree::from).collect())
            }
            Value::Object(map) => ValueTree::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, ValueTree::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<ValueTree> for Value {
    fn from(tree: ValueTree) -> Self {
        match tree {
            ValueTree::Null => Value::Null,
            ValueTree::Bool(b) => Value::Bool(b),
            ValueTree::Number(n) => Value::Number(n),
            ValueTree::String(s) => Value::String(s),
            ValueTree::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            ValueTree::Mapping(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ValueTree {
    fn from(s: &str) -> Self {
        ValueTree::String(s.to_string())
    }
}

impl From<String> for ValueTree {
    fn from(s: String) -> Self {
        ValueTree::String(s)
    }
}

impl From<bool> for ValueTree {
    fn from(b: bool) -> Self {
        ValueTree::Bool(b)
    }
}

impl From<i64> for ValueTree {
    fn from(n: i64) -> Self {
        ValueTree::Number(n.into())
    }
}

impl From<u64> for ValueTree {
    fn from(n: u64) -> Self {
        ValueTree::Number(n.into())
    }
}

impl From<Mapping> for ValueTree {
    fn from(map: Mapping) -> Self {
        ValueTree::Mapping(map)
    }
}

impl From<Vec<ValueTree>> for ValueTree {
    fn from(items: Vec<ValueTree>) -> Self {
        ValueTree::Sequence(items)
    }
}

impl Serialize for ValueTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValueTree::Null => serializer.serialize_unit(),
            ValueTree::Bool(b) => serializer.serialize_bool(*b),
            ValueTree::Number(n) => n.serialize(serializer),
            ValueTree::String(s) => serializer.serialize_str(s),
            ValueTree::Sequence(items) => items.serialize(serializer),
            ValueTree::Mapping(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ValueTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ValueTree::from)
    }
}

impl fmt::Display for ValueTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}
