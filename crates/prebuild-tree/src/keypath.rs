//! Keypath grammar and traversal.
//!
//! Grammar:
//!
//! ```text
//! keypath := segment ("." segment)*
//! segment := key | key ":" index
//! index   := [0-9]+
//! ```
//!
//! A bare segment selects a mapping entry. An indexed segment selects the
//! mapping entry `key`, which must be a sequence, and then element `index`.

use std::fmt;
use std::str::FromStr;

use crate::error::KeypathError;
use crate::value::{Mapping, ValueTree};

/// One step of a keypath.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub key: String,
    pub index: Option<usize>,
}

impl Segment {
    /// A bare mapping key.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            index: None,
        }
    }

    /// A mapping key followed by a sequence index.
    pub fn indexed(key: impl Into<String>, index: usize) -> Self {
        Self {
            key: key.into(),
            index: Some(index),
        }
    }

    fn parse(raw: &str, path: &str) -> Result<Self, KeypathError> {
        if raw.is_empty() {
            return Err(KeypathError::malformed(path, "empty segment"));
        }

        let Some((key, index)) = raw.split_once(':') else {
            return Ok(Segment::key(raw));
        };

        if key.is_empty() {
            return Err(KeypathError::malformed(
                path,
                format!("segment '{}' has no key before ':'", raw),
            ));
        }
        if index.contains(':') {
            return Err(KeypathError::malformed(
                path,
                format!("segment '{}' has more than one ':'", raw),
            ));
        }
        // usize::from_str accepts a leading '+'; only plain digits are valid here.
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KeypathError::malformed(
                path,
                format!("index '{}' is not a non-negative integer", index),
            ));
        }
        let index = index.parse::<usize>().map_err(|e| {
            KeypathError::malformed(path, format!("index '{}' is invalid: {}", index, e))
        })?;

        Ok(Segment::indexed(key, index))
    }

    /// Resolve this segment against a node, returning `None` if absent.
    fn resolve<'a>(&self, node: &'a ValueTree) -> Option<&'a ValueTree> {
        let value = node.as_mapping()?.get(&self.key)?;
        match self.index {
            None => Some(value),
            Some(index) => value.as_sequence()?.get(index),
        }
    }

    /// Find (or create, for bare keys) the slot this segment designates.
    fn slot_mut<'a>(&self, map: &'a mut Mapping) -> Result<&'a mut ValueTree, KeypathError> {
        let Some(index) = self.index else {
            return Ok(map
                .entry(self.key.clone())
                .or_insert_with(ValueTree::mapping));
        };

        match map.get_mut(&self.key) {
            Some(ValueTree::Sequence(items)) => {
                let len = items.len();
                items.get_mut(index).ok_or(KeypathError::IndexOutOfRange {
                    key: self.key.clone(),
                    index,
                    len,
                })
            }
            Some(other) => Err(KeypathError::TypeMismatch {
                key: self.key.clone(),
                expected: "sequence",
                found: other.type_name(),
            }),
            None => Err(KeypathError::IndexOutOfRange {
                key: self.key.clone(),
                index,
                len: 0,
            }),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}:{}", self.key, index),
            None => f.write_str(&self.key),
        }
    }
}

/// A non-empty sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keypath {
    segments: Vec<Segment>,
}

impl Keypath {
    /// Parse a dotted keypath such as `A.B:2.C`.
    pub fn parse(path: &str) -> Result<Self, KeypathError> {
        if path.is_empty() {
            return Err(KeypathError::EmptyPath);
        }
        let segments = path
            .split('.')
            .map(|raw| Segment::parse(raw, path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Build a keypath from explicit segments.
    pub fn new(segments: Vec<Segment>) -> Result<Self, KeypathError> {
        if segments.is_empty() {
            return Err(KeypathError::EmptyPath);
        }
        Ok(Self { segments })
    }

    /// Single bare-key keypath. Keys may contain `.` or `:`.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::key(key)],
        }
    }

    /// Single indexed-segment keypath.
    pub fn indexed(key: impl Into<String>, index: usize) -> Self {
        Self {
            segments: vec![Segment::indexed(key, index)],
        }
    }

    /// Append a bare key.
    pub fn child(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::key(key));
        self
    }

    /// Append an indexed segment.
    pub fn child_indexed(mut self, key: impl Into<String>, index: usize) -> Self {
        self.segments.push(Segment::indexed(key, index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; an empty keypath cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for Keypath {
    type Err = KeypathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Keypath::parse(s)
    }
}

impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl ValueTree {
    /// Resolve `path`, returning `None` when any step is missing, has the
    /// wrong type, or indexes past the end of a sequence.
    pub fn get(&self, path: &Keypath) -> Option<&ValueTree> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| segment.resolve(node))
    }

    /// Parse `path` and resolve it.
    pub fn lookup(&self, path: &str) -> Result<Option<&ValueTree>, KeypathError> {
        let keypath = Keypath::parse(path)?;
        Ok(self.get(&keypath))
    }

    /// Return a copy of this tree with `value` stored at `path`.
    ///
    /// Missing mapping keys along the way are created as empty mappings.
    /// Sequence elements are never created: an index past the end is
    /// [`KeypathError::IndexOutOfRange`].
    pub fn set(&self, path: &Keypath, value: ValueTree) -> Result<ValueTree, KeypathError> {
        self.clone().with(path, value)
    }

    /// Consuming form of [`ValueTree::set`].
    pub fn with(mut self, path: &Keypath, value: ValueTree) -> Result<ValueTree, KeypathError> {
        write_at(&mut self, path.segments(), value)?;
        Ok(self)
    }
}

fn write_at(
    node: &mut ValueTree,
    segments: &[Segment],
    value: ValueTree,
) -> Result<(), KeypathError> {
    let Some((segment, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };

    let map = match node {
        ValueTree::Mapping(map) => map,
        other => {
            return Err(KeypathError::TypeMismatch {
                key: segment.key.clone(),
                expected: "mapping",
                found: other.type_name(),
            })
        }
    };
    write_at(segment.slot_mut(map)?, rest, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> ValueTree {
        ValueTree::from(value)
    }

    #[test]
    fn test_parse_bare_and_indexed() {
        let path = Keypath::parse("A.B:2.C").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::key("A"),
                Segment::indexed("B", 2),
                Segment::key("C")
            ]
        );
    }

    #[test]
    fn test_parse_empty_path() {
        assert_eq!(Keypath::parse(""), Err(KeypathError::EmptyPath));
    }

    #[test]
    fn test_parse_rejects_malformed_segments() {
        for bad in ["a..b", "a.", ".a", "a:", ":3", "a:x", "a:-1", "a:+1", "a:1:2"] {
            assert!(
                matches!(Keypath::parse(bad), Err(KeypathError::MalformedPath { .. })),
                "expected '{}' to be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_display_round_trip() {
        let text = "PreBuilder.Targets.myApp:0.Configurations.Release";
        assert_eq!(Keypath::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(Keypath::new(vec![]), Err(KeypathError::EmptyPath));
    }

    #[test]
    fn test_builder_allows_dots_in_keys() {
        let data = tree(json!({"com.example.app": {"id": 1}}));
        let path = Keypath::key("com.example.app").child("id");
        assert_eq!(data.get(&path).and_then(|v| v.as_u64()), Some(1));
    }

    #[test]
    fn test_get_nested_value() {
        let data = tree(json!({"a": {"b": {"c": "deep"}}}));
        assert_eq!(
            data.lookup("a.b.c").unwrap().and_then(|v| v.as_str()),
            Some("deep")
        );
        // The last segment designates the value, which may itself be a container.
        assert!(data.lookup("a.b").unwrap().unwrap().is_mapping());
    }

    #[test]
    fn test_get_indexed() {
        let data = tree(json!({"Targets": [{"id": "first"}, {"id": "second"}]}));
        assert_eq!(
            data.lookup("Targets:1.id").unwrap().and_then(|v| v.as_str()),
            Some("second")
        );
        assert_eq!(
            data.lookup("Targets:0").unwrap(),
            Some(&tree(json!({"id": "first"})))
        );
    }

    #[test]
    fn test_get_not_found_cases() {
        let data = tree(json!({"a": {"b": 1}, "list": [1, 2], "scalar": "x"}));
        // Missing key
        assert_eq!(data.lookup("a.missing").unwrap(), None);
        // Descending through a scalar
        assert_eq!(data.lookup("a.b.c").unwrap(), None);
        // Index past the end
        assert_eq!(data.lookup("list:2").unwrap(), None);
        // Index on a non-sequence
        assert_eq!(data.lookup("scalar:0").unwrap(), None);
        // Bare key into a sequence
        assert_eq!(data.lookup("list.0").unwrap(), None);
        // Indexed root segment whose key is absent
        assert_eq!(data.lookup("nothing:0").unwrap(), None);
    }

    #[test]
    fn test_get_on_non_mapping_root() {
        let data = tree(json!([1, 2, 3]));
        assert_eq!(data.lookup("a").unwrap(), None);
    }

    #[test]
    fn test_lookup_propagates_malformed_path() {
        let data = tree(json!({}));
        assert!(data.lookup("a:b").is_err());
    }

    #[test]
    fn test_set_indexed_does_not_touch_original() {
        let original = tree(json!({"Targets": [{"id": "old"}]}));
        let path = Keypath::parse("Targets:0.id").unwrap();

        let updated = original.set(&path, ValueTree::from("new")).unwrap();

        assert_eq!(updated, tree(json!({"Targets": [{"id": "new"}]})));
        assert_eq!(original.get(&path).and_then(|v| v.as_str()), Some("old"));
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let data = tree(json!({"a": {}}));
        let updated = data
            .set(&Keypath::parse("a.b.c").unwrap(), ValueTree::from(true))
            .unwrap();
        assert_eq!(updated, tree(json!({"a": {"b": {"c": true}}})));
    }

    #[test]
    fn test_set_final_indexed_replaces_element() {
        let data = tree(json!({"schemes": ["a", "b", "c"]}));
        let updated = data
            .set(&Keypath::parse("schemes:1").unwrap(), ValueTree::from("B"))
            .unwrap();
        assert_eq!(updated, tree(json!({"schemes": ["a", "B", "c"]})));
    }

    #[test]
    fn test_set_never_fabricates_elements() {
        let data = tree(json!({"list": [1]}));
        let err = data
            .set(&Keypath::parse("list:1").unwrap(), ValueTree::Null)
            .unwrap_err();
        assert_eq!(
            err,
            KeypathError::IndexOutOfRange {
                key: "list".to_string(),
                index: 1,
                len: 1
            }
        );

        let err = data
            .set(&Keypath::parse("missing:0.x").unwrap(), ValueTree::Null)
            .unwrap_err();
        assert!(matches!(err, KeypathError::IndexOutOfRange { len: 0, .. }));
    }

    #[test]
    fn test_set_through_scalar_is_type_mismatch() {
        let data = tree(json!({"a": "scalar"}));
        let err = data
            .set(&Keypath::parse("a.b").unwrap(), ValueTree::Null)
            .unwrap_err();
        assert!(matches!(
            err,
            KeypathError::TypeMismatch {
                expected: "mapping",
                found: "string",
                ..
            }
        ));

        let err = data
            .set(&Keypath::parse("a:0").unwrap(), ValueTree::Null)
            .unwrap_err();
        assert!(matches!(
            err,
            KeypathError::TypeMismatch {
                expected: "sequence",
                ..
            }
        ));
    }

    #[test]
    fn test_set_overwrite_keeps_key_position() {
        let data = tree(json!({"first": 1, "second": 2, "third": 3}));
        let updated = data
            .set(&Keypath::key("second"), ValueTree::from(20i64))
            .unwrap();
        assert_eq!(
            updated.to_string(),
            r#"{"first":1,"second":20,"third":3}"#
        );
    }
}
