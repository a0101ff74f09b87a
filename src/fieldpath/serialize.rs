//! The `fieldsV1` encoding used in `metadata.managedFields`.
//!
//! Each path element becomes an object key with a one-letter prefix:
//! - FieldName: `f:name`
//! - Value: `v:<json>`
//! - Key: `k:<json object>`
//! - Index: `i:<number>`
//!
//! A `"."` key inside a child object marks that the parent path is itself a
//! member of the set.

use super::path::PathElement;
use super::set::Set;
use crate::value::{Field, FieldList, Value};
use thiserror::Error;

/// Error raised when a field set cannot be encoded or decoded.
#[derive(Debug, Clone, Error)]
pub enum SerializeError {
    #[error("path element too short: {0:?}")]
    TooShort(String),

    #[error("invalid index in path element {element:?}: {message}")]
    InvalidIndex { element: String, message: String },

    #[error("invalid JSON in path element {element:?}: {message}")]
    InvalidJson { element: String, message: String },

    #[error("expected JSON object for {0}")]
    ExpectedObject(String),
}

/// Serializes a PathElement to its string representation.
pub fn serialize_path_element(pe: &PathElement) -> String {
    match pe {
        PathElement::FieldName(name) => format!("f:{}", name),
        PathElement::Value(v) => format!("v:{}", serde_json::Value::from(v)),
        PathElement::Key(fields) => {
            let obj: serde_json::Map<String, serde_json::Value> = fields
                .fields
                .iter()
                .map(|f| (f.name.clone(), serde_json::Value::from(&f.value)))
                .collect();
            format!("k:{}", serde_json::Value::Object(obj))
        }
        PathElement::Index(i) => format!("i:{}", i),
    }
}

/// Deserializes a PathElement from its string representation.
///
/// Returns `Ok(None)` for prefixes this crate does not know, so newer
/// encodings are dropped instead of failing the whole set.
pub fn deserialize_path_element(s: &str) -> Result<Option<PathElement>, SerializeError> {
    let (Some(prefix), Some(content)) = (s.get(..2), s.get(2..)) else {
        return Err(SerializeError::TooShort(s.to_string()));
    };

    let parse_json = |content: &str| -> Result<serde_json::Value, SerializeError> {
        serde_json::from_str(content).map_err(|e| SerializeError::InvalidJson {
            element: s.to_string(),
            message: e.to_string(),
        })
    };

    let pe = match prefix {
        "f:" => PathElement::FieldName(content.to_string()),
        "v:" => PathElement::Value(Value::from(parse_json(content)?)),
        "k:" => match parse_json(content)? {
            serde_json::Value::Object(obj) => PathElement::Key(FieldList::with_fields(
                obj.into_iter()
                    .map(|(name, v)| Field {
                        name,
                        value: Value::from(v),
                    })
                    .collect(),
            )),
            _ => return Err(SerializeError::ExpectedObject(s.to_string())),
        },
        "i:" => {
            let i = content
                .parse::<i32>()
                .map_err(|e| SerializeError::InvalidIndex {
                    element: s.to_string(),
                    message: e.to_string(),
                })?;
            PathElement::Index(i)
        }
        _ => return Ok(None),
    };
    Ok(Some(pe))
}

impl Set {
    /// Encodes the set as a `fieldsV1` value.
    pub fn to_fields_v1(&self) -> Value {
        Value::from(serde_json::Value::Object(self.to_json_object(false)))
    }

    /// Decodes a set from a `fieldsV1` value.
    pub fn from_fields_v1(value: &Value) -> Result<Set, SerializeError> {
        match serde_json::Value::from(value) {
            serde_json::Value::Object(obj) => Self::from_json_object(obj),
            _ => Err(SerializeError::ExpectedObject("fieldsV1".to_string())),
        }
    }

    fn to_json_object(&self, include_self: bool) -> serde_json::Map<String, serde_json::Value> {
        let mut result = serde_json::Map::new();
        if include_self {
            result.insert(".".to_string(), serde_json::Value::Object(Default::default()));
        }
        for pe in &self.members {
            if !self.children.contains_key(pe) {
                result.insert(
                    serialize_path_element(pe),
                    serde_json::Value::Object(Default::default()),
                );
            }
        }
        for (pe, child) in &self.children {
            let obj = child.to_json_object(self.members.contains(pe));
            result.insert(serialize_path_element(pe), serde_json::Value::Object(obj));
        }
        result
    }

    fn from_json_object(obj: serde_json::Map<String, serde_json::Value>) -> Result<Set, SerializeError> {
        let mut set = Set::new();

        for (key, value) in obj {
            if key == "." {
                continue;
            }
            let Some(pe) = deserialize_path_element(&key)? else {
                continue;
            };
            let serde_json::Value::Object(child_obj) = value else {
                return Err(SerializeError::ExpectedObject(key));
            };

            if child_obj.is_empty() || child_obj.contains_key(".") {
                set.members.insert(pe.clone());
            }
            let child = Self::from_json_object(child_obj)?;
            if !child.is_empty() {
                set.children.insert(pe, child);
            }
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::Path;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_element_prefixes() {
        let cases = vec![
            (PathElement::field_name("foo"), "f:foo"),
            (PathElement::value(Value::from("aa")), r#"v:"aa""#),
            (PathElement::value(Value::Bool(true)), "v:true"),
            (PathElement::index(42), "i:42"),
        ];
        for (pe, expected) in cases {
            assert_eq!(serialize_path_element(&pe), expected);
            assert_eq!(deserialize_path_element(expected).unwrap(), Some(pe));
        }
    }

    #[test]
    fn test_multi_field_key_is_sorted() {
        let pe = deserialize_path_element(r#"k:{"protocol":"TCP","containerPort":80}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            serialize_path_element(&pe),
            r#"k:{"containerPort":80,"protocol":"TCP"}"#
        );
    }

    #[test]
    fn test_unknown_prefix_dropped() {
        let raw = crate::value::from_json(r#"{"f:aaa":{},"r:aab":{}}"#).unwrap();
        let set = Set::from_fields_v1(&raw).unwrap();
        assert_eq!(
            crate::value::to_json(&set.to_fields_v1()).unwrap(),
            r#"{"f:aaa":{}}"#
        );
    }

    #[test]
    fn test_managed_fields_document() {
        let raw = crate::value::from_json(
            r#"{"f:metadata":{"f:labels":{".":{},"f:app":{}}},"f:spec":{"f:replicas":{}}}"#,
        )
        .unwrap();
        let set = Set::from_fields_v1(&raw).unwrap();

        assert!(set.has(&Path::parse_fields("metadata.labels")));
        assert!(set.has(&Path::parse_fields("metadata.labels.app")));
        assert!(set.has(&Path::parse_fields("spec.replicas")));
        assert!(!set.has(&Path::parse_fields("spec")));

        let reparsed = Set::from_fields_v1(&set.to_fields_v1()).unwrap();
        assert_eq!(reparsed, set);
    }

    #[test]
    fn test_bad_index() {
        assert!(matches!(
            deserialize_path_element("i:x"),
            Err(SerializeError::InvalidIndex { .. })
        ));
        assert!(matches!(
            deserialize_path_element("f"),
            Err(SerializeError::TooShort(_))
        ));
    }
}
