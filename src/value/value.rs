//! Core value types and path navigation.

use crate::fieldpath::{Path, PathElement};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Value represents a JSON/YAML value that can be any of the supported types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

/// Map represents a key-value map where keys are strings.
///
/// Keys are kept sorted, so two maps with the same entries compare equal
/// regardless of the order they were written in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Map {
    pub fields: BTreeMap<String, Value>,
}

/// Field represents a single key-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// FieldList is a list of fields sorted by name, used as an associative list key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    pub fields: Vec<Field>,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the value addressed by `path`, if every step resolves.
    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for pe in path {
            current = current.child(pe)?;
        }
        Some(current)
    }

    /// Mutable variant of [`Value::get_path`].
    pub fn get_path_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut current = self;
        for pe in path {
            current = current.child_mut(pe)?;
        }
        Some(current)
    }

    /// Sets the value at `path`, creating intermediate maps for field names.
    ///
    /// Returns false when the path crosses a list element that does not exist
    /// or a scalar that cannot hold children.
    pub fn set_path(&mut self, path: &Path, value: Value) -> bool {
        let elements = path.as_slice();
        let Some((last, parents)) = elements.split_last() else {
            *self = value;
            return true;
        };

        let mut current = self;
        for pe in parents {
            if let (PathElement::FieldName(name), true) = (pe, current.is_null()) {
                let mut map = Map::new();
                map.set(name.clone(), Value::Null);
                *current = Value::Map(map);
            }
            current = match (pe, current) {
                (PathElement::FieldName(name), Value::Map(map)) => {
                    map.fields.entry(name.clone()).or_insert(Value::Null)
                }
                (pe, current) => match current.child_mut(pe) {
                    Some(child) => child,
                    None => return false,
                },
            };
        }

        if current.is_null() && last.is_field_name() {
            *current = Value::Map(Map::new());
        }
        match (last, current) {
            (PathElement::FieldName(name), Value::Map(map)) => {
                map.set(name.clone(), value);
                true
            }
            (pe, current) => match current.child_mut(pe) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
        }
    }

    /// Removes and returns the value at `path`.
    pub fn remove_path(&mut self, path: &Path) -> Option<Value> {
        let (last, parents) = path.as_slice().split_last()?;
        let mut current = self;
        for pe in parents {
            current = current.child_mut(pe)?;
        }
        match (last, current) {
            (PathElement::FieldName(name), Value::Map(map)) => map.delete(name),
            (pe, Value::List(items)) => {
                let idx = list_position(items, pe)?;
                Some(items.remove(idx))
            }
            _ => None,
        }
    }

    fn child(&self, pe: &PathElement) -> Option<&Value> {
        match (pe, self) {
            (PathElement::FieldName(name), Value::Map(map)) => map.get(name),
            (pe, Value::List(items)) => list_position(items, pe).map(|i| &items[i]),
            _ => None,
        }
    }

    fn child_mut(&mut self, pe: &PathElement) -> Option<&mut Value> {
        match (pe, self) {
            (PathElement::FieldName(name), Value::Map(map)) => map.fields.get_mut(name.as_str()),
            (pe, Value::List(items)) => {
                let idx = list_position(items, pe)?;
                items.get_mut(idx)
            }
            _ => None,
        }
    }
}

/// Resolves a list-addressing path element to an index.
fn list_position(items: &[Value], pe: &PathElement) -> Option<usize> {
    match pe {
        PathElement::Index(i) => usize::try_from(*i).ok().filter(|i| *i < items.len()),
        PathElement::Value(v) => items.iter().position(|item| item == v),
        PathElement::Key(key) => items.iter().position(|item| {
            item.as_map().is_some_and(|map| {
                key.fields
                    .iter()
                    .all(|f| map.get(&f.name) == Some(&f.value))
            })
        }),
        PathElement::FieldName(_) => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // Integral floats and ints are the same number once they round-trip
            // through JSON.
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        fn type_order(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::String(_) => 3,
                Value::List(_) => 4,
                Value::Map(_) => 5,
            }
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            _ => type_order(self).cmp(&type_order(other)),
        }
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Map {}

impl PartialOrd for Map {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Map {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields.cmp(&other.fields)
    }
}

impl Map {
    pub fn new() -> Self {
        Map {
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: String, value: Value) {
        self.fields.insert(key, value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for Map {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Map {
            fields: iter.into_iter().collect(),
        }
    }
}

impl FieldList {
    pub fn with_fields(mut fields: Vec<Field>) -> Self {
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        FieldList { fields }
    }
}

impl PartialOrd for FieldList {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldList {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.fields.iter().zip(other.fields.iter()) {
            let ord = a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => number_bits(*i as f64).hash(state),
            Value::Float(f) => number_bits(*f).hash(state),
            Value::String(s) => s.hash(state),
            Value::List(l) => l.hash(state),
            Value::Map(m) => {
                for (k, v) in &m.fields {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

// 0.0 and -0.0 compare equal, so they must hash alike.
fn number_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl std::hash::Hash for FieldList {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for field in &self.fields {
            field.name.hash(state);
            field.value.hash(state);
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

/// Parse a value from JSON.
pub fn from_json(json: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a value to JSON.
pub fn to_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Parse a value from YAML.
pub fn from_yaml(yaml: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Serialize a value to YAML.
pub fn to_yaml(value: &Value) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(value)
}
