//! Path element and path types.

use crate::value::{FieldList, Value};
use std::cmp::Ordering;

/// PathElement represents one level of path navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// Field name for map/struct fields.
    FieldName(String),
    /// Key for associative lists (multi-field keys).
    Key(FieldList),
    /// Value for sets (scalar list elements).
    Value(Value),
    /// Index for array indices.
    Index(i32),
}

impl PathElement {
    /// Creates a new field name path element.
    pub fn field_name(name: impl Into<String>) -> Self {
        PathElement::FieldName(name.into())
    }

    /// Creates a new key path element.
    pub fn key(fields: FieldList) -> Self {
        PathElement::Key(fields)
    }

    /// Creates a new value path element.
    pub fn value(v: Value) -> Self {
        PathElement::Value(v)
    }

    /// Creates a new index path element.
    pub fn index(i: i32) -> Self {
        PathElement::Index(i)
    }

    /// Returns true if this is a field name element.
    pub fn is_field_name(&self) -> bool {
        matches!(self, PathElement::FieldName(_))
    }

    /// Returns the field name if this is a field name element.
    pub fn as_field_name(&self) -> Option<&str> {
        match self {
            PathElement::FieldName(name) => Some(name),
            _ => None,
        }
    }
}

impl PartialOrd for PathElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathElement {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(pe: &PathElement) -> u8 {
            match pe {
                PathElement::FieldName(_) => 0,
                PathElement::Key(_) => 1,
                PathElement::Value(_) => 2,
                PathElement::Index(_) => 3,
            }
        }

        match (self, other) {
            (PathElement::FieldName(a), PathElement::FieldName(b)) => a.cmp(b),
            (PathElement::Key(a), PathElement::Key(b)) => a.cmp(b),
            (PathElement::Value(a), PathElement::Value(b)) => a.cmp(b),
            (PathElement::Index(a), PathElement::Index(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

/// Path represents a complete path to a nested field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// Creates a new empty path.
    pub fn new() -> Self {
        Path {
            elements: Vec::new(),
        }
    }

    /// Creates a path from a vector of elements.
    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Path { elements }
    }

    /// Builds a path of field names from a dotted string such as
    /// `metadata.annotations`. A leading dot is accepted.
    pub fn parse_fields(dotted: &str) -> Self {
        dotted
            .trim_start_matches('.')
            .split('.')
            .filter(|s| !s.is_empty())
            .map(PathElement::field_name)
            .collect()
    }

    /// Returns the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns an iterator over the path elements.
    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    /// Appends a path element.
    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    /// Removes and returns the last path element.
    pub fn pop(&mut self) -> Option<PathElement> {
        self.elements.pop()
    }

    /// Creates a new path with the given element appended.
    pub fn with(&self, element: PathElement) -> Self {
        let mut new_path = self.clone();
        new_path.push(element);
        new_path
    }

    /// Returns a slice of the path elements.
    pub fn as_slice(&self) -> &[PathElement] {
        &self.elements
    }

    /// Renders the path as an RFC 6901 JSON pointer.
    ///
    /// Only field names and indices have a pointer form; key and value
    /// elements return `None`.
    pub fn to_json_pointer(&self) -> Option<String> {
        let mut pointer = String::new();
        for pe in &self.elements {
            pointer.push('/');
            match pe {
                PathElement::FieldName(name) => {
                    pointer.push_str(&name.replace('~', "~0").replace('/', "~1"))
                }
                PathElement::Index(i) => pointer.push_str(&i.to_string()),
                PathElement::Key(_) | PathElement::Value(_) => return None,
            }
        }
        Some(pointer)
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl std::fmt::Display for PathElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathElement::FieldName(name) => write!(f, ".{}", name),
            PathElement::Key(fields) => {
                write!(f, "[")?;
                for (i, field) in fields.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", field.name, scalar_text(&field.value))?;
                }
                write!(f, "]")
            }
            PathElement::Value(v) => write!(f, "[={}]", scalar_text(v)),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

fn scalar_text(v: &Value) -> String {
    serde_json::Value::from(v).to_string()
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Field;

    #[test]
    fn test_path_display() {
        let path = Path::parse_fields("metadata.name");
        assert_eq!(format!("{}", path), ".metadata.name");
        assert_eq!(Path::parse_fields(".metadata.name"), path);
    }

    #[test]
    fn test_key_display() {
        let key = FieldList::with_fields(vec![Field {
            name: "name".into(),
            value: Value::from("app"),
        }]);
        let path = Path::parse_fields("spec.containers").with(PathElement::key(key));
        assert_eq!(path.to_string(), r#".spec.containers[name="app"]"#);
    }

    #[test]
    fn test_json_pointer_escaping() {
        let path = Path::from_elements(vec![
            PathElement::field_name("metadata"),
            PathElement::field_name("annotations"),
            PathElement::field_name("kubectl.kubernetes.io/last-applied-configuration"),
        ]);
        assert_eq!(
            path.to_json_pointer().as_deref(),
            Some("/metadata/annotations/kubectl.kubernetes.io~1last-applied-configuration")
        );

        let indexed = Path::parse_fields("metadata.managedFields").with(PathElement::index(2));
        assert_eq!(
            indexed.to_json_pointer().as_deref(),
            Some("/metadata/managedFields/2")
        );

        let keyed = Path::new().with(PathElement::value(Value::Int(1)));
        assert_eq!(keyed.to_json_pointer(), None);
    }

    #[test]
    fn test_path_element_ordering() {
        let a = PathElement::field_name("a");
        let b = PathElement::field_name("b");
        assert!(a < b);
        assert!(a < PathElement::index(0));
    }
}
