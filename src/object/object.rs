//! The dynamically typed cluster object and its identity.

use super::managed_fields::ManagedFieldsEntry;
use crate::fieldpath::{Path, PathElement};
use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error raised when a document cannot be treated as a cluster object.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("object must be a map, got {0}")]
    NotAMap(&'static str),

    #[error("object is missing required field {0}")]
    MissingField(&'static str),

    #[error("{object} has malformed metadata.managedFields: {source}")]
    ManagedFields {
        object: ObjectRef,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode YAML object: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Identity of an object: group, kind, namespace and name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub group: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(
        group: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ObjectRef {
            group: group.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Object is a cluster object held as a generic document tree.
///
/// Cloning an object deep-copies the whole tree, so the desired, dry-run and
/// live views of the same object never alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Object {
    value: Value,
}

impl TryFrom<Value> for Object {
    type Error = ObjectError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Object::new(value)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        object.value
    }
}

impl Object {
    /// Wraps a document, checking it has the header every object needs.
    pub fn new(value: Value) -> Result<Self, ObjectError> {
        match &value {
            Value::Map(_) => {}
            Value::Null => return Err(ObjectError::NotAMap("null")),
            Value::List(_) => return Err(ObjectError::NotAMap("list")),
            _ => return Err(ObjectError::NotAMap("scalar")),
        }

        let object = Object { value };
        if object.kind().is_empty() {
            return Err(ObjectError::MissingField("kind"));
        }
        if object.api_version().is_empty() {
            return Err(ObjectError::MissingField("apiVersion"));
        }
        if object.name().is_empty() {
            return Err(ObjectError::MissingField("metadata.name"));
        }
        Ok(object)
    }

    pub fn from_json(json: &str) -> Result<Self, ObjectError> {
        Object::new(crate::value::from_json(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ObjectError> {
        Object::new(crate::value::from_yaml(yaml)?)
    }

    /// Reads every object from a multi-document YAML stream.
    ///
    /// Empty documents are skipped and `kind: List` documents are expanded
    /// into their items.
    pub fn read_all_yaml(yaml: &str) -> Result<Vec<Object>, ObjectError> {
        let mut objects = Vec::new();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let is_list = value
                .as_map()
                .and_then(|m| m.get("kind"))
                .and_then(Value::as_str)
                .is_some_and(|kind| kind == "List");
            if is_list {
                let items = value
                    .get_path(&Path::parse_fields("items"))
                    .and_then(Value::as_list)
                    .cloned()
                    .unwrap_or_default();
                for item in items {
                    objects.push(Object::new(item)?);
                }
            } else {
                objects.push(Object::new(value)?);
            }
        }
        Ok(objects)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        crate::value::to_yaml(&self.value)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        crate::value::to_json(&self.value)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    fn str_at(&self, path: &[&str]) -> &str {
        let mut current = &self.value;
        for name in path {
            match current.as_map().and_then(|m| m.get(name)) {
                Some(v) => current = v,
                None => return "",
            }
        }
        current.as_str().unwrap_or("")
    }

    pub fn api_version(&self) -> &str {
        self.str_at(&["apiVersion"])
    }

    /// The API group, empty for the core group.
    pub fn group(&self) -> &str {
        match self.api_version().split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn kind(&self) -> &str {
        self.str_at(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"])
    }

    pub fn namespace(&self) -> &str {
        self.str_at(&["metadata", "namespace"])
    }

    /// Empty until the object store has persisted the object.
    pub fn resource_version(&self) -> &str {
        self.str_at(&["metadata", "resourceVersion"])
    }

    pub fn set_resource_version(&mut self, version: impl Into<String>) {
        self.value.set_path(
            &Path::parse_fields("metadata.resourceVersion"),
            Value::String(version.into()),
        );
    }

    pub fn generation(&self) -> Option<i64> {
        self.value
            .get_path(&Path::parse_fields("metadata.generation"))
            .and_then(Value::as_int)
    }

    fn string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.value
            .get_path(&Path::parse_fields("metadata").with(PathElement::field_name(field)))
            .and_then(Value::as_map)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map("labels")
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map("annotations")
    }

    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let labels = Path::parse_fields("metadata.labels")
            .with(PathElement::field_name(key));
        self.value.set_path(&labels, Value::String(value.into()));
    }

    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let annotations = Path::parse_fields("metadata.annotations")
            .with(PathElement::field_name(key));
        self.value.set_path(&annotations, Value::String(value.into()));
    }

    /// Decodes `metadata.managedFields`. A missing list yields no entries.
    pub fn managed_fields(&self) -> Result<Vec<ManagedFieldsEntry>, ObjectError> {
        let Some(raw) = self
            .value
            .get_path(&Path::parse_fields("metadata.managedFields"))
        else {
            return Ok(Vec::new());
        };
        serde_json::from_value(serde_json::Value::from(raw)).map_err(|source| {
            ObjectError::ManagedFields {
                object: self.object_ref(),
                source,
            }
        })
    }

    pub fn set_managed_fields(&mut self, entries: &[ManagedFieldsEntry]) {
        let list = entries.iter().map(ManagedFieldsEntry::to_value).collect();
        self.value.set_path(
            &Path::parse_fields("metadata.managedFields"),
            Value::List(list),
        );
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.group(), self.kind(), self.namespace(), self.name())
    }

    /// Builds a minimal object carrying only the identity header.
    pub fn from_ref(api_version: &str, object: &ObjectRef) -> Object {
        let mut metadata = Map::new();
        metadata.set("name".into(), Value::from(object.name.as_str()));
        if !object.namespace.is_empty() {
            metadata.set("namespace".into(), Value::from(object.namespace.as_str()));
        }
        let mut root = Map::new();
        root.set("apiVersion".into(), Value::from(api_version));
        root.set("kind".into(), Value::from(object.kind.as_str()));
        root.set("metadata".into(), Value::Map(metadata));
        Object {
            value: Value::Map(root),
        }
    }
}

/// Returns true if any key/value pair matches one of the object's labels or
/// annotations.
pub fn any_in_metadata(object: &Object, pairs: &BTreeMap<String, String>) -> bool {
    if pairs.is_empty() {
        return false;
    }
    let labels = object.labels();
    let annotations = object.annotations();
    pairs
        .iter()
        .any(|(k, v)| labels.get(k) == Some(v) || annotations.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: default
  labels:
    app: web
  annotations:
    fluxcd.io/ignore: "true"
spec:
  replicas: 2
"#;

    #[test]
    fn test_header_accessors() {
        let obj = Object::from_yaml(DEPLOYMENT).unwrap();
        assert_eq!(obj.api_version(), "apps/v1");
        assert_eq!(obj.group(), "apps");
        assert_eq!(obj.kind(), "Deployment");
        assert_eq!(obj.name(), "web");
        assert_eq!(obj.namespace(), "default");
        assert_eq!(obj.resource_version(), "");
        assert_eq!(obj.object_ref().to_string(), "Deployment/default/web");
    }

    #[test]
    fn test_cluster_scoped_ref_display() {
        let ns = Object::from_yaml("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: apps\n")
            .unwrap();
        assert_eq!(ns.group(), "");
        assert_eq!(ns.object_ref().to_string(), "Namespace/apps");
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            Object::from_yaml("apiVersion: v1\nmetadata:\n  name: x\n"),
            Err(ObjectError::MissingField("kind"))
        ));
        assert!(matches!(
            Object::from_yaml("- a\n"),
            Err(ObjectError::NotAMap("list"))
        ));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Object::from_yaml(DEPLOYMENT).unwrap();
        let mut copy = original.clone();
        copy.set_resource_version("42");
        copy.set_label("app", "other");
        assert_eq!(original.resource_version(), "");
        assert_eq!(original.labels()["app"], "web");
    }

    #[test]
    fn test_exclusions() {
        let obj = Object::from_yaml(DEPLOYMENT).unwrap();
        let mut pairs = BTreeMap::new();
        assert!(!any_in_metadata(&obj, &pairs));

        pairs.insert("fluxcd.io/ignore".to_string(), "false".to_string());
        assert!(!any_in_metadata(&obj, &pairs));

        pairs.insert("app".to_string(), "web".to_string());
        assert!(any_in_metadata(&obj, &pairs));
    }

    #[test]
    fn test_read_all_yaml() {
        let stream = format!(
            "{}\n---\n# empty\n---\napiVersion: v1\nkind: List\nitems:\n- apiVersion: v1\n  kind: ConfigMap\n  metadata:\n    name: a\n",
            DEPLOYMENT
        );
        let objects = Object::read_all_yaml(&stream).unwrap();
        let refs: Vec<String> = objects.iter().map(|o| o.object_ref().to_string()).collect();
        assert_eq!(refs, vec!["Deployment/default/web", "ConfigMap/a"]);
    }
}
