//! Drift detection between a live object and its dry-run apply result.

use super::comparison::Comparison;
use crate::fieldpath::{Path, PathElement, Set};
use crate::object::Object;
use crate::value::Value;

/// Fields the object store maintains on its own. They change on every write
/// and never indicate drift.
const BOOKKEEPING_FIELDS: &[&str] = &["metadata.resourceVersion", "metadata.generation"];

/// Compares live objects against dry-run results.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    ignored_fields: Set,
}

impl Default for DriftDetector {
    fn default() -> Self {
        DriftDetector {
            ignored_fields: BOOKKEEPING_FIELDS
                .iter()
                .map(|f| Path::parse_fields(f))
                .collect(),
        }
    }
}

impl DriftDetector {
    pub fn new() -> Self {
        DriftDetector::default()
    }

    /// Adds fields that are never considered drift, on top of the
    /// server-maintained bookkeeping fields.
    pub fn ignore_fields(mut self, fields: &Set) -> Self {
        self.ignored_fields = self.ignored_fields.union(fields);
        self
    }

    /// Reports whether applying `dry_run` would change `existing`.
    ///
    /// A dry-run result without a resource version describes an object the
    /// store has never persisted, which always counts as drift.
    pub fn has_drifted(&self, existing: &Object, dry_run: &Object) -> bool {
        if dry_run.resource_version().is_empty() || existing.resource_version().is_empty() {
            return true;
        }
        !self.compare(existing, dry_run).is_same()
    }

    /// Walks every field of `dry_run` and records where `existing` differs.
    ///
    /// Maps are compared by key, lists element by element in order. Fields
    /// only present in `existing` are ignored: the dry-run result already
    /// carries everything the store would keep after the apply.
    pub fn compare(&self, existing: &Object, dry_run: &Object) -> Comparison {
        let existing = strip_managed_field_times(existing.value());
        let dry_run = strip_managed_field_times(dry_run.value());

        let mut comparison = Comparison::new();
        self.walk(&mut Path::new(), &existing, &dry_run, &mut comparison);
        comparison
    }

    fn walk(&self, path: &mut Path, existing: &Value, desired: &Value, out: &mut Comparison) {
        if !path.is_empty() && self.ignored_fields.has(path) {
            return;
        }

        match (desired, existing) {
            (Value::Null, _) => {}
            (Value::Map(want), Value::Map(have)) => {
                for (name, want_child) in want.iter() {
                    path.push(PathElement::field_name(name.as_str()));
                    match have.get(name) {
                        Some(have_child) => self.walk(path, have_child, want_child, out),
                        None if want_child.is_null() || self.ignored_fields.has(path) => {}
                        None => out.added.insert(path),
                    }
                    path.pop();
                }
            }
            (Value::List(want), Value::List(have)) => {
                if want.len() != have.len() {
                    out.modified.insert(path);
                    return;
                }
                for (i, (want_item, have_item)) in want.iter().zip(have).enumerate() {
                    path.push(PathElement::index(i as i32));
                    self.walk(path, have_item, want_item, out);
                    path.pop();
                }
            }
            (want, have) => {
                if want != have {
                    out.modified.insert(path);
                }
            }
        }
    }
}

/// Reports drift using the default bookkeeping exclusions.
pub fn has_drifted(existing: &Object, dry_run: &Object) -> bool {
    DriftDetector::default().has_drifted(existing, dry_run)
}

fn strip_managed_field_times(value: &Value) -> Value {
    let mut value = value.clone();
    if let Some(entries) = value
        .get_path_mut(&Path::parse_fields("metadata.managedFields"))
        .and_then(Value::as_list_mut)
    {
        for entry in entries.iter_mut().filter_map(Value::as_map_mut) {
            entry.delete("time");
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn object(yaml: &str) -> Object {
        Object::from_yaml(yaml).unwrap()
    }

    const LIVE: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: default
  resourceVersion: "10"
  generation: 3
  uid: 1234
  managedFields:
  - manager: flux
    operation: Apply
    time: "2021-01-01T00:00:00Z"
spec:
  replicas: 2
  template:
    spec:
      containers:
      - name: app
        image: web:1
      - name: sidecar
        image: proxy:1
status:
  readyReplicas: 2
"#;

    fn dry_run(patch: impl FnOnce(&mut Value)) -> Object {
        let mut obj = object(LIVE);
        patch(obj.value_mut());
        obj
    }

    #[test]
    fn test_identical_objects_do_not_drift() {
        assert!(!has_drifted(&object(LIVE), &object(LIVE)));
    }

    #[test]
    fn test_bookkeeping_fields_ignored() {
        let dr = dry_run(|v| {
            v.set_path(&Path::parse_fields("metadata.resourceVersion"), "11".into());
            v.set_path(&Path::parse_fields("metadata.generation"), Value::Int(4));
            let time = Path::parse_fields("metadata.managedFields")
                .with(PathElement::index(0))
                .with(PathElement::field_name("time"));
            v.set_path(&time, "2022-02-02T00:00:00Z".into());
        });
        assert!(!has_drifted(&object(LIVE), &dr));
    }

    #[test]
    fn test_modified_scalar() {
        let dr = dry_run(|v| {
            v.set_path(&Path::parse_fields("spec.replicas"), Value::Int(3));
        });
        let detector = DriftDetector::new();
        assert!(detector.has_drifted(&object(LIVE), &dr));

        let comparison = detector.compare(&object(LIVE), &dr);
        assert_eq!(comparison.modified.paths(), vec![Path::parse_fields("spec.replicas")]);
        assert!(!comparison.has_added());
    }

    #[test]
    fn test_added_field() {
        let dr = dry_run(|v| {
            v.set_path(&Path::parse_fields("spec.paused"), Value::Bool(true));
        });
        let comparison = DriftDetector::new().compare(&object(LIVE), &dr);
        assert_eq!(comparison.added.paths(), vec![Path::parse_fields("spec.paused")]);
    }

    #[test]
    fn test_container_order_matters() {
        let dr = dry_run(|v| {
            let containers = Path::parse_fields("spec.template.spec.containers");
            if let Some(list) = v.get_path_mut(&containers).and_then(Value::as_list_mut) {
                list.reverse();
            }
        });
        assert!(has_drifted(&object(LIVE), &dr));
    }

    #[test]
    fn test_map_key_order_does_not_matter() {
        let reordered = object(
            r#"
kind: Deployment
status:
  readyReplicas: 2
spec:
  template:
    spec:
      containers:
      - image: web:1
        name: app
      - image: proxy:1
        name: sidecar
  replicas: 2
metadata:
  managedFields:
  - operation: Apply
    manager: flux
  uid: 1234
  generation: 3
  resourceVersion: "10"
  namespace: default
  name: web
apiVersion: apps/v1
"#,
        );
        assert!(!has_drifted(&object(LIVE), &reordered));
    }

    #[test]
    fn test_fields_only_in_live_ignored() {
        let dr = dry_run(|v| {
            v.remove_path(&Path::parse_fields("status"));
        });
        assert!(!has_drifted(&object(LIVE), &dr));
    }

    #[test]
    fn test_unpersisted_dry_run_always_drifts() {
        let dr = dry_run(|v| {
            v.remove_path(&Path::parse_fields("metadata.resourceVersion"));
        });
        assert!(has_drifted(&object(LIVE), &dr));
    }

    #[test]
    fn test_custom_ignored_fields() {
        let dr = dry_run(|v| {
            v.set_path(&Path::parse_fields("spec.replicas"), Value::Int(5));
        });
        let ignored: Set = [Path::parse_fields("spec.replicas")].into_iter().collect();
        let detector = DriftDetector::new().ignore_fields(&ignored);
        assert!(!detector.has_drifted(&object(LIVE), &dr));
    }
}
