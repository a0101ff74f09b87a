//! In-memory cluster client used by the engine tests.
//!
//! It models just enough of server-side apply to exercise the engine: apply
//! merges the request into the live object, records an `Apply` ownership
//! entry for the field manager and only bumps the resource version when the
//! stored object actually changes.

use super::{ClientError, ClusterClient, JsonPatch, PatchOptions, PatchSpec, PropagationPolicy};
use crate::fieldpath::{Path, PathElement, Set};
use crate::object::{ManagedFieldsEntry, ManagedFieldsOperation, Object, ObjectRef};
use crate::value::{Map, Value};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub gets: usize,
    pub dry_runs: usize,
    pub applies: usize,
    pub json_patches: usize,
    pub deletes: usize,
    pub ready_checks: usize,
}

impl Calls {
    /// Requests that persisted something.
    pub fn writes(&self) -> usize {
        self.applies + self.json_patches + self.deletes
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectRef, Object>,
    calls: Calls,
    events: Vec<String>,
    next_version: u64,
    polls: HashMap<ObjectRef, usize>,
}

#[derive(Default)]
pub(crate) struct FakeClient {
    state: Mutex<State>,
    immutable_fields: Vec<(String, Path)>,
    always_immutable: HashSet<ObjectRef>,
    rejected: HashMap<ObjectRef, ClientError>,
    failing_writes: HashMap<ObjectRef, ClientError>,
    failing_deletes: HashMap<ObjectRef, ClientError>,
    failing_patches: HashMap<ObjectRef, ClientError>,
    failing_gets: HashMap<ObjectRef, ClientError>,
    failing_ready: HashMap<ObjectRef, ClientError>,
    never_ready: HashSet<ObjectRef>,
    ready_after: HashMap<ObjectRef, usize>,
    latency: Option<Duration>,
}

impl FakeClient {
    pub fn new() -> Self {
        FakeClient::default()
    }

    /// Marks `field` of every object of `kind` immutable after creation.
    pub fn immutable(mut self, kind: &str, field: &str) -> Self {
        self.immutable_fields
            .push((kind.to_string(), Path::parse_fields(field)));
        self
    }

    /// Applies of `object` always fail with an immutable field conflict, even
    /// when nothing is stored.
    pub fn always_immutable(mut self, object: &Object) -> Self {
        self.always_immutable.insert(object.object_ref());
        self
    }

    /// Dry-runs of `object` fail with `err`.
    pub fn reject(mut self, object: &Object, err: ClientError) -> Self {
        self.rejected.insert(object.object_ref(), err);
        self
    }

    /// Real (non dry-run) applies of `object` fail with `err`.
    pub fn fail_write(mut self, object: &Object, err: ClientError) -> Self {
        self.failing_writes.insert(object.object_ref(), err);
        self
    }

    pub fn fail_delete(mut self, object: &Object, err: ClientError) -> Self {
        self.failing_deletes.insert(object.object_ref(), err);
        self
    }

    /// JSON patches of `object` fail with `err`.
    pub fn fail_patch(mut self, object: &Object, err: ClientError) -> Self {
        self.failing_patches.insert(object.object_ref(), err);
        self
    }

    pub fn fail_get(mut self, object: &Object, err: ClientError) -> Self {
        self.failing_gets.insert(object.object_ref(), err);
        self
    }

    /// Readiness checks of `object` fail with `err`.
    pub fn fail_ready(mut self, object: &Object, err: ClientError) -> Self {
        self.failing_ready.insert(object.object_ref(), err);
        self
    }

    pub fn never_ready(mut self, object: &Object) -> Self {
        self.never_ready.insert(object.object_ref());
        self
    }

    /// `object` reports ready from its `polls`-th readiness check onwards.
    pub fn ready_after(mut self, object: &Object, polls: usize) -> Self {
        self.ready_after.insert(object.object_ref(), polls);
        self
    }

    /// Every call sleeps for `latency` before answering.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Stores `object` as if some other client had created it.
    pub fn seed(self, mut object: Object) -> Self {
        {
            let mut state = self.lock();
            state.next_version += 1;
            object.set_resource_version(state.next_version.to_string());
            state.objects.insert(object.object_ref(), object);
        }
        self
    }

    pub fn calls(&self) -> Calls {
        self.lock().calls
    }

    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn stored(&self, object: &Object) -> Option<Object> {
        self.lock().objects.get(&object.object_ref()).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_immutable(&self, live: Option<&Object>, desired: &Object) -> Result<(), ClientError> {
        if self.always_immutable.contains(&desired.object_ref()) {
            return Err(ClientError::immutable(format!(
                "{}: field is immutable",
                desired.object_ref()
            )));
        }
        let Some(live) = live else {
            return Ok(());
        };
        for (kind, path) in &self.immutable_fields {
            if kind != desired.kind() {
                continue;
            }
            let want = desired.value().get_path(path);
            if want.is_some() && want != live.value().get_path(path) {
                return Err(ClientError::immutable(format!(
                    "{}: {} field is immutable",
                    desired.object_ref(),
                    path
                )));
            }
        }
        Ok(())
    }

    fn server_side_apply(
        &self,
        state: &mut State,
        desired: &Object,
        options: &PatchOptions,
    ) -> Result<Object, ClientError> {
        let live = state.objects.get(&desired.object_ref()).cloned();
        self.check_immutable(live.as_ref(), desired)?;

        let mut merged = match &live {
            Some(live) => {
                let mut merged = live.clone();
                merge_into(merged.value_mut(), desired.value());
                merged
            }
            None => desired.clone(),
        };

        let mut owned = Set::new();
        collect_leaves(&mut Path::new(), desired.value(), &mut owned);
        let mut entries: Vec<ManagedFieldsEntry> = live
            .as_ref()
            .map(|l| l.managed_fields().unwrap_or_default())
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !e.is(&options.field_manager, ManagedFieldsOperation::Apply))
            .collect();
        let mut entry = ManagedFieldsEntry::new(&options.field_manager, ManagedFieldsOperation::Apply)
            .with_fields(&owned);
        entry.api_version = desired.api_version().to_string();
        entry.time = Some(format!("2024-01-01T00:00:{:02}Z", state.next_version % 60));
        entries.push(entry);
        merged.set_managed_fields(&entries);

        match &live {
            Some(live) => merged.set_resource_version(live.resource_version()),
            None => {
                merged
                    .value_mut()
                    .remove_path(&Path::parse_fields("metadata.resourceVersion"));
            }
        }
        if options.dry_run {
            return Ok(merged);
        }

        let unchanged = live.as_ref().is_some_and(|live| {
            crate::drift::DriftDetector::new()
                .compare(live, &merged)
                .is_same()
        });
        if !unchanged {
            state.next_version += 1;
            merged.set_resource_version(state.next_version.to_string());
        }
        state.objects.insert(merged.object_ref(), merged.clone());
        Ok(merged)
    }

    fn json_patch(
        &self,
        state: &mut State,
        object: &Object,
        ops: &[JsonPatch],
    ) -> Result<Object, ClientError> {
        let Some(mut live) = state.objects.get(&object.object_ref()).cloned() else {
            return Err(ClientError::not_found(format!("{} not found", object.object_ref())));
        };
        for op in ops {
            let path = pointer_to_path(op.pointer());
            let ok = match op {
                JsonPatch::Remove { .. } => live.value_mut().remove_path(&path).is_some(),
                JsonPatch::Replace { value, .. } => live.value_mut().set_path(&path, value.clone()),
                JsonPatch::Test { value, .. } => live.value().get_path(&path) == Some(value),
            };
            if !ok {
                return Err(ClientError::other(format!(
                    "json patch {} failed on {}",
                    op.pointer(),
                    object.object_ref()
                )));
            }
        }
        state.next_version += 1;
        live.set_resource_version(state.next_version.to_string());
        state.objects.insert(live.object_ref(), live.clone());
        Ok(live)
    }
}

#[async_trait]
impl ClusterClient for FakeClient {
    async fn get(&self, object: &Object) -> Result<Option<Object>, ClientError> {
        self.pause().await;
        let mut state = self.lock();
        state.calls.gets += 1;
        if let Some(err) = self.failing_gets.get(&object.object_ref()) {
            return Err(err.clone());
        }
        Ok(state.objects.get(&object.object_ref()).cloned())
    }

    async fn patch(
        &self,
        object: &Object,
        patch: &PatchSpec,
        options: &PatchOptions,
    ) -> Result<Object, ClientError> {
        self.pause().await;
        let mut state = self.lock();
        let id = object.object_ref();
        match patch {
            PatchSpec::Apply if options.dry_run => {
                state.calls.dry_runs += 1;
                state.events.push(format!("dry-run {}", id));
                if let Some(err) = self.rejected.get(&id) {
                    return Err(err.clone());
                }
                self.server_side_apply(&mut state, object, options)
            }
            PatchSpec::Apply => {
                state.calls.applies += 1;
                state.events.push(format!("apply {}", id));
                if let Some(err) = self.failing_writes.get(&id) {
                    return Err(err.clone());
                }
                self.server_side_apply(&mut state, object, options)
            }
            PatchSpec::Json(ops) => {
                state.calls.json_patches += 1;
                state.events.push(format!("patch {}", id));
                if let Some(err) = self.failing_patches.get(&id) {
                    return Err(err.clone());
                }
                self.json_patch(&mut state, object, ops)
            }
        }
    }

    async fn delete(&self, object: &Object, _propagation: PropagationPolicy) -> Result<(), ClientError> {
        self.pause().await;
        let mut state = self.lock();
        let id = object.object_ref();
        state.calls.deletes += 1;
        state.events.push(format!("delete {}", id));
        if let Some(err) = self.failing_deletes.get(&id) {
            return Err(err.clone());
        }
        match state.objects.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ClientError::not_found(format!("{} not found", id))),
        }
    }

    async fn is_ready(&self, object: &Object) -> Result<bool, ClientError> {
        self.pause().await;
        let mut state = self.lock();
        let id = object.object_ref();
        state.calls.ready_checks += 1;
        state.events.push(format!("ready {}", id));
        if let Some(err) = self.failing_ready.get(&id) {
            return Err(err.clone());
        }
        let polls = {
            let count = state.polls.entry(id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if self.never_ready.contains(&id) || !state.objects.contains_key(&id) {
            return Ok(false);
        }
        Ok(polls >= self.ready_after.get(&id).copied().unwrap_or(1))
    }
}

fn merge_into(live: &mut Value, desired: &Value) {
    match (live, desired) {
        (Value::Map(live), Value::Map(desired)) => {
            for (name, value) in desired.iter() {
                match live.fields.get_mut(name.as_str()) {
                    Some(slot) => merge_into(slot, value),
                    None => live.set(name.clone(), value.clone()),
                }
            }
        }
        (live, desired) => *live = desired.clone(),
    }
}

fn collect_leaves(path: &mut Path, value: &Value, out: &mut Set) {
    match value {
        Value::Map(map) if !map.is_empty() => {
            for (name, child) in map.iter() {
                if path.is_empty() && (name == "apiVersion" || name == "kind") {
                    continue;
                }
                path.push(PathElement::field_name(name.as_str()));
                collect_leaves(path, child, out);
                path.pop();
            }
        }
        _ => out.insert(path),
    }
}

fn pointer_to_path(pointer: &str) -> Path {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            match segment.parse::<i32>() {
                Ok(i) => PathElement::index(i),
                Err(_) => PathElement::field_name(segment),
            }
        })
        .collect()
}

/// Builds a namespaced object of the given kind with a `data` payload.
pub(crate) fn config_map(name: &str, data: &[(&str, &str)]) -> Object {
    let mut obj = Object::from_yaml(&format!(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {}\n  namespace: default\n",
        name
    ))
    .unwrap();
    let data: Map = data
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect();
    obj.value_mut()
        .set_path(&Path::parse_fields("data"), Value::Map(data));
    obj
}
