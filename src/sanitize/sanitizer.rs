//! Removal of stale ownership metadata before drift detection.
//!
//! Objects first created with client-side apply carry a
//! `last-applied-configuration` annotation and `Update` managers that keep
//! claiming fields after the object moves to server-side apply. Left in
//! place, they make the server keep values the desired state has dropped.

use crate::client::{ClusterClient, Context, JsonPatch, PatchOptions, PatchSpec};
use crate::error::{ApplyError, SanitizeFailure};
use crate::fieldpath::{Path, PathElement};
use crate::object::{ManagedFieldsEntry, ManagedFieldsOperation, Object, ObjectError};
use crate::value::Value;
use tracing::debug;

/// Annotation written by client-side apply.
pub const LAST_APPLIED_CONFIG_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Decides which ownership entries are stale and removes them.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    field_manager: String,
    legacy_update_managers: Vec<String>,
    legacy_apply_manager: String,
}

impl Sanitizer {
    pub fn new(
        field_manager: impl Into<String>,
        legacy_update_managers: Vec<String>,
        legacy_apply_manager: impl Into<String>,
    ) -> Self {
        Sanitizer {
            field_manager: field_manager.into(),
            legacy_update_managers,
            legacy_apply_manager: legacy_apply_manager.into(),
        }
    }

    fn is_stale(&self, entry: &ManagedFieldsEntry) -> bool {
        let legacy_update = self
            .legacy_update_managers
            .iter()
            .any(|m| entry.is(m, ManagedFieldsOperation::Update));
        legacy_update || entry.is(&self.legacy_apply_manager, ManagedFieldsOperation::Apply)
    }

    /// Builds the JSON patch that cleans up `object`. Empty when the object
    /// carries nothing stale.
    pub fn plan(&self, object: &Object) -> Result<Vec<JsonPatch>, ObjectError> {
        let mut patches = Vec::new();

        if object.annotations().contains_key(LAST_APPLIED_CONFIG_ANNOTATION) {
            let annotation = Path::parse_fields("metadata.annotations")
                .with(PathElement::field_name(LAST_APPLIED_CONFIG_ANNOTATION));
            patches.extend(JsonPatch::remove(&annotation));
        }

        let entries = object.managed_fields()?;
        let mut kept: Vec<ManagedFieldsEntry> = entries
            .iter()
            .filter(|e| !self.is_stale(e))
            .cloned()
            .collect();
        if kept.len() != entries.len() {
            // The store ignores an empty list; a single empty entry is how
            // all managers are cleared.
            if kept.is_empty() {
                kept.push(ManagedFieldsEntry::default());
            }
            let list = Value::List(kept.iter().map(ManagedFieldsEntry::to_value).collect());
            patches.extend(JsonPatch::replace(
                &Path::parse_fields("metadata.managedFields"),
                list,
            ));
        }

        Ok(patches)
    }

    /// Cleans up the live object, returning whether a patch was written.
    ///
    /// Nothing is written when nothing is stale, so a clean object keeps its
    /// resource version.
    pub async fn sanitize<C: ClusterClient + ?Sized>(
        &self,
        ctx: &Context,
        client: &C,
        existing: &Object,
    ) -> Result<bool, ApplyError> {
        let object = existing.object_ref();
        let patches = self.plan(existing).map_err(|e| ApplyError::Sanitize {
            object: object.clone(),
            source: SanitizeFailure::Decode(e),
        })?;
        if patches.is_empty() {
            return Ok(false);
        }

        debug!(object = %object, operations = patches.len(), "removing stale field managers");
        let spec = PatchSpec::Json(patches);
        let options = PatchOptions::new(&self.field_manager);
        ctx.run(client.patch(existing, &spec, &options))
            .await
            .map_err(|cause| ApplyError::Cancelled {
                object: Some(object.clone()),
                cause,
            })?
            .map_err(|e| ApplyError::Sanitize {
                object,
                source: SanitizeFailure::Patch(e),
            })?;
        Ok(true)
    }
}
