//! Server-side apply of single objects, batches and staged batches.

use super::{
    interrupted, is_cluster_definition, sort_objects, ApplyOptions, ResourceManager, WaitOptions,
};
use crate::changeset::{Action, ChangeSet, ChangeSetEntry};
use crate::client::{ClientError, ClusterClient, Context, PropagationPolicy};
use crate::drift::Comparison;
use crate::error::ApplyError;
use crate::object::{any_in_metadata, Object, ObjectRef};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Result of a dry-run comparison, see [`ResourceManager::diff`].
#[derive(Debug, Clone)]
pub struct DiffResult {
    pub entry: ChangeSetEntry,
    /// The live object, `None` when it does not exist yet.
    pub existing: Option<Object>,
    /// What the object store would hold after the apply.
    pub dry_run: Object,
    pub comparison: Comparison,
}

/// What the diff stage decided for one object.
enum Step {
    /// The live object carries an exclusion marker.
    Excluded,
    /// The dry-run hit an immutable field and force is set.
    Recreate(ClientError),
    Decided(Action),
}

impl<C: ClusterClient> ResourceManager<C> {
    /// Runs everything short of the write: fetch, exclusion check, dry-run,
    /// managed fields cleanup and drift detection.
    async fn plan(
        &self,
        ctx: &Context,
        object: &Object,
        opts: &ApplyOptions,
    ) -> Result<Step, ApplyError> {
        let existing = self.fetch(ctx, object).await?;
        if let Some(existing) = &existing {
            if any_in_metadata(existing, &opts.exclusions) {
                debug!(object = %object.object_ref(), "skipping excluded object");
                return Ok(Step::Excluded);
            }
        }

        let dry_run = match self.dry_run(ctx, object).await? {
            Ok(dry_run) => dry_run,
            Err(source) if opts.force && source.is_immutable() => return Ok(Step::Recreate(source)),
            Err(source) => {
                return Err(ApplyError::Validation {
                    object: object.object_ref(),
                    source,
                })
            }
        };

        let (patched, drifted) = match &existing {
            Some(existing) => (
                self.sanitizer.sanitize(ctx, &self.client, existing).await?,
                self.detector.has_drifted(existing, &dry_run),
            ),
            None => (false, true),
        };

        if !patched && !drifted {
            return Ok(Step::Decided(Action::Unchanged));
        }
        if dry_run.resource_version().is_empty() {
            Ok(Step::Decided(Action::Created))
        } else {
            Ok(Step::Decided(Action::Configured))
        }
    }

    /// Deletes an object whose immutable fields block the apply. An object
    /// that is already gone counts as deleted.
    async fn recreate(
        &self,
        ctx: &Context,
        object: &Object,
        cause: &ClientError,
    ) -> Result<(), ApplyError> {
        warn!(object = %object.object_ref(), error = %cause, "immutable field changed, recreating object");
        let deleted = ctx
            .run(self.client.delete(object, PropagationPolicy::Background))
            .await
            .map_err(interrupted(object))?;
        match deleted {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(source) => Err(ApplyError::Recreate {
                object: object.object_ref(),
                source,
            }),
        }
    }

    /// Applies one object.
    ///
    /// The object is dry-run first and only written when the dry-run result
    /// differs from the live object or stale ownership metadata had to be
    /// removed, so re-applying an unchanged object never bumps its resource
    /// version. With `force`, an object rejected for changing an immutable
    /// field is deleted and applied again, once.
    pub async fn apply(
        &self,
        ctx: &Context,
        object: &Object,
        opts: &ApplyOptions,
    ) -> Result<ChangeSetEntry, ApplyError> {
        let mut recreated = false;
        loop {
            match self.plan(ctx, object, opts).await? {
                Step::Excluded | Step::Decided(Action::Unchanged) => {
                    return Ok(ChangeSetEntry::new(object.object_ref(), Action::Unchanged));
                }
                Step::Recreate(source) if recreated => {
                    return Err(ApplyError::Validation {
                        object: object.object_ref(),
                        source,
                    });
                }
                Step::Recreate(source) => {
                    self.recreate(ctx, object, &source).await?;
                    recreated = true;
                }
                Step::Decided(action) => {
                    self.write(ctx, object).await?;
                    info!(object = %object.object_ref(), action = %action, "applied");
                    return Ok(ChangeSetEntry::new(object.object_ref(), action));
                }
            }
        }
    }

    /// Applies a batch of objects in apply order.
    ///
    /// Every object is diffed before anything is written, so a rejected
    /// dry-run leaves the store untouched. A failing write does not undo the
    /// writes before it. A forced recreate restarts the whole batch.
    pub async fn apply_all(
        &self,
        ctx: &Context,
        objects: &[Object],
        opts: &ApplyOptions,
    ) -> Result<ChangeSet, ApplyError> {
        let mut objects = objects.to_vec();
        sort_objects(&mut objects);

        let mut recreated: BTreeSet<ObjectRef> = BTreeSet::new();
        'batch: loop {
            let mut change_set = ChangeSet::new();
            let mut to_write = Vec::new();

            for object in &objects {
                match self.plan(ctx, object, opts).await? {
                    Step::Excluded => {
                        change_set.add(ChangeSetEntry::new(object.object_ref(), Action::Unchanged));
                    }
                    Step::Recreate(source) => {
                        if !recreated.insert(object.object_ref()) {
                            return Err(ApplyError::Validation {
                                object: object.object_ref(),
                                source,
                            });
                        }
                        self.recreate(ctx, object, &source).await?;
                        continue 'batch;
                    }
                    Step::Decided(action) => {
                        if action != Action::Unchanged {
                            to_write.push(object);
                        }
                        change_set.add(ChangeSetEntry::new(object.object_ref(), action));
                    }
                }
            }

            for object in to_write {
                self.write(ctx, object).await?;
            }
            for entry in change_set.changed() {
                info!(object = %entry.object, action = %entry.action, "applied");
            }
            return Ok(change_set);
        }
    }

    /// Applies custom resource definitions and namespaces first and waits
    /// for them to become ready before applying everything else.
    ///
    /// Nothing from the second stage is submitted when the wait fails.
    #[instrument(skip_all, fields(objects = objects.len()))]
    pub async fn apply_all_staged(
        &self,
        ctx: &Context,
        objects: &[Object],
        opts: &ApplyOptions,
    ) -> Result<ChangeSet, ApplyError> {
        let (stage_one, stage_two): (Vec<Object>, Vec<Object>) =
            objects.iter().cloned().partition(is_cluster_definition);

        let mut change_set = ChangeSet::new();
        if !stage_one.is_empty() {
            change_set.append(self.apply_all(ctx, &stage_one, opts).await?);

            let wait = WaitOptions {
                interval: self.poll_interval,
                timeout: opts.wait_timeout,
            };
            self.wait(ctx, &stage_one, wait).await?;
            debug!(definitions = stage_one.len(), "cluster definitions ready");
        }

        change_set.append(self.apply_all(ctx, &stage_two, opts).await?);
        Ok(change_set)
    }

    /// Reports what applying `object` would do, without writing anything.
    pub async fn diff(&self, ctx: &Context, object: &Object) -> Result<DiffResult, ApplyError> {
        let existing = self.fetch(ctx, object).await?;
        let dry_run = self.dry_run(ctx, object).await?.map_err(|source| ApplyError::Validation {
            object: object.object_ref(),
            source,
        })?;

        let (action, comparison) = match &existing {
            Some(existing) => {
                let comparison = self.detector.compare(existing, &dry_run);
                let action = if self.detector.has_drifted(existing, &dry_run) {
                    Action::Configured
                } else {
                    Action::Unchanged
                };
                (action, comparison)
            }
            None => {
                let empty = Object::from_ref(object.api_version(), &object.object_ref());
                (Action::Created, self.detector.compare(&empty, &dry_run))
            }
        };

        Ok(DiffResult {
            entry: ChangeSetEntry::new(object.object_ref(), action),
            existing,
            dry_run,
            comparison,
        })
    }
}
