//! Deletion of objects the caller no longer wants.

use super::{interrupted, DeleteOptions, ResourceManager};
use crate::changeset::{Action, ChangeSet, ChangeSetEntry};
use crate::client::{ClusterClient, Context};
use crate::error::ApplyError;
use crate::object::{any_in_metadata, Object};
use tracing::{debug, info};

impl<C: ClusterClient> ResourceManager<C> {
    /// Deletes one object.
    ///
    /// Objects that are missing, excluded, or lack every inclusion marker
    /// when inclusions are set, are reported unchanged.
    pub async fn delete(
        &self,
        ctx: &Context,
        object: &Object,
        opts: &DeleteOptions,
    ) -> Result<ChangeSetEntry, ApplyError> {
        let unchanged = ChangeSetEntry::new(object.object_ref(), Action::Unchanged);

        let Some(existing) = self.fetch(ctx, object).await? else {
            return Ok(unchanged);
        };
        if any_in_metadata(&existing, &opts.exclusions)
            || (!opts.inclusions.is_empty() && !any_in_metadata(&existing, &opts.inclusions))
        {
            debug!(object = %object.object_ref(), "skipping delete");
            return Ok(unchanged);
        }

        let deleted = ctx
            .run(self.client.delete(&existing, opts.propagation_policy))
            .await
            .map_err(interrupted(object))?;
        match deleted {
            Ok(()) => {
                info!(object = %object.object_ref(), "deleted");
                Ok(ChangeSetEntry::new(object.object_ref(), Action::Deleted))
            }
            Err(e) if e.is_not_found() => Ok(unchanged),
            Err(source) => Err(ApplyError::Delete {
                object: object.object_ref(),
                source,
            }),
        }
    }

    /// Deletes every object in the given order, stopping at the first failure.
    pub async fn delete_all(
        &self,
        ctx: &Context,
        objects: &[Object],
        opts: &DeleteOptions,
    ) -> Result<ChangeSet, ApplyError> {
        let mut change_set = ChangeSet::new();
        for object in objects {
            change_set.add(self.delete(ctx, object, opts).await?);
        }
        Ok(change_set)
    }
}
