//! Client module - The cluster capability the engine is written against.
//!
//! The engine never talks to an object store directly. It needs four
//! operations, described by [`ClusterClient`], and classifies the failures
//! they return with [`ErrorKind`]. Retrying transient failures is the
//! client's concern.

mod context;
mod error;
mod patch;

#[cfg(test)]
pub(crate) mod fake;

pub use context::*;
pub use error::*;
pub use patch::*;

use crate::object::Object;
use async_trait::async_trait;

/// ClusterClient is the minimal surface of an object store.
///
/// Objects passed in are only used for their identity and type, except for
/// `patch` with [`PatchSpec::Apply`], which sends the whole object.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetches the live object. `Ok(None)` when it does not exist.
    async fn get(&self, object: &Object) -> Result<Option<Object>, ClientError>;

    /// Patches an object and returns the result as the store sees it.
    async fn patch(
        &self,
        object: &Object,
        patch: &PatchSpec,
        options: &PatchOptions,
    ) -> Result<Object, ClientError>;

    /// Deletes an object.
    async fn delete(&self, object: &Object, propagation: PropagationPolicy)
        -> Result<(), ClientError>;

    /// Reports whether the object has reached its ready condition.
    async fn is_ready(&self, object: &Object) -> Result<bool, ClientError>;
}

#[async_trait]
impl<C: ClusterClient + ?Sized> ClusterClient for std::sync::Arc<C> {
    async fn get(&self, object: &Object) -> Result<Option<Object>, ClientError> {
        (**self).get(object).await
    }

    async fn patch(
        &self,
        object: &Object,
        patch: &PatchSpec,
        options: &PatchOptions,
    ) -> Result<Object, ClientError> {
        (**self).patch(object, patch, options).await
    }

    async fn delete(
        &self,
        object: &Object,
        propagation: PropagationPolicy,
    ) -> Result<(), ClientError> {
        (**self).delete(object, propagation).await
    }

    async fn is_ready(&self, object: &Object) -> Result<bool, ClientError> {
        (**self).is_ready(object).await
    }
}
