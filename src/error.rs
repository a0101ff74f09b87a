//! Errors returned by the apply engine.

use crate::client::{Cancelled, ClientError};
use crate::object::{ObjectError, ObjectRef};
use std::time::Duration;
use thiserror::Error;

/// ApplyError is every failure the engine reports.
///
/// Each variant names the object it concerns, so callers can tie a failure
/// back to one of their inputs. Nothing is retried before it is returned.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{object} query failed: {source}")]
    Fetch {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    /// The dry-run rejected the object. Immutable field conflicts end up
    /// here when force is off, see [`ApplyError::is_immutable_conflict`].
    #[error("{object} dry-run failed: {source}")]
    Validation {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("{object} immutable field detected, failed to delete object: {source}")]
    Recreate {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("{object} metadata.managedFields cleanup failed: {source}")]
    Sanitize {
        object: ObjectRef,
        #[source]
        source: SanitizeFailure,
    },

    #[error("{object} apply failed: {source}")]
    Write {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("{object} delete failed: {source}")]
    Delete {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("{object} readiness check failed: {source}")]
    Readiness {
        object: ObjectRef,
        #[source]
        source: ClientError,
    },

    #[error("timeout waiting for {} after {timeout:?}", display_refs(.pending))]
    WaitTimeout {
        pending: Vec<ObjectRef>,
        timeout: Duration,
    },

    #[error("{} interrupted: {cause}", display_target(.object))]
    Cancelled {
        object: Option<ObjectRef>,
        cause: Cancelled,
    },
}

/// Why a managed fields cleanup could not be performed.
#[derive(Debug, Error)]
pub enum SanitizeFailure {
    #[error(transparent)]
    Decode(#[from] ObjectError),

    #[error(transparent)]
    Patch(#[from] ClientError),
}

impl ApplyError {
    /// The object the error concerns, if it concerns exactly one.
    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            ApplyError::Fetch { object, .. }
            | ApplyError::Validation { object, .. }
            | ApplyError::Recreate { object, .. }
            | ApplyError::Sanitize { object, .. }
            | ApplyError::Write { object, .. }
            | ApplyError::Delete { object, .. }
            | ApplyError::Readiness { object, .. } => Some(object),
            ApplyError::Cancelled { object, .. } => object.as_ref(),
            ApplyError::WaitTimeout { .. } => None,
        }
    }

    /// True when a dry-run was rejected for changing an immutable field.
    pub fn is_immutable_conflict(&self) -> bool {
        matches!(self, ApplyError::Validation { source, .. } if source.is_immutable())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApplyError::Cancelled { .. })
    }
}

fn display_refs(refs: &[ObjectRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_target(object: &Option<ObjectRef>) -> String {
    match object {
        Some(object) => object.to_string(),
        None => "operation".to_string(),
    }
}
