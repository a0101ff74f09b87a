//! Errors reported by cluster clients.

use std::fmt;
use thiserror::Error;

/// The classes of client failure the engine reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request tried to change a field the store forbids mutating.
    ImmutableFieldConflict,
    /// The addressed object does not exist.
    NotFound,
    /// Anything else: validation, transport, authorization.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ImmutableFieldConflict => write!(f, "immutable field conflict"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Other => write!(f, "error"),
        }
    }
}

/// ClientError is a classified failure returned by a [`super::ClusterClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    kind: ErrorKind,
    message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ClientError {
            kind,
            message: message.into(),
        }
    }

    pub fn immutable(message: impl Into<String>) -> Self {
        ClientError::new(ErrorKind::ImmutableFieldConflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ClientError::new(ErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        ClientError::new(ErrorKind::Other, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_immutable(&self) -> bool {
        self.kind == ErrorKind::ImmutableFieldConflict
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = ClientError::immutable("spec.selector: field is immutable");
        assert!(err.is_immutable());
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::ImmutableFieldConflict);
        assert_eq!(err.to_string(), "spec.selector: field is immutable");

        assert!(ClientError::not_found("gone").is_not_found());
        assert_eq!(ClientError::other("boom").kind(), ErrorKind::Other);
    }
}
