//! Comparison result types.

use crate::fieldpath::Set;
use std::fmt;

/// Comparison holds the fields where a live object departs from the
/// dry-run result it is compared against.
///
/// No field appears in both sets. If both are empty, every field of the
/// dry-run result is already present with the same value in the live object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Fields present in both objects with different values.
    pub modified: Set,
    /// Fields present in the dry-run result but missing from the live object.
    pub added: Set,
}

impl Comparison {
    pub fn new() -> Self {
        Comparison::default()
    }

    /// Returns true if there are no changes.
    pub fn is_same(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty()
    }

    pub fn has_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn has_added(&self) -> bool {
        !self.added.is_empty()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (title, set) in [("Modified", &self.modified), ("Added", &self.added)] {
            if set.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "- {} Fields:", title)?;
            for path in set.paths() {
                write!(f, "\n  {}", path)?;
            }
        }
        Ok(())
    }
}
