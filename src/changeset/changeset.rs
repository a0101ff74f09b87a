//! Change sets: what an apply or delete did to each object.

use crate::object::ObjectRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The outcome for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Unchanged,
    Created,
    Configured,
    Deleted,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Unchanged => "unchanged",
            Action::Created => "created",
            Action::Configured => "configured",
            Action::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// One object's identity and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetEntry {
    pub object: ObjectRef,
    pub action: Action,
}

impl ChangeSetEntry {
    pub fn new(object: ObjectRef, action: Action) -> Self {
        ChangeSetEntry { object, action }
    }
}

impl fmt::Display for ChangeSetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object, self.action)
    }
}

/// An ordered list of entries, one per object processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    pub fn add(&mut self, entry: ChangeSetEntry) {
        self.entries.push(entry);
    }

    /// Appends the entries of a later phase.
    pub fn append(&mut self, other: ChangeSet) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeSetEntry> {
        self.entries.iter()
    }

    /// Returns the entries that record a write.
    pub fn changed(&self) -> impl Iterator<Item = &ChangeSetEntry> {
        self.entries.iter().filter(|e| e.action != Action::Unchanged)
    }

    /// Maps each object to its action.
    pub fn to_map(&self) -> BTreeMap<ObjectRef, Action> {
        self.entries
            .iter()
            .map(|e| (e.object.clone(), e.action))
            .collect()
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeSetEntry;
    type IntoIter = std::vec::IntoIter<ChangeSetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
