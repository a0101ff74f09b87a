//! Set types for field path tracking.

use super::path::{Path, PathElement};
use std::collections::{BTreeMap, BTreeSet};

/// Set is a prefix tree of paths.
///
/// `members` holds the elements that terminate a path at this level,
/// `children` holds the subtrees of longer paths. An element may appear in
/// both when a path and one of its extensions are in the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    pub members: BTreeSet<PathElement>,
    pub children: BTreeMap<PathElement, Set>,
}

impl Set {
    pub fn new() -> Self {
        Set::default()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.children.values().all(Set::is_empty)
    }

    /// Returns the number of paths in the set.
    pub fn len(&self) -> usize {
        self.members.len() + self.children.values().map(Set::len).sum::<usize>()
    }

    /// Returns true if the set contains the given path.
    pub fn has(&self, path: &Path) -> bool {
        match path.as_slice().split_first() {
            None => false,
            Some((first, [])) => self.members.contains(first),
            Some((first, rest)) => self
                .children
                .get(first)
                .is_some_and(|child| child.has(&Path::from_elements(rest.to_vec()))),
        }
    }

    /// Inserts a path into the set. The empty path is ignored.
    pub fn insert(&mut self, path: &Path) {
        let Some((last, parents)) = path.as_slice().split_last() else {
            return;
        };
        let mut current = self;
        for pe in parents {
            current = current.children.entry(pe.clone()).or_default();
        }
        current.members.insert(last.clone());
    }

    /// Returns the union of two sets.
    pub fn union(&self, other: &Set) -> Set {
        let mut result = self.clone();
        result.members.extend(other.members.iter().cloned());
        for (pe, other_child) in &other.children {
            let merged = match result.children.get(pe) {
                Some(child) => child.union(other_child),
                None => other_child.clone(),
            };
            result.children.insert(pe.clone(), merged);
        }
        result
    }

    /// Calls `f` for every path in the set, in sorted order.
    pub fn iterate<F: FnMut(&Path)>(&self, mut f: F) {
        self.walk(&mut Path::new(), &mut f);
    }

    fn walk<F: FnMut(&Path)>(&self, prefix: &mut Path, f: &mut F) {
        for pe in &self.members {
            prefix.push(pe.clone());
            f(prefix);
            prefix.pop();
        }
        for (pe, child) in &self.children {
            prefix.push(pe.clone());
            child.walk(prefix, f);
            prefix.pop();
        }
    }

    /// Collects every path in the set.
    pub fn paths(&self) -> Vec<Path> {
        let mut paths = Vec::with_capacity(self.len());
        self.iterate(|p| paths.push(p.clone()));
        paths.sort();
        paths
    }
}

impl FromIterator<Path> for Set {
    fn from_iter<T: IntoIterator<Item = Path>>(iter: T) -> Self {
        let mut set = Set::new();
        for path in iter {
            set.insert(&path);
        }
        set
    }
}
