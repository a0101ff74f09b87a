//! Changeset module - The per-object outcomes of an engine call.

mod changeset;

pub use changeset::*;
