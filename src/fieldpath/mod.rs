//! Field path module - Addresses fields in nested documents and tracks which
//! fields a manager owns.
//!
//! Paths are used both to navigate [`crate::value::Value`] trees and as the
//! members of ownership [`Set`]s decoded from `metadata.managedFields`.

mod path;
mod serialize;
mod set;

pub use path::*;
pub use serialize::*;
pub use set::*;
