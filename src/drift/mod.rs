//! Drift module - Decides whether a live object needs to be written.
//!
//! The live object is compared against the server's dry-run apply result;
//! only fields the dry-run result carries are considered.

mod comparison;
mod detector;

pub use comparison::*;
pub use detector::*;
