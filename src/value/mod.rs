//! Value module - In-memory representation of YAML/JSON documents.
//!
//! Values are plain trees; [`Value::get_path`] and friends address any
//! nested field by a [`crate::fieldpath::Path`].

mod value;

pub use value::*;
