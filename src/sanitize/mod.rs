//! Sanitize module - Cleans legacy ownership metadata off live objects.

mod sanitizer;

pub use sanitizer::*;
