//! Object module - Cluster objects as generic documents.
//!
//! An [`Object`] is a [`crate::value::Value`] map with a kind, apiVersion and
//! metadata header. Ownership metadata is decoded into
//! [`ManagedFieldsEntry`] values on demand.

mod managed_fields;
mod object;

pub use managed_fields::*;
pub use object::*;
