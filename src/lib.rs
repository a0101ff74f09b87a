//! # kube-ssa
//!
//! A server-side apply engine for Kubernetes-style object stores.
//!
//! Desired objects are dry-run against the store, compared with the live
//! state and written only when they would change something. Objects first
//! managed by client-side tools are cleaned of stale ownership metadata on the
//! way, and batches containing schema or namespace definitions can be applied
//! in two stages.
//!
//! ## Modules
//!
//! - [`value`] - In-memory representation of YAML/JSON documents addressable by field path
//! - [`fieldpath`] - Field paths, field sets and the `fieldsV1` ownership encoding
//! - [`object`] - Cluster objects, their identity and managed fields entries
//! - [`changeset`] - The per-object outcome of an engine call
//! - [`drift`] - Detects whether a dry-run result differs from the live object
//! - [`sanitize`] - Removes stale field managers and client-side apply leftovers
//! - [`client`] - The object store capability, its errors and cancellation
//! - [`manager`] - Apply, staged apply, wait, diff and delete

pub mod changeset;
pub mod client;
pub mod drift;
pub mod error;
pub mod fieldpath;
pub mod manager;
pub mod object;
pub mod sanitize;
pub mod value;

pub use changeset::{Action, ChangeSet, ChangeSetEntry};
pub use client::{ClientError, ClusterClient, Context, ErrorKind};
pub use drift::{Comparison, DriftDetector};
pub use error::ApplyError;
pub use fieldpath::{Path, PathElement, Set as FieldPathSet};
pub use manager::{
    ApplyOptions, DeleteOptions, ManagerConfig, ResourceManager, ResourceManagerBuilder,
    WaitOptions,
};
pub use object::{Object, ObjectRef};
pub use value::Value;
