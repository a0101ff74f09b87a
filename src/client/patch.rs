//! Patch requests sent through a cluster client.

use crate::fieldpath::Path;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A single RFC 6902 JSON patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum JsonPatch {
    Remove {
        path: String,
    },
    Replace {
        path: String,
        value: Value,
    },
    Test {
        path: String,
        value: Value,
    },
}

impl JsonPatch {
    /// Builds a remove operation. Paths without a JSON pointer form are
    /// rejected.
    pub fn remove(path: &Path) -> Option<Self> {
        Some(JsonPatch::Remove {
            path: path.to_json_pointer()?,
        })
    }

    pub fn replace(path: &Path, value: Value) -> Option<Self> {
        Some(JsonPatch::Replace {
            path: path.to_json_pointer()?,
            value,
        })
    }

    pub fn pointer(&self) -> &str {
        match self {
            JsonPatch::Remove { path }
            | JsonPatch::Replace { path, .. }
            | JsonPatch::Test { path, .. } => path,
        }
    }
}

/// What a patch request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSpec {
    /// Server-side apply of the whole object.
    Apply,
    /// A list of JSON patch operations against the live object.
    Json(Vec<JsonPatch>),
}

impl PatchSpec {
    /// Encodes a JSON patch body. `None` for server-side apply, whose body
    /// is the object itself.
    pub fn json_body(&self) -> Option<String> {
        match self {
            PatchSpec::Apply => None,
            PatchSpec::Json(ops) => serde_json::to_string(ops).ok(),
        }
    }
}

/// Request options for a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// The field manager the written fields are attributed to.
    pub field_manager: String,
    /// Simulate the request on the server without persisting it.
    pub dry_run: bool,
    /// Take ownership of fields owned by other managers instead of failing.
    pub force: bool,
}

impl PatchOptions {
    pub fn new(field_manager: impl Into<String>) -> Self {
        PatchOptions {
            field_manager: field_manager.into(),
            ..Default::default()
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }
}

/// How dependents of a deleted object are cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationPolicy {
    #[default]
    Background,
    Foreground,
    Orphan,
}
