//! Entries of `metadata.managedFields`.

use crate::fieldpath::{SerializeError, Set};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of request that gave a manager its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagedFieldsOperation {
    Apply,
    Update,
}

impl fmt::Display for ManagedFieldsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedFieldsOperation::Apply => write!(f, "Apply"),
            ManagedFieldsOperation::Update => write!(f, "Update"),
        }
    }
}

/// One field manager's claim on an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFieldsEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manager: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<ManagedFieldsOperation>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_type: Option<String>,
    #[serde(default, rename = "fieldsV1", skip_serializing_if = "Option::is_none")]
    pub fields_v1: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subresource: Option<String>,
}

impl ManagedFieldsEntry {
    pub fn new(manager: impl Into<String>, operation: ManagedFieldsOperation) -> Self {
        ManagedFieldsEntry {
            manager: manager.into(),
            operation: Some(operation),
            fields_type: Some("FieldsV1".to_string()),
            ..Default::default()
        }
    }

    /// Attaches the owned field set.
    pub fn with_fields(mut self, fields: &Set) -> Self {
        self.fields_v1 = Some(fields.to_fields_v1());
        self
    }

    /// Decodes the set of fields this manager owns.
    pub fn fields(&self) -> Result<Set, SerializeError> {
        match &self.fields_v1 {
            Some(raw) => Set::from_fields_v1(raw),
            None => Ok(Set::new()),
        }
    }

    /// True when this entry was written by `manager` with `operation`.
    pub fn is(&self, manager: &str, operation: ManagedFieldsOperation) -> bool {
        self.manager == manager && self.operation == Some(operation)
    }

    pub fn to_value(&self) -> Value {
        // Every field is a plain string, enum or Value, so encoding cannot fail.
        serde_json::to_value(self)
            .map(Value::from)
            .unwrap_or_default()
    }
}
