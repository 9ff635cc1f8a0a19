// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Schema-less resource documents.
//!
//! Cluster objects are carried as [`serde_json::Value`] trees so that fields
//! unknown to this crate survive a read-modify-write unchanged. Only the few
//! fields the dynamic client needs (`metadata.name`, `metadata.namespace`) are
//! read by key.

use crate::error::{ConduitError, Result};
use kube::api::DynamicObject;
use serde_json::Value;

/// One cluster object in untyped form
pub type ResourceDocument = Value;

/// Parse manifest text into a document. The top level must be a JSON object.
pub fn parse_manifest(manifest: &str) -> Result<ResourceDocument> {
    let value: Value = serde_json::from_str(manifest).map_err(|e| ConduitError::ManifestParse {
        what: "resource manifest".to_string(),
        reason: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(ConduitError::ManifestParse {
            what: "resource manifest".to_string(),
            reason: format!("expected a JSON object, got {}", value_type(&value)),
        });
    }

    Ok(value)
}

/// `metadata.name`, if set to a string
pub fn document_name(doc: &ResourceDocument) -> Option<&str> {
    metadata_str(doc, "name")
}

/// `metadata.namespace`, if set to a non-empty string
pub fn document_namespace(doc: &ResourceDocument) -> Option<&str> {
    metadata_str(doc, "namespace").filter(|ns| !ns.is_empty())
}

fn metadata_str<'a>(doc: &'a ResourceDocument, key: &str) -> Option<&'a str> {
    doc.get("metadata")?.get(key)?.as_str()
}

/// Convert a document into the dynamic object type the kube API expects
pub fn to_dynamic_object(doc: ResourceDocument) -> Result<DynamicObject> {
    serde_json::from_value(doc).map_err(|e| ConduitError::ManifestParse {
        what: "resource manifest".to_string(),
        reason: e.to_string(),
    })
}

/// Convert an object returned by the API server back into a document
pub fn from_dynamic_object(obj: DynamicObject) -> Result<ResourceDocument> {
    Ok(serde_json::to_value(obj)?)
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
