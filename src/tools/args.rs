// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Named-argument extraction for tool calls

use crate::error::{ConduitError, Result};
use serde_json::{Map, Value};

/// Read-only view over the arguments of one tool call
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    inner: &'a Map<String, Value>,
}

impl<'a> Arguments<'a> {
    pub fn new(inner: &'a Map<String, Value>) -> Self {
        Self { inner }
    }

    /// A string argument that must be present and non-empty
    pub fn required(&self, name: &str) -> Result<&'a str> {
        self.optional(name)
            .ok_or_else(|| ConduitError::ParameterMissing(name.to_string()))
    }

    /// A string argument; absent, null, non-string and empty all read as `None`
    pub fn optional(&self, name: &str) -> Option<&'a str> {
        self.inner
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Optional string argument with empty meaning "not set"
    pub fn optional_or_empty(&self, name: &str) -> &'a str {
        self.optional(name).unwrap_or_default()
    }

    /// Boolean argument, also accepting `"true"`/`"false"` strings
    pub fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.inner.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(value)) => Ok(*value),
            Some(Value::String(value)) => match value.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                "" => Ok(default),
                _ => Err(invalid(name, "expected a boolean")),
            },
            Some(_) => Err(invalid(name, "expected a boolean")),
        }
    }

    /// Positive integer argument, given as a number or a numeric string
    pub fn positive_integer(&self, name: &str) -> Result<u32> {
        let value = match self.inner.get(name) {
            None | Some(Value::Null) => return Err(ConduitError::ParameterMissing(name.to_string())),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ConduitError::ParameterMissing(name.to_string()))
            }
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };

        value
            .filter(|v| *v > 0)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| invalid(name, "expected a positive integer"))
    }
}

fn invalid(name: &str, reason: &str) -> ConduitError {
    ConduitError::InvalidArgument {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse Helm values YAML. Blank text and an empty document yield no overrides.
pub fn parse_values(text: Option<&str>) -> Result<Map<String, Value>> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Ok(Map::new());
    };

    let value: Value = serde_yaml::from_str(text).map_err(|e| ConduitError::ManifestParse {
        what: "values".to_string(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ConduitError::ManifestParse {
            what: "values".to_string(),
            reason: "values must be a YAML mapping".to_string(),
        }),
    }
}
