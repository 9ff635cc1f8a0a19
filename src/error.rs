// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConduitError {
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("Missing required parameter: {0}")]
    ParameterMissing(String),

    #[error("Invalid value for parameter {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Failed to parse {what}: {reason}")]
    ManifestParse { what: String, reason: String },

    #[error("Name in manifest ({manifest}) does not match requested name ({requested})")]
    NameMismatch { manifest: String, requested: String },

    #[error("Resource kind {0} not found in cluster discovery")]
    Resolution(String),

    #[error("API discovery failed: {0}")]
    Discovery(#[source] kube::Error),

    #[error("{kind} {name} not found{}", namespace_suffix(.namespace))]
    ResourceNotFound {
        kind: String,
        name: String,
        namespace: Option<String>,
    },

    #[error("Kubernetes API error while trying to {operation}: {source}")]
    Backend {
        operation: String,
        #[source]
        source: kube::Error,
    },

    #[error("Chart {chart} not found: {reason}")]
    ChartNotFound { chart: String, reason: String },

    #[error("Failed to load chart {chart}: {reason}")]
    ChartLoad { chart: String, reason: String },

    #[error("Helm {operation} failed: {message}")]
    Helm { operation: String, message: String },

    #[error("Repository {0} not found")]
    RepositoryNotFound(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool {0} is disabled")]
    ToolDisabled(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

fn namespace_suffix(namespace: &Option<String>) -> String {
    match namespace {
        Some(ns) => format!(" in namespace {}", ns),
        None => String::new(),
    }
}

impl ConduitError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConduitError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for both the typed not-found variant and a raw 404 from the API server
    pub fn is_not_found(&self) -> bool {
        match self {
            ConduitError::ResourceNotFound { .. } => true,
            ConduitError::Backend {
                source: kube::Error::Api(err),
                ..
            } => err.code == 404,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConduitError>;
