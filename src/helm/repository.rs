// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm repository index (`repositories.yaml`) maintenance.
//!
//! Every mutation loads the whole file, modifies it and writes it back through
//! a temporary file renamed over the original. Mutations on one store are
//! serialized by an async mutex, so concurrent `add` calls cannot drop each
//! other's entries.

use crate::constants::helm::REPOSITORY_SCHEMES;
use crate::error::{ConduitError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use url::Url;

/// One named repository as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Fields such as `caFile` or `insecure_skip_tls_verify` that are kept as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            username: String::new(),
            password: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_credentials(mut self, username: Option<&str>, password: Option<&str>) -> Self {
        self.username = username.unwrap_or_default().to_string();
        self.password = password.unwrap_or_default().to_string();
        self
    }
}

/// Listing representation; credentials are never returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryFile {
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default)]
    generated: Option<DateTime<Utc>>,
    #[serde(default)]
    repositories: Vec<RepositoryEntry>,
}

impl Default for RepositoryFile {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: Some(Utc::now()),
            repositories: Vec::new(),
        }
    }
}

fn default_api_version() -> String {
    "v1".to_string()
}

#[derive(Debug, Clone)]
pub struct HelmRepositoryStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl HelmRepositoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the entry with the same name
    #[instrument(skip(self, entry), fields(name = %entry.name, url = %entry.url))]
    pub async fn add(&self, entry: RepositoryEntry) -> Result<()> {
        validate_entry(&entry)?;

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConduitError::io(parent, e))?;
        }

        let mut file = self.load().await?.unwrap_or_default();
        match file.repositories.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => {
                debug!("Replacing repository {}", entry.name);
                let mut extra = std::mem::take(&mut existing.extra);
                extra.extend(entry.extra.clone());
                *existing = RepositoryEntry { extra, ..entry.clone() };
            }
            None => file.repositories.push(entry.clone()),
        }

        self.persist(file).await?;
        info!("Added Helm repository {}", entry.name);
        Ok(())
    }

    /// Remove a named entry; the file is left untouched when it is absent
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = self
            .load()
            .await?
            .ok_or_else(|| ConduitError::RepositoryNotFound(name.to_string()))?;

        let before = file.repositories.len();
        file.repositories.retain(|entry| entry.name != name);
        if file.repositories.len() == before {
            return Err(ConduitError::RepositoryNotFound(name.to_string()));
        }

        self.persist(file).await?;
        info!("Removed Helm repository {}", name);
        Ok(())
    }

    /// Name and URL of every entry; an absent file is an empty index
    pub async fn list(&self) -> Result<Vec<RepositorySummary>> {
        let file = self.load().await?.unwrap_or_default();
        Ok(file
            .repositories
            .into_iter()
            .map(|entry| RepositorySummary {
                name: entry.name,
                url: entry.url,
            })
            .collect())
    }

    /// Names of every configured repository
    pub async fn names(&self) -> Result<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|entry| entry.name).collect())
    }

    async fn load(&self) -> Result<Option<RepositoryFile>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConduitError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Some(RepositoryFile::default()));
        }

        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| ConduitError::ManifestParse {
                what: format!("repository file {}", self.path.display()),
                reason: e.to_string(),
            })
    }

    async fn persist(&self, mut file: RepositoryFile) -> Result<()> {
        file.generated = Some(Utc::now());
        let content = serde_yaml::to_string(&file).map_err(|e| {
            ConduitError::io(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, content.as_bytes()))
            .await
            .map_err(|e| ConduitError::io(&self.path, std::io::Error::other(e)))?
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConduitError::io(dir, e))?;
    tmp.write_all(content).map_err(|e| ConduitError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| ConduitError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ConduitError::io(path, e.error))?;
    Ok(())
}

fn validate_entry(entry: &RepositoryEntry) -> Result<()> {
    if entry.name.trim().is_empty() {
        return Err(ConduitError::ParameterMissing("name".to_string()));
    }
    if entry.name.contains('/') {
        return Err(ConduitError::InvalidArgument {
            name: "name".to_string(),
            reason: "repository names cannot contain '/'".to_string(),
        });
    }

    let url = Url::parse(&entry.url).map_err(|e| ConduitError::InvalidArgument {
        name: "url".to_string(),
        reason: format!("{}: {}", entry.url, e),
    })?;
    if !REPOSITORY_SCHEMES.contains(&url.scheme()) {
        return Err(ConduitError::InvalidArgument {
            name: "url".to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(())
}
