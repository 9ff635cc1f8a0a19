// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm Release Manager.
//!
//! A manager is bound to one namespace and never mutated. [`HelmReleaseManager::with_namespace`]
//! hands out a manager for another namespace that shares the same backend, so
//! concurrent callers cannot change each other's target namespace.

use crate::error::{ConduitError, Result};
use crate::helm::backend::{ChartRequest, HelmBackend};
use crate::helm::chart::{self, ChartMetadata, ChartSource};
use crate::helm::release::HelmRelease;
use crate::helm::repository::HelmRepositoryStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Chart coordinates supplied to install and upgrade
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSpec<'a> {
    pub chart: &'a str,
    pub version: Option<&'a str>,
    pub repo: Option<&'a str>,
    pub values: Map<String, Value>,
}

#[derive(Clone)]
pub struct HelmReleaseManager {
    backend: Arc<dyn HelmBackend>,
    repositories: HelmRepositoryStore,
    namespace: String,
}

impl HelmReleaseManager {
    pub fn new(
        backend: Arc<dyn HelmBackend>,
        repositories: HelmRepositoryStore,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            repositories,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Manager bound to `namespace`; an empty namespace keeps the current binding
    pub fn with_namespace(&self, namespace: &str) -> Self {
        if namespace.is_empty() {
            return self.clone();
        }
        Self {
            backend: self.backend.clone(),
            repositories: self.repositories.clone(),
            namespace: namespace.to_string(),
        }
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn list(&self, all_namespaces: bool) -> Result<Vec<HelmRelease>> {
        let releases = self.backend.list(&self.namespace, all_namespaces).await?;
        debug!("Found {} releases", releases.len());
        Ok(releases)
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get(&self, name: &str) -> Result<HelmRelease> {
        self.backend.status(&self.namespace, name).await
    }

    #[instrument(skip(self, spec), fields(namespace = %self.namespace, chart = spec.chart))]
    pub async fn install(&self, name: &str, spec: ChartSpec<'_>) -> Result<HelmRelease> {
        let request = self.chart_request(name, &spec).await?;
        let mut release = self.backend.install(&self.namespace, &request).await?;
        info!(
            "Installed release {} ({} {}) revision {}",
            release.name, release.chart, release.chart_version, release.revision
        );
        release.values = non_empty(request.values);
        Ok(release)
    }

    #[instrument(skip(self, spec), fields(namespace = %self.namespace, chart = spec.chart))]
    pub async fn upgrade(&self, name: &str, spec: ChartSpec<'_>) -> Result<HelmRelease> {
        let request = self.chart_request(name, &spec).await?;
        let mut release = self.backend.upgrade(&self.namespace, &request).await?;
        info!(
            "Upgraded release {} to {} {} revision {}",
            release.name, release.chart, release.chart_version, release.revision
        );
        release.values = non_empty(request.values);
        Ok(release)
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn uninstall(&self, name: &str) -> Result<()> {
        self.backend.uninstall(&self.namespace, name).await?;
        info!("Uninstalled release {}", name);
        Ok(())
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn rollback(&self, name: &str, revision: u32) -> Result<()> {
        if revision == 0 {
            return Err(ConduitError::InvalidArgument {
                name: "revision".to_string(),
                reason: "revision must be a positive integer".to_string(),
            });
        }
        self.backend.rollback(&self.namespace, name, revision).await?;
        info!("Rolled back release {} to revision {}", name, revision);
        Ok(())
    }

    /// Every recorded revision, oldest first
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn history(&self, name: &str) -> Result<Vec<HelmRelease>> {
        self.backend.history(&self.namespace, name).await
    }

    /// Metadata of a chart, read locally for chart directories
    #[instrument(skip(self))]
    pub async fn chart_info(
        &self,
        chart: &str,
        version: Option<&str>,
        repo: Option<&str>,
    ) -> Result<ChartMetadata> {
        match self.locate(chart, repo).await? {
            ChartSource::Directory(dir) => chart::load_directory(chart, &dir).await,
            source => self.backend.show_chart(&source.location(), version).await,
        }
    }

    async fn locate(&self, chart: &str, repo: Option<&str>) -> Result<ChartSource> {
        let known = match repo {
            Some(_) => self.repositories.names().await?,
            None => Vec::new(),
        };
        chart::resolve(chart, repo, &known)
    }

    async fn chart_request(&self, name: &str, spec: &ChartSpec<'_>) -> Result<ChartRequest> {
        let source = self.locate(spec.chart, spec.repo).await?;
        if let ChartSource::Directory(dir) = &source {
            // surface a broken chart before helm touches the cluster
            chart::load_directory(spec.chart, dir).await?;
        }

        Ok(ChartRequest {
            release: name.to_string(),
            chart: source.location(),
            version: spec.version.map(str::to_string),
            values: spec.values.clone(),
        })
    }
}

fn non_empty(values: Map<String, Value>) -> Option<Map<String, Value>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
