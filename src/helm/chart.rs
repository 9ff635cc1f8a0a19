// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Chart reference resolution and local chart metadata

use crate::error::{ConduitError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CHART_FILE: &str = "Chart.yaml";

/// Where a chart is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// Unpacked chart directory containing `Chart.yaml`
    Directory(PathBuf),
    /// Packaged chart archive on disk
    Archive(PathBuf),
    /// `repo/chart`, `oci://` or URL reference located by helm itself
    Remote(String),
}

impl ChartSource {
    /// Argument handed to helm
    pub fn location(&self) -> String {
        match self {
            ChartSource::Directory(path) | ChartSource::Archive(path) => {
                path.to_string_lossy().into_owned()
            }
            ChartSource::Remote(reference) => reference.clone(),
        }
    }
}

/// `Chart.yaml` fields surfaced by `chart_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl ChartMetadata {
    /// Parse and validate `Chart.yaml` content
    pub fn from_yaml(chart: &str, content: &str) -> Result<Self> {
        let metadata: ChartMetadata =
            serde_yaml::from_str(content).map_err(|e| ConduitError::ChartLoad {
                chart: chart.to_string(),
                reason: format!("invalid {}: {}", CHART_FILE, e),
            })?;

        if metadata.name.trim().is_empty() {
            return Err(ConduitError::ChartLoad {
                chart: chart.to_string(),
                reason: "chart.metadata.name is required".to_string(),
            });
        }
        if metadata.version.trim().is_empty() {
            return Err(ConduitError::ChartLoad {
                chart: chart.to_string(),
                reason: "chart.metadata.version is required".to_string(),
            });
        }
        Ok(metadata)
    }
}

/// Chart location as helm sees it: `repo/chart` when a repository is named,
/// the reference itself otherwise
pub fn chart_path(chart: &str, repo: Option<&str>) -> String {
    match repo {
        Some(repo) => format!("{}/{}", repo, chart),
        None => chart.to_string(),
    }
}

/// Resolve a chart reference.
///
/// A named repository must be present in `known_repositories`. Without a
/// repository, anything that looks like a filesystem path must exist.
pub fn resolve(chart: &str, repo: Option<&str>, known_repositories: &[String]) -> Result<ChartSource> {
    if let Some(repo) = repo {
        if !known_repositories.iter().any(|known| known == repo) {
            return Err(ConduitError::ChartNotFound {
                chart: chart_path(chart, Some(repo)),
                reason: format!("repository {} is not configured", repo),
            });
        }
        return Ok(ChartSource::Remote(chart_path(chart, Some(repo))));
    }

    if chart.contains("://") {
        return Ok(ChartSource::Remote(chart.to_string()));
    }

    let path = Path::new(chart);
    if path.is_dir() {
        return Ok(ChartSource::Directory(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(ChartSource::Archive(path.to_path_buf()));
    }
    if looks_like_path(chart) {
        return Err(ConduitError::ChartNotFound {
            chart: chart.to_string(),
            reason: format!("path {} does not exist", chart),
        });
    }

    Ok(ChartSource::Remote(chart.to_string()))
}

fn looks_like_path(chart: &str) -> bool {
    chart.starts_with('/')
        || chart.starts_with("./")
        || chart.starts_with("../")
        || chart.starts_with('~')
        || chart.ends_with(".tgz")
}

/// Load `Chart.yaml` from an unpacked chart directory
pub async fn load_directory(chart: &str, dir: &Path) -> Result<ChartMetadata> {
    let file = dir.join(CHART_FILE);
    let content = tokio::fs::read_to_string(&file).await.map_err(|e| ConduitError::ChartLoad {
        chart: chart.to_string(),
        reason: format!("cannot read {}: {}", file.display(), e),
    })?;
    ChartMetadata::from_yaml(chart, &content)
}
