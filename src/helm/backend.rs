// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm backend seam.
//!
//! [`HelmBackend`] is what the release manager drives. [`HelmCli`] implements
//! it by running the helm executable with JSON output; tests substitute an
//! in-memory backend.

use crate::error::{ConduitError, Result};
use crate::helm::chart::ChartMetadata;
use crate::helm::release::{parse_history, parse_list, parse_metadata, parse_release, HelmRelease};
use crate::helm::settings::HelmSettings;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Everything install and upgrade need to know about the chart to deploy
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub release: String,
    /// Location handed to helm (`repo/chart`, path or URL)
    pub chart: String,
    pub version: Option<String>,
    pub values: Map<String, Value>,
}

#[async_trait]
pub trait HelmBackend: Send + Sync {
    async fn list(&self, namespace: &str, all_namespaces: bool) -> Result<Vec<HelmRelease>>;

    /// Latest revision of a release, including its stored configuration
    async fn status(&self, namespace: &str, name: &str) -> Result<HelmRelease>;

    async fn install(&self, namespace: &str, request: &ChartRequest) -> Result<HelmRelease>;

    async fn upgrade(&self, namespace: &str, request: &ChartRequest) -> Result<HelmRelease>;

    async fn uninstall(&self, namespace: &str, name: &str) -> Result<()>;

    async fn rollback(&self, namespace: &str, name: &str, revision: u32) -> Result<()>;

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>>;

    /// Metadata of a chart that helm has to locate (repository or remote reference)
    async fn show_chart(&self, chart: &str, version: Option<&str>) -> Result<ChartMetadata>;
}

/// Runs the helm executable
#[derive(Debug, Clone)]
pub struct HelmCli {
    settings: HelmSettings,
}

impl HelmCli {
    pub fn new(settings: HelmSettings) -> Self {
        Self { settings }
    }

    async fn run(&self, operation: &str, args: Vec<OsString>, stdin: Option<String>) -> Result<String> {
        let mut cmd = Command::new(&self.settings.binary);
        cmd.args(&args);
        cmd.args(self.settings.global_args());
        if let Some(driver) = &self.settings.driver {
            cmd.env("HELM_DRIVER", driver);
        }

        if stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!("Running {} {:?}", self.settings.binary, args);
        let mut child = cmd.spawn().map_err(|e| ConduitError::Helm {
            operation: operation.to_string(),
            message: format!("failed to execute {}: {}", self.settings.binary, e),
        })?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes())
                    .await
                    .map_err(|e| ConduitError::Helm {
                        operation: operation.to_string(),
                        message: format!("failed to write values to helm stdin: {}", e),
                    })?;
                drop(pipe);
            }
        }

        let output = child.wait_with_output().await.map_err(|e| ConduitError::Helm {
            operation: operation.to_string(),
            message: format!("failed to wait for helm: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(operation, None, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn deploy(&self, operation: &str, namespace: &str, request: &ChartRequest) -> Result<HelmRelease> {
        let mut args: Vec<OsString> = vec![
            operation.into(),
            request.release.as_str().into(),
            request.chart.as_str().into(),
            "--namespace".into(),
            namespace.into(),
            "--output".into(),
            "json".into(),
        ];
        if let Some(version) = &request.version {
            args.push("--version".into());
            args.push(version.into());
        }

        let stdin = if request.values.is_empty() {
            None
        } else {
            // JSON is a YAML subset, so helm reads it as a values file
            args.push("--values=-".into());
            Some(serde_json::to_string(&request.values)?)
        };

        let output = self
            .run(operation, args, stdin)
            .await
            .map_err(|e| with_chart_context(e, &request.chart))?;
        parse_release(&output)
    }
}

#[async_trait]
impl HelmBackend for HelmCli {
    #[instrument(skip(self))]
    async fn list(&self, namespace: &str, all_namespaces: bool) -> Result<Vec<HelmRelease>> {
        let mut args: Vec<OsString> = vec!["list".into(), "--output".into(), "json".into()];
        if all_namespaces {
            args.push("--all-namespaces".into());
        } else {
            args.push("--namespace".into());
            args.push(namespace.into());
        }
        let output = self.run("list", args, None).await?;
        parse_list(&output)
    }

    /// `helm status` prints no chart, so the release is read through
    /// `get metadata` and `get values` instead
    #[instrument(skip(self))]
    async fn status(&self, namespace: &str, name: &str) -> Result<HelmRelease> {
        let metadata = self
            .run("get metadata", get_args("metadata", name, namespace), None)
            .await?;
        let values = self
            .run("get values", get_args("values", name, namespace), None)
            .await?;
        parse_metadata(&metadata, &values)
    }

    #[instrument(skip(self, request), fields(release = %request.release, chart = %request.chart))]
    async fn install(&self, namespace: &str, request: &ChartRequest) -> Result<HelmRelease> {
        self.deploy("install", namespace, request).await
    }

    #[instrument(skip(self, request), fields(release = %request.release, chart = %request.chart))]
    async fn upgrade(&self, namespace: &str, request: &ChartRequest) -> Result<HelmRelease> {
        self.deploy("upgrade", namespace, request).await
    }

    #[instrument(skip(self))]
    async fn uninstall(&self, namespace: &str, name: &str) -> Result<()> {
        let args = vec!["uninstall".into(), name.into(), "--namespace".into(), namespace.into()];
        self.run("uninstall", args, None).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn rollback(&self, namespace: &str, name: &str, revision: u32) -> Result<()> {
        let args = vec![
            "rollback".into(),
            name.into(),
            revision.to_string().into(),
            "--namespace".into(),
            namespace.into(),
        ];
        self.run("rollback", args, None).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>> {
        let args = vec![
            "history".into(),
            name.into(),
            "--namespace".into(),
            namespace.into(),
            "--output".into(),
            "json".into(),
        ];
        let output = self.run("history", args, None).await?;
        parse_history(&output, name, namespace)
    }

    #[instrument(skip(self))]
    async fn show_chart(&self, chart: &str, version: Option<&str>) -> Result<ChartMetadata> {
        let mut args: Vec<OsString> = vec!["show".into(), "chart".into(), chart.into()];
        if let Some(version) = version {
            args.push("--version".into());
            args.push(version.into());
        }
        let output = self
            .run("show chart", args, None)
            .await
            .map_err(|e| with_chart_context(e, chart))?;
        ChartMetadata::from_yaml(chart, &output)
    }
}

fn get_args(what: &str, name: &str, namespace: &str) -> Vec<OsString> {
    vec![
        "get".into(),
        what.into(),
        name.into(),
        "--namespace".into(),
        namespace.into(),
        "--output".into(),
        "json".into(),
    ]
}

/// Map helm's stderr to an error variant. Chart location failures are only
/// recognized when the operation involved a chart.
pub fn classify_failure(operation: &str, chart: Option<&str>, stderr: &str) -> ConduitError {
    let message = stderr.strip_prefix("Error: ").unwrap_or(stderr).to_string();

    if let Some(chart) = chart {
        let lower = message.to_ascii_lowercase();

        if chart_unavailable(&lower) {
            return ConduitError::ChartNotFound {
                chart: chart.to_string(),
                reason: message,
            };
        }
        if lower.contains("chart.yaml file is missing") || lower.contains("validation: chart.metadata") {
            return ConduitError::ChartLoad {
                chart: chart.to_string(),
                reason: message,
            };
        }
    }

    ConduitError::Helm {
        operation: operation.to_string(),
        message,
    }
}

/// Messages helm prints when it cannot locate or fetch a chart. Other
/// "not found" failures (namespaces, releases, resources) stay generic.
fn chart_unavailable(lower: &str) -> bool {
    lower.contains("failed to download")
        || lower.contains("no chart version found")
        || lower.contains("no such file")
        || quoted_not_found(lower, "chart \"")
        || quoted_not_found(lower, "path \"")
}

/// Whether `lower` contains `<prefix>...<quote> not found`
fn quoted_not_found(lower: &str, prefix: &str) -> bool {
    lower.match_indices(prefix).any(|(idx, _)| {
        let rest = &lower[idx + prefix.len()..];
        rest.find('"')
            .is_some_and(|end| rest[end + 1..].starts_with(" not found"))
    })
}

/// Re-classify a generic helm failure once the chart involved is known
fn with_chart_context(err: ConduitError, chart: &str) -> ConduitError {
    match err {
        ConduitError::Helm { operation, message } => classify_failure(&operation, Some(chart), &message),
        other => other,
    }
}
