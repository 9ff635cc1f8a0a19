// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm release records and parsing of the helm CLI's JSON output.
//!
//! Accepted shapes: the full release object printed by `install`/`upgrade
//! -o json`, the `get metadata -o json` record paired with `get values -o json`,
//! the summary rows of `list -o json` and the rows of `history -o json`. All
//! of them are normalized into [`HelmRelease`].

use crate::error::{ConduitError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle state of one release revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Deployed,
    Failed,
    PendingInstall,
    PendingUpgrade,
    Uninstalled,
    Superseded,
    Unknown,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::PendingInstall => "pending-install",
            ReleaseStatus::PendingUpgrade => "pending-upgrade",
            ReleaseStatus::Uninstalled => "uninstalled",
            ReleaseStatus::Superseded => "superseded",
            ReleaseStatus::Unknown => "unknown",
        }
    }
}

impl From<&str> for ReleaseStatus {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "deployed" => ReleaseStatus::Deployed,
            "failed" => ReleaseStatus::Failed,
            "pending-install" => ReleaseStatus::PendingInstall,
            // a rollback is carried out as an upgrade to older content
            "pending-upgrade" | "pending-rollback" => ReleaseStatus::PendingUpgrade,
            "uninstalled" | "uninstalling" => ReleaseStatus::Uninstalled,
            "superseded" => ReleaseStatus::Superseded,
            _ => ReleaseStatus::Unknown,
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One revision of a Helm release
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmRelease {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub status: ReleaseStatus,
    pub chart: String,
    pub chart_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct ReleaseObject {
    name: String,
    #[serde(default)]
    namespace: String,
    version: u32,
    info: ReleaseInfo,
    chart: Option<ChartObject>,
    config: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    status: String,
    last_deployed: Option<String>,
}

#[derive(Deserialize)]
struct ChartObject {
    metadata: ChartObjectMetadata,
    values: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct ChartObjectMetadata {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(rename = "appVersion")]
    app_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataRecord {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    chart: String,
    #[serde(default)]
    version: String,
    app_version: Option<String>,
    revision: u32,
    #[serde(default)]
    status: String,
    deployed_at: Option<String>,
}

#[derive(Deserialize)]
struct ListRow {
    name: String,
    namespace: String,
    revision: String,
    updated: String,
    status: String,
    chart: String,
    app_version: Option<String>,
}

#[derive(Deserialize)]
struct HistoryRow {
    revision: u32,
    updated: String,
    status: String,
    chart: String,
    app_version: Option<String>,
}

/// Parse a full release object.
///
/// `values` carries the user-supplied configuration, and only when the chart
/// also ships default values.
pub fn parse_release(output: &str) -> Result<HelmRelease> {
    let release: ReleaseObject =
        serde_json::from_str(output).map_err(|e| unexpected_output("status", e))?;

    let (chart, chart_version, app_version, chart_values) = match release.chart {
        Some(chart) => (
            chart.metadata.name,
            chart.metadata.version,
            chart.metadata.app_version,
            chart.values,
        ),
        None => (String::new(), String::new(), None, None),
    };

    let values = match (release.config, chart_values) {
        (Some(config), Some(_)) if !config.is_empty() => Some(config),
        _ => None,
    };

    Ok(HelmRelease {
        name: release.name,
        namespace: release.namespace,
        revision: release.version,
        status: ReleaseStatus::from(release.info.status.as_str()),
        chart,
        chart_version,
        app_version: app_version.filter(|v| !v.is_empty()),
        updated: release.info.last_deployed.as_deref().and_then(parse_timestamp),
        values,
    })
}

/// Combine `helm get metadata -o json` with `helm get values -o json`.
///
/// `values` is the user-supplied configuration; helm prints `null` when the
/// release was deployed without overrides.
pub fn parse_metadata(metadata: &str, values: &str) -> Result<HelmRelease> {
    let record: MetadataRecord =
        serde_json::from_str(metadata).map_err(|e| unexpected_output("get metadata", e))?;
    let values: Option<Map<String, Value>> = if values.trim().is_empty() {
        None
    } else {
        serde_json::from_str(values).map_err(|e| unexpected_output("get values", e))?
    };

    Ok(HelmRelease {
        name: record.name,
        namespace: record.namespace,
        revision: record.revision,
        status: ReleaseStatus::from(record.status.as_str()),
        chart: record.chart,
        chart_version: record.version,
        app_version: record.app_version.filter(|v| !v.is_empty()),
        updated: record.deployed_at.as_deref().and_then(parse_timestamp),
        values: values.filter(|v| !v.is_empty()),
    })
}

/// Parse the rows printed by `helm list -o json`
pub fn parse_list(output: &str) -> Result<Vec<HelmRelease>> {
    let rows: Vec<ListRow> =
        serde_json::from_str(output).map_err(|e| unexpected_output("list", e))?;

    rows.into_iter()
        .map(|row| {
            let revision = row.revision.parse().map_err(|_| ConduitError::Helm {
                operation: "list".to_string(),
                message: format!("invalid revision '{}' for release {}", row.revision, row.name),
            })?;
            let (chart, chart_version) = split_chart(&row.chart);
            Ok(HelmRelease {
                name: row.name,
                namespace: row.namespace,
                revision,
                status: ReleaseStatus::from(row.status.as_str()),
                chart,
                chart_version,
                app_version: row.app_version.filter(|v| !v.is_empty()),
                updated: parse_timestamp(&row.updated),
                values: None,
            })
        })
        .collect()
}

/// Parse the rows printed by `helm history -o json`; those rows carry neither
/// release name nor namespace.
pub fn parse_history(output: &str, name: &str, namespace: &str) -> Result<Vec<HelmRelease>> {
    let rows: Vec<HistoryRow> =
        serde_json::from_str(output).map_err(|e| unexpected_output("history", e))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let (chart, chart_version) = split_chart(&row.chart);
            HelmRelease {
                name: name.to_string(),
                namespace: namespace.to_string(),
                revision: row.revision,
                status: ReleaseStatus::from(row.status.as_str()),
                chart,
                chart_version,
                app_version: row.app_version.filter(|v| !v.is_empty()),
                updated: parse_timestamp(&row.updated),
                values: None,
            }
        })
        .collect())
}

/// Split `redis-17.0.0` into chart name and version at the first dash that
/// starts a version.
pub fn split_chart(chart: &str) -> (String, String) {
    let bytes = chart.as_bytes();
    for (idx, _) in chart.match_indices('-') {
        let rest = &bytes[idx + 1..];
        let starts_version = match rest {
            [b'v', d, ..] => d.is_ascii_digit(),
            [d, ..] => d.is_ascii_digit(),
            [] => false,
        };
        if starts_version {
            return (chart[..idx].to_string(), chart[idx + 1..].to_string());
        }
    }
    (chart.to_string(), String::new())
}

/// Accepts RFC 3339 and Go's default time format (`2024-01-01 12:00:00.5 +0000 UTC`)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    let go_format: Vec<&str> = value.split_whitespace().take(3).collect();
    if go_format.len() == 3 {
        let joined = go_format.join(" ");
        if let Ok(ts) = DateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.f %z") {
            return Some(ts.with_timezone(&Utc));
        }
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

fn unexpected_output(operation: &str, err: serde_json::Error) -> ConduitError {
    ConduitError::Helm {
        operation: operation.to_string(),
        message: format!("unexpected helm output: {}", err),
    }
}
