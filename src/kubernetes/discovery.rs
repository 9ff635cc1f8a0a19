// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of resource kinds against the cluster's advertised API surface.
//!
//! Nothing is cached: every call re-reads discovery so that CRDs installed or
//! removed between calls are picked up immediately. Enumeration order is the
//! core group first, then every named group in the order the API server lists
//! them, each at its preferred version.

use crate::error::{ConduitError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, APIResource, APIResourceList};
use kube::core::ApiResource;
use kube::Client;
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Coordinates of one resource collection on the API server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.resource)
    }
}

/// One resource type as advertised by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceDescriptor {
    /// Plural resource name, e.g. `deployments`
    pub name: String,
    pub singular_name: String,
    pub namespaced: bool,
    pub kind: String,
    pub group: String,
    pub version: String,
    pub verbs: Vec<String>,
}

impl ApiResourceDescriptor {
    /// Descriptor at the coordinates of the list that carries it. This is the
    /// collection path the resource is served under.
    fn served(resource: &APIResource, group: &str, version: &str) -> Self {
        Self {
            name: resource.name.clone(),
            singular_name: resource.singular_name.clone(),
            namespaced: resource.namespaced,
            kind: resource.kind.clone(),
            group: group.to_string(),
            version: version.to_string(),
            verbs: resource.verbs.clone(),
        }
    }

    /// Descriptor reporting the resource's own group and version when it
    /// advertises them, back-filled from the containing list otherwise
    fn advertised(resource: &APIResource, list_group: &str, list_version: &str) -> Self {
        let group = resource.group.as_deref().filter(|g| !g.is_empty()).unwrap_or(list_group);
        let version = resource
            .version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(list_version);
        Self::served(resource, group, version)
    }

    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource {
            group: self.group.clone(),
            version: self.version.clone(),
            resource: self.name.clone(),
        }
    }

    /// The kube-rs description used to address this collection dynamically
    pub fn api_resource(&self) -> ApiResource {
        let gvr = self.gvr();
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: gvr.api_version(),
            kind: self.kind.clone(),
            plural: self.name.clone(),
        }
    }
}

/// Split an apiVersion string into group and version
pub fn parse_group_version(group_version: &str) -> (&str, &str) {
    match group_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", group_version),
    }
}

/// Subresources such as `pods/log` are addressed through their parent
fn is_subresource(resource: &APIResource) -> bool {
    resource.name.contains('/')
}

/// Top-level resources paired with the group and version of their list
fn top_level(lists: &[APIResourceList]) -> impl Iterator<Item = (&APIResource, &str, &str)> + '_ {
    lists.iter().flat_map(|list| {
        let (group, version) = parse_group_version(&list.group_version);
        list.resources
            .iter()
            .filter(|r| !is_subresource(r))
            .map(move |r| (r, group, version))
    })
}

/// All top-level resources of the given lists in enumeration order, as advertised
pub fn descriptors(lists: &[APIResourceList]) -> impl Iterator<Item = ApiResourceDescriptor> + '_ {
    top_level(lists).map(|(r, group, version)| ApiResourceDescriptor::advertised(r, group, version))
}

/// First descriptor whose kind matches exactly (case-sensitive), addressed
/// at the group/version it is served under
pub fn find_kind(lists: &[APIResourceList], kind: &str) -> Option<ApiResourceDescriptor> {
    top_level(lists)
        .find(|(r, _, _)| r.kind == kind)
        .map(|(r, group, version)| ApiResourceDescriptor::served(r, group, version))
}

/// Filter descriptors by scope
pub fn filter_by_scope(
    lists: &[APIResourceList],
    include_namespaced: bool,
    include_cluster_scoped: bool,
) -> Vec<ApiResourceDescriptor> {
    descriptors(lists)
        .filter(|d| {
            if d.namespaced {
                include_namespaced
            } else {
                include_cluster_scoped
            }
        })
        .collect()
}

fn preferred_group_version(group: &APIGroup) -> Option<String> {
    group
        .preferred_version
        .as_ref()
        .or_else(|| group.versions.first())
        .map(|gv| gv.group_version.clone())
}

/// Resolves kinds to resource coordinates by scanning live discovery
#[derive(Clone)]
pub struct DiscoveryResolver {
    client: Client,
}

impl DiscoveryResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch one resource list per group at its preferred version.
    ///
    /// Failing to reach the discovery roots (`/api`, `/apis`) is fatal. A single
    /// group-version that cannot be listed is logged and skipped, since
    /// aggregated API services are routinely unavailable for short periods.
    #[instrument(skip(self))]
    pub async fn preferred_resource_lists(&self) -> Result<Vec<APIResourceList>> {
        let core_versions = self
            .client
            .list_core_api_versions()
            .await
            .map_err(ConduitError::Discovery)?;
        let groups = self
            .client
            .list_api_groups()
            .await
            .map_err(ConduitError::Discovery)?;

        let mut lists = Vec::new();
        let mut failed = Vec::new();

        if let Some(core_version) = core_versions.versions.first() {
            match self.client.list_core_api_resources(core_version).await {
                Ok(list) => lists.push(list),
                Err(e) => {
                    warn!("Failed to list core API resources ({}): {}", core_version, e);
                    failed.push(core_version.clone());
                }
            }
        }

        for group in &groups.groups {
            let Some(group_version) = preferred_group_version(group) else {
                debug!("API group {} advertises no versions, skipping", group.name);
                continue;
            };
            match self.client.list_api_group_resources(&group_version).await {
                Ok(list) => lists.push(list),
                Err(e) => {
                    warn!("Failed to list API resources for {}: {}", group_version, e);
                    failed.push(group_version);
                }
            }
        }

        if !failed.is_empty() {
            warn!(
                "Discovery incomplete, {} group version(s) unavailable: {}",
                failed.len(),
                failed.join(", ")
            );
        }
        debug!("Discovered {} group version(s)", lists.len());

        Ok(lists)
    }

    /// Resolve a kind to its full descriptor
    #[instrument(skip(self))]
    pub async fn resolve_descriptor(&self, kind: &str) -> Result<ApiResourceDescriptor> {
        let lists = self.preferred_resource_lists().await?;
        let descriptor =
            find_kind(&lists, kind).ok_or_else(|| ConduitError::Resolution(kind.to_string()))?;
        debug!("Resolved kind {} to {}", kind, descriptor.gvr());
        Ok(descriptor)
    }

    /// Resolve a kind to its group/version/resource coordinates
    pub async fn resolve(&self, kind: &str) -> Result<GroupVersionResource> {
        Ok(self.resolve_descriptor(kind).await?.gvr())
    }

    /// List every advertised resource type, filtered by scope
    #[instrument(skip(self))]
    pub async fn list_resource_descriptors(
        &self,
        include_namespaced: bool,
        include_cluster_scoped: bool,
    ) -> Result<Vec<ApiResourceDescriptor>> {
        let lists = self.preferred_resource_lists().await?;
        Ok(filter_by_scope(
            &lists,
            include_namespaced,
            include_cluster_scoped,
        ))
    }
}
