// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Tool dispatch.
//!
//! A tool call is a name plus a map of named arguments. [`ToolRouter`] checks
//! that the tool is enabled, validates and parses its arguments, and runs the
//! matching operation. Documents come back as JSON text, everything else as a
//! confirmation message.

pub mod args;

use crate::config::ToolToggles;
use crate::constants::tools;
use crate::error::{ConduitError, Result};
use crate::helm::{ChartSpec, HelmReleaseManager, HelmRepositoryStore, RepositoryEntry};
use crate::kubernetes::DynamicResourceClient;
use args::{parse_values, Arguments};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Every tool in registration order
pub const ALL_TOOLS: &[&str] = &[
    tools::GET_API_RESOURCES,
    tools::GET_RESOURCE,
    tools::LIST_RESOURCES,
    tools::CREATE_RESOURCE,
    tools::UPDATE_RESOURCE,
    tools::DELETE_RESOURCE,
    tools::LIST_HELM_RELEASES,
    tools::GET_HELM_RELEASE,
    tools::GET_HELM_RELEASE_HISTORY,
    tools::INSTALL_HELM_CHART,
    tools::UPGRADE_HELM_CHART,
    tools::UNINSTALL_HELM_CHART,
    tools::ROLLBACK_HELM_RELEASE,
    tools::LIST_HELM_REPOS,
    tools::ADD_HELM_REPO,
    tools::REMOVE_HELM_REPO,
];

pub struct ToolRouter {
    toggles: ToolToggles,
    resources: DynamicResourceClient,
    releases: HelmReleaseManager,
    repositories: HelmRepositoryStore,
}

impl ToolRouter {
    pub fn new(
        toggles: ToolToggles,
        resources: DynamicResourceClient,
        releases: HelmReleaseManager,
        repositories: HelmRepositoryStore,
    ) -> Self {
        Self {
            toggles,
            resources,
            releases,
            repositories,
        }
    }

    /// `None` for a tool name that does not exist
    pub fn is_enabled(&self, tool: &str) -> Option<bool> {
        let t = &self.toggles;
        let enabled = match tool {
            tools::GET_API_RESOURCES | tools::GET_RESOURCE => true,
            tools::LIST_RESOURCES => t.list,
            tools::CREATE_RESOURCE => t.create,
            tools::UPDATE_RESOURCE => t.update,
            tools::DELETE_RESOURCE => t.delete,
            tools::LIST_HELM_RELEASES => t.helm_release_list,
            tools::GET_HELM_RELEASE | tools::GET_HELM_RELEASE_HISTORY => t.helm_release_get,
            tools::INSTALL_HELM_CHART => t.helm_install,
            tools::UPGRADE_HELM_CHART => t.helm_upgrade,
            tools::UNINSTALL_HELM_CHART => t.helm_uninstall,
            tools::ROLLBACK_HELM_RELEASE => t.helm_rollback,
            tools::LIST_HELM_REPOS => t.helm_repo_list,
            tools::ADD_HELM_REPO => t.helm_repo_add,
            tools::REMOVE_HELM_REPO => t.helm_repo_remove,
            _ => return None,
        };
        Some(enabled)
    }

    pub fn enabled_tools(&self) -> Vec<&'static str> {
        ALL_TOOLS
            .iter()
            .copied()
            .filter(|tool| self.is_enabled(tool) == Some(true))
            .collect()
    }

    /// Run one tool call and return its text payload
    #[instrument(skip(self, arguments))]
    pub async fn call(&self, tool: &str, arguments: &Map<String, Value>) -> Result<String> {
        match self.is_enabled(tool) {
            None => return Err(ConduitError::UnknownTool(tool.to_string())),
            Some(false) => {
                warn!("Rejected call to disabled tool {}", tool);
                return Err(ConduitError::ToolDisabled(tool.to_string()));
            }
            Some(true) => {}
        }

        let args = Arguments::new(arguments);
        debug!("Dispatching {}", tool);

        match tool {
            tools::GET_API_RESOURCES => self.get_api_resources(args).await,
            tools::GET_RESOURCE => self.get_resource(args).await,
            tools::LIST_RESOURCES => self.list_resources(args).await,
            tools::CREATE_RESOURCE => self.create_resource(args).await,
            tools::UPDATE_RESOURCE => self.update_resource(args).await,
            tools::DELETE_RESOURCE => self.delete_resource(args).await,
            tools::LIST_HELM_RELEASES => self.list_helm_releases(args).await,
            tools::GET_HELM_RELEASE => self.get_helm_release(args).await,
            tools::GET_HELM_RELEASE_HISTORY => self.get_helm_release_history(args).await,
            tools::INSTALL_HELM_CHART => self.install_helm_chart(args).await,
            tools::UPGRADE_HELM_CHART => self.upgrade_helm_chart(args).await,
            tools::UNINSTALL_HELM_CHART => self.uninstall_helm_chart(args).await,
            tools::ROLLBACK_HELM_RELEASE => self.rollback_helm_release(args).await,
            tools::LIST_HELM_REPOS => self.list_helm_repos().await,
            tools::ADD_HELM_REPO => self.add_helm_repo(args).await,
            tools::REMOVE_HELM_REPO => self.remove_helm_repo(args).await,
            _ => Err(ConduitError::UnknownTool(tool.to_string())),
        }
    }

    async fn get_api_resources(&self, args: Arguments<'_>) -> Result<String> {
        let include_namespaced = args.flag("includeNamespaceScoped", true)?;
        let include_cluster = args.flag("includeClusterScoped", true)?;

        let descriptors = self
            .resources
            .resolver()
            .list_resource_descriptors(include_namespaced, include_cluster)
            .await?;
        to_json(&descriptors)
    }

    async fn get_resource(&self, args: Arguments<'_>) -> Result<String> {
        let kind = args.required("kind")?;
        let name = args.required("name")?;
        let namespace = args.optional_or_empty("namespace");

        to_json(&self.resources.get(kind, name, namespace).await?)
    }

    async fn list_resources(&self, args: Arguments<'_>) -> Result<String> {
        let kind = args.required("kind")?;
        let namespace = args.optional_or_empty("namespace");
        let label_selector = args.optional_or_empty("labelSelector");
        let field_selector = args.optional_or_empty("fieldSelector");

        let items = self
            .resources
            .list(kind, namespace, label_selector, field_selector)
            .await?;
        to_json(&items)
    }

    async fn create_resource(&self, args: Arguments<'_>) -> Result<String> {
        let kind = args.required("kind")?;
        let manifest = args.required("manifest")?;
        let namespace = args.optional_or_empty("namespace");

        to_json(&self.resources.create(kind, namespace, manifest).await?)
    }

    async fn update_resource(&self, args: Arguments<'_>) -> Result<String> {
        let kind = args.required("kind")?;
        let name = args.required("name")?;
        let manifest = args.required("manifest")?;
        let namespace = args.optional_or_empty("namespace");

        to_json(&self.resources.update(kind, name, namespace, manifest).await?)
    }

    async fn delete_resource(&self, args: Arguments<'_>) -> Result<String> {
        let kind = args.required("kind")?;
        let name = args.required("name")?;
        let namespace = args.optional_or_empty("namespace");

        self.resources.delete(kind, name, namespace).await?;
        Ok(format!("Successfully deleted resource {}/{}", kind, name))
    }

    async fn list_helm_releases(&self, args: Arguments<'_>) -> Result<String> {
        let all_namespaces = args.flag("allNamespaces", false)?;
        to_json(&self.releases.list(all_namespaces).await?)
    }

    async fn get_helm_release(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let releases = self.releases.with_namespace(args.optional_or_empty("namespace"));
        to_json(&releases.get(name).await?)
    }

    async fn get_helm_release_history(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let releases = self.releases.with_namespace(args.optional_or_empty("namespace"));
        to_json(&releases.history(name).await?)
    }

    async fn install_helm_chart(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let spec = chart_spec(args)?;
        let releases = self.releases.with_namespace(args.optional_or_empty("namespace"));
        to_json(&releases.install(name, spec).await?)
    }

    async fn upgrade_helm_chart(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let spec = chart_spec(args)?;
        let releases = self.releases.with_namespace(args.optional_or_empty("namespace"));
        to_json(&releases.upgrade(name, spec).await?)
    }

    async fn uninstall_helm_chart(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let releases = self.releases.with_namespace(args.optional_or_empty("namespace"));
        releases.uninstall(name).await?;
        Ok(format!("Successfully uninstalled Helm release {}", name))
    }

    async fn rollback_helm_release(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let revision = args.positive_integer("revision")?;
        let releases = self.releases.with_namespace(args.optional_or_empty("namespace"));
        releases.rollback(name, revision).await?;
        Ok(format!(
            "Successfully rolled back Helm release {} to revision {}",
            name, revision
        ))
    }

    async fn list_helm_repos(&self) -> Result<String> {
        to_json(&self.repositories.list().await?)
    }

    async fn add_helm_repo(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        let url = args.required("url")?;
        let entry = RepositoryEntry::new(name, url)
            .with_credentials(args.optional("username"), args.optional("password"));

        self.repositories.add(entry).await?;
        Ok(format!("Successfully added Helm repository {}", name))
    }

    async fn remove_helm_repo(&self, args: Arguments<'_>) -> Result<String> {
        let name = args.required("name")?;
        self.repositories.remove(name).await?;
        Ok(format!("Successfully removed Helm repository {}", name))
    }
}

/// Required `chart`, optional `version`/`repo`, and `values` parsed up front
fn chart_spec(args: Arguments<'_>) -> Result<ChartSpec<'_>> {
    let chart = args.required("chart")?;
    let values = parse_values(args.optional("values"))?;
    Ok(ChartSpec {
        chart,
        version: args.optional("version"),
        repo: args.optional("repo"),
        values,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
