// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Environment variables read by [`crate::config::Config`]
pub mod env {
    pub const KUBECONFIG: &str = "KUBECONFIG";
    pub const HELM_NAMESPACE: &str = "HELM_NAMESPACE";
    pub const HELM_REPOSITORY_CONFIG: &str = "HELM_REPOSITORY_CONFIG";
    pub const HELM_DRIVER: &str = "HELM_DRIVER";
    pub const HELM_BINARY: &str = "CONDUIT_HELM_BINARY";
    pub const XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
    pub const HOME: &str = "HOME";

    pub const ENABLE_LIST: &str = "CONDUIT_ENABLE_LIST";
    pub const ENABLE_CREATE: &str = "CONDUIT_ENABLE_CREATE";
    pub const ENABLE_UPDATE: &str = "CONDUIT_ENABLE_UPDATE";
    pub const ENABLE_DELETE: &str = "CONDUIT_ENABLE_DELETE";
    pub const ENABLE_HELM_RELEASE_LIST: &str = "CONDUIT_ENABLE_HELM_RELEASE_LIST";
    pub const ENABLE_HELM_RELEASE_GET: &str = "CONDUIT_ENABLE_HELM_RELEASE_GET";
    pub const ENABLE_HELM_INSTALL: &str = "CONDUIT_ENABLE_HELM_INSTALL";
    pub const ENABLE_HELM_UPGRADE: &str = "CONDUIT_ENABLE_HELM_UPGRADE";
    pub const ENABLE_HELM_UNINSTALL: &str = "CONDUIT_ENABLE_HELM_UNINSTALL";
    pub const ENABLE_HELM_ROLLBACK: &str = "CONDUIT_ENABLE_HELM_ROLLBACK";
    pub const ENABLE_HELM_REPO_LIST: &str = "CONDUIT_ENABLE_HELM_REPO_LIST";
    pub const ENABLE_HELM_REPO_ADD: &str = "CONDUIT_ENABLE_HELM_REPO_ADD";
    pub const ENABLE_HELM_REPO_REMOVE: &str = "CONDUIT_ENABLE_HELM_REPO_REMOVE";
}

/// Tool names exposed through [`crate::tools::ToolRouter`]
pub mod tools {
    pub const GET_API_RESOURCES: &str = "get-api-resources";
    pub const GET_RESOURCE: &str = "get-resource";
    pub const LIST_RESOURCES: &str = "list-resources";
    pub const CREATE_RESOURCE: &str = "create-resource";
    pub const UPDATE_RESOURCE: &str = "update-resource";
    pub const DELETE_RESOURCE: &str = "delete-resource";
    pub const LIST_HELM_RELEASES: &str = "list-helm-releases";
    pub const GET_HELM_RELEASE: &str = "get-helm-release";
    pub const GET_HELM_RELEASE_HISTORY: &str = "get-helm-release-history";
    pub const INSTALL_HELM_CHART: &str = "install-helm-chart";
    pub const UPGRADE_HELM_CHART: &str = "upgrade-helm-chart";
    pub const UNINSTALL_HELM_CHART: &str = "uninstall-helm-chart";
    pub const ROLLBACK_HELM_RELEASE: &str = "rollback-helm-release";
    pub const LIST_HELM_REPOS: &str = "list-helm-repos";
    pub const ADD_HELM_REPO: &str = "add-helm-repo";
    pub const REMOVE_HELM_REPO: &str = "remove-helm-repo";
}

/// Helm defaults
pub mod helm {
    /// Namespace used when neither the caller nor the environment names one
    pub const DEFAULT_NAMESPACE: &str = "default";
    pub const DEFAULT_BINARY: &str = "helm";
    /// Path of the repository index below the helm config directory
    pub const REPOSITORY_FILE: &str = "helm/repositories.yaml";
    /// Schemes accepted for repository URLs
    pub const REPOSITORY_SCHEMES: &[&str] = &["http", "https", "oci"];
}
