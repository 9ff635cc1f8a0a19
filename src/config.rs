// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{env as vars, helm};
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Which tools are registered with the tool router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolToggles {
    pub list: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub helm_release_list: bool,
    pub helm_release_get: bool,
    pub helm_install: bool,
    pub helm_upgrade: bool,
    pub helm_uninstall: bool,
    pub helm_rollback: bool,
    pub helm_repo_list: bool,
    pub helm_repo_add: bool,
    pub helm_repo_remove: bool,
}

impl Default for ToolToggles {
    /// Reads are on, writes are off
    fn default() -> Self {
        Self {
            list: true,
            create: false,
            update: false,
            delete: false,
            helm_release_list: true,
            helm_release_get: true,
            helm_install: false,
            helm_upgrade: false,
            helm_uninstall: false,
            helm_rollback: false,
            helm_repo_list: true,
            helm_repo_add: false,
            helm_repo_remove: false,
        }
    }
}

impl ToolToggles {
    /// Everything enabled, used by tests and by operators who opt in explicitly
    pub fn all() -> Self {
        Self {
            list: true,
            create: true,
            update: true,
            delete: true,
            helm_release_list: true,
            helm_release_get: true,
            helm_install: true,
            helm_upgrade: true,
            helm_uninstall: true,
            helm_rollback: true,
            helm_repo_list: true,
            helm_repo_add: true,
            helm_repo_remove: true,
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit kubeconfig path; `None` lets kube infer the configuration
    pub kubeconfig_path: Option<PathBuf>,
    /// Namespace Helm operations target when the caller does not pass one
    pub helm_namespace: String,
    /// Location of the Helm repository index
    pub helm_repository_config: PathBuf,
    pub helm_driver: Option<String>,
    pub helm_binary: String,
    pub tools: ToolToggles,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let kubeconfig_path = non_empty(vars::KUBECONFIG).map(PathBuf::from);
        let helm_namespace =
            non_empty(vars::HELM_NAMESPACE).unwrap_or_else(|| helm::DEFAULT_NAMESPACE.to_string());
        let helm_repository_config = match non_empty(vars::HELM_REPOSITORY_CONFIG) {
            Some(path) => PathBuf::from(path),
            None => default_repository_config(&non_empty)?,
        };
        let helm_driver = non_empty(vars::HELM_DRIVER);
        let helm_binary =
            non_empty(vars::HELM_BINARY).unwrap_or_else(|| helm::DEFAULT_BINARY.to_string());

        let defaults = ToolToggles::default();
        let flag = |key: &str, default: bool| -> Result<bool> {
            match non_empty(key) {
                Some(value) => parse_bool(&value).with_context(|| format!("{} is not a boolean", key)),
                None => Ok(default),
            }
        };

        let tools = ToolToggles {
            list: flag(vars::ENABLE_LIST, defaults.list)?,
            create: flag(vars::ENABLE_CREATE, defaults.create)?,
            update: flag(vars::ENABLE_UPDATE, defaults.update)?,
            delete: flag(vars::ENABLE_DELETE, defaults.delete)?,
            helm_release_list: flag(vars::ENABLE_HELM_RELEASE_LIST, defaults.helm_release_list)?,
            helm_release_get: flag(vars::ENABLE_HELM_RELEASE_GET, defaults.helm_release_get)?,
            helm_install: flag(vars::ENABLE_HELM_INSTALL, defaults.helm_install)?,
            helm_upgrade: flag(vars::ENABLE_HELM_UPGRADE, defaults.helm_upgrade)?,
            helm_uninstall: flag(vars::ENABLE_HELM_UNINSTALL, defaults.helm_uninstall)?,
            helm_rollback: flag(vars::ENABLE_HELM_ROLLBACK, defaults.helm_rollback)?,
            helm_repo_list: flag(vars::ENABLE_HELM_REPO_LIST, defaults.helm_repo_list)?,
            helm_repo_add: flag(vars::ENABLE_HELM_REPO_ADD, defaults.helm_repo_add)?,
            helm_repo_remove: flag(vars::ENABLE_HELM_REPO_REMOVE, defaults.helm_repo_remove)?,
        };

        Ok(Config {
            kubeconfig_path,
            helm_namespace,
            helm_repository_config,
            helm_driver,
            helm_binary,
            tools,
        })
    }

    /// Check that an explicitly configured kubeconfig is readable
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.kubeconfig_path {
            std::fs::metadata(path)
                .with_context(|| format!("cannot access kubeconfig file {}", path.display()))?;
        }
        Ok(())
    }
}

fn default_repository_config<F>(lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(config_home) = lookup(vars::XDG_CONFIG_HOME) {
        return Ok(PathBuf::from(config_home).join(helm::REPOSITORY_FILE));
    }
    let home = lookup(vars::HOME).ok_or_else(|| {
        anyhow!(
            "cannot determine Helm repository config path: set {} or {}",
            vars::HELM_REPOSITORY_CONFIG,
            vars::HOME
        )
    })?;
    Ok(PathBuf::from(home).join(".config").join(helm::REPOSITORY_FILE))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => bail!("unrecognized boolean value '{}'", other),
    }
}
