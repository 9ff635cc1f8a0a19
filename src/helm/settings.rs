// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm environment settings shared by the release manager and the repository store

use crate::config::Config;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmSettings {
    /// Executable used by [`super::HelmCli`]
    pub binary: String,
    /// Same kubeconfig the dynamic client uses; `None` lets helm infer it
    pub kubeconfig: Option<PathBuf>,
    pub repository_config: PathBuf,
    /// Storage driver exported as `HELM_DRIVER`
    pub driver: Option<String>,
    pub namespace: String,
}

impl HelmSettings {
    /// Flags passed to every helm invocation
    pub fn global_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(OsString::from("--kubeconfig"));
            args.push(kubeconfig.clone().into_os_string());
        }
        args.push(OsString::from("--repository-config"));
        args.push(self.repository_config.clone().into_os_string());
        args
    }
}

impl From<&Config> for HelmSettings {
    fn from(config: &Config) -> Self {
        Self {
            binary: config.helm_binary.clone(),
            kubeconfig: config.kubeconfig_path.clone(),
            repository_config: config.helm_repository_config.clone(),
            driver: config.helm_driver.clone(),
            namespace: config.helm_namespace.clone(),
        }
    }
}
