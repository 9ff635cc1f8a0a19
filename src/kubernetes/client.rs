// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster client creation from the configured kubeconfig

use crate::config::Config;
use crate::error::{ConduitError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Create the single long-lived client shared by every component.
///
/// An explicit kubeconfig path takes precedence, otherwise kube infers the
/// configuration (default kubeconfig location, then in-cluster service account).
#[instrument(skip(config))]
pub async fn create_client(config: &Config) -> Result<Client> {
    match &config.kubeconfig_path {
        Some(path) => create_client_from_kubeconfig_path(path).await,
        None => {
            debug!("No kubeconfig path configured, inferring client configuration");
            let client_config = kube::Config::infer().await.map_err(|e| {
                ConduitError::Kubeconfig(format!("Failed to infer config: {}", e))
            })?;
            Client::try_from(client_config)
                .map_err(|e| ConduitError::Kubeconfig(format!("Failed to create client: {}", e)))
        }
    }
}

/// Create a Kubernetes client from a kubeconfig file on disk
async fn create_client_from_kubeconfig_path(path: &Path) -> Result<Client> {
    info!("Loading kubeconfig from {}", path.display());

    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        ConduitError::Kubeconfig(format!("Failed to read {}: {}", path.display(), e))
    })?;

    create_client_from_kubeconfig(kubeconfig).await
}

/// Create a Kubernetes client from a parsed kubeconfig
pub async fn create_client_from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Client> {
    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| ConduitError::Kubeconfig(format!("Failed to create config: {}", e)))?;

    Client::try_from(client_config)
        .map_err(|e| ConduitError::Kubeconfig(format!("Failed to create client: {}", e)))
}
