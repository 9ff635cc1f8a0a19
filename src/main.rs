// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use kubeconduit::config::Config;
use kubeconduit::helm::{HelmCli, HelmReleaseManager, HelmRepositoryStore, HelmSettings};
use kubeconduit::kubernetes::{create_client, DynamicResourceClient};
use kubeconduit::tools::ToolRouter;

/// One request line on stdin
#[derive(Debug, Deserialize)]
struct ToolCall {
    #[serde(default)]
    id: Option<Value>,
    tool: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries tool responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting kubeconduit");

    let config = Config::from_env().context("failed to load configuration")?;
    config.validate()?;
    info!(
        "Configuration loaded: helm_namespace={}, repository_config={}",
        config.helm_namespace,
        config.helm_repository_config.display()
    );

    let client = create_client(&config).await?;
    info!("Connected to Kubernetes cluster");

    let settings = HelmSettings::from(&config);
    let repositories = HelmRepositoryStore::new(settings.repository_config.clone());
    let releases = HelmReleaseManager::new(
        Arc::new(HelmCli::new(settings.clone())),
        repositories.clone(),
        settings.namespace.clone(),
    );
    let router = ToolRouter::new(
        config.tools.clone(),
        DynamicResourceClient::new(client),
        releases,
        repositories,
    );
    info!("Enabled tools: {}", router.enabled_tools().join(", "));

    serve(&router).await?;

    info!("Input closed, shutting down");
    Ok(())
}

/// Answer one JSON request per stdin line with one JSON response line on stdout
async fn serve(router: &ToolRouter) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => {
                debug!("Received call to {}", call.tool);
                let mut response = match router.call(&call.tool, &call.arguments).await {
                    Ok(content) => json!({"ok": true, "content": content}),
                    Err(e) => {
                        warn!("Tool {} failed: {}", call.tool, e);
                        json!({"ok": false, "error": e.to_string()})
                    }
                };
                if let Some(id) = call.id {
                    response["id"] = id;
                }
                response
            }
            Err(e) => json!({"ok": false, "error": format!("invalid request: {}", e)}),
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await.context("failed to write response")?;
        stdout.flush().await?;
    }

    Ok(())
}
