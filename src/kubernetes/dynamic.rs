// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace-aware CRUD against any resource kind the cluster advertises.

use crate::error::{ConduitError, Result};
use crate::kubernetes::discovery::{ApiResourceDescriptor, DiscoveryResolver};
use crate::kubernetes::document::{
    document_name, document_namespace, from_dynamic_object, parse_manifest, to_dynamic_object,
    ResourceDocument,
};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::Client;
use tracing::{debug, info, instrument};

/// Kind-agnostic resource client. Every call resolves the kind afresh.
#[derive(Clone)]
pub struct DynamicResourceClient {
    client: Client,
    resolver: DiscoveryResolver,
}

impl DynamicResourceClient {
    pub fn new(client: Client) -> Self {
        let resolver = DiscoveryResolver::new(client.clone());
        Self { client, resolver }
    }

    pub fn resolver(&self) -> &DiscoveryResolver {
        &self.resolver
    }

    /// Dynamic API handle; an empty namespace addresses the cluster-wide path
    fn api(&self, descriptor: &ApiResourceDescriptor, namespace: &str) -> Api<DynamicObject> {
        let ar = descriptor.api_resource();
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        }
    }

    /// Fetch one object by name
    #[instrument(skip(self))]
    pub async fn get(&self, kind: &str, name: &str, namespace: &str) -> Result<ResourceDocument> {
        let descriptor = self.resolver.resolve_descriptor(kind).await?;
        let api = self.api(&descriptor, namespace);

        let obj = api
            .get(name)
            .await
            .map_err(|e| backend_error(e, kind, name, namespace, "get"))?;

        from_dynamic_object(obj)
    }

    /// List objects of a kind, optionally filtered by label and field selectors
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        kind: &str,
        namespace: &str,
        label_selector: &str,
        field_selector: &str,
    ) -> Result<Vec<ResourceDocument>> {
        let descriptor = self.resolver.resolve_descriptor(kind).await?;
        let api = self.api(&descriptor, namespace);

        let mut params = ListParams::default();
        if !label_selector.is_empty() {
            params = params.labels(label_selector);
        }
        if !field_selector.is_empty() {
            params = params.fields(field_selector);
        }

        let list = api.list(&params).await.map_err(|e| ConduitError::Backend {
            operation: format!("list {}", kind),
            source: e,
        })?;
        debug!("Listed {} {} object(s)", list.items.len(), kind);

        list.items.into_iter().map(from_dynamic_object).collect()
    }

    /// Create an object from manifest text.
    ///
    /// The target namespace is the explicit argument if set, else the namespace
    /// embedded in the manifest, else the cluster scope.
    #[instrument(skip(self, manifest))]
    pub async fn create(
        &self,
        kind: &str,
        namespace: &str,
        manifest: &str,
    ) -> Result<ResourceDocument> {
        let doc = parse_manifest(manifest)?;
        let target_namespace = effective_namespace(namespace, &doc);
        let name = document_name(&doc).unwrap_or_default().to_string();
        let obj = to_dynamic_object(doc)?;

        let descriptor = self.resolver.resolve_descriptor(kind).await?;
        let api = self.api(&descriptor, &target_namespace);

        let created = api
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| backend_error(e, kind, &name, &target_namespace, "create"))?;

        info!(
            "Created {} {}{}",
            kind,
            created.metadata.name.as_deref().unwrap_or(&name),
            namespace_label(&target_namespace)
        );
        from_dynamic_object(created)
    }

    /// Replace an existing object.
    ///
    /// The manifest's `metadata.name` must equal `name`; a mismatch is rejected
    /// before anything is sent to the cluster. The namespace follows the same
    /// rule as [`create`](Self::create).
    #[instrument(skip(self, manifest))]
    pub async fn update(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        manifest: &str,
    ) -> Result<ResourceDocument> {
        let doc = parse_manifest(manifest)?;
        check_name(&doc, name)?;
        let target_namespace = effective_namespace(namespace, &doc);
        let obj = to_dynamic_object(doc)?;

        let descriptor = self.resolver.resolve_descriptor(kind).await?;
        let api = self.api(&descriptor, &target_namespace);

        let updated = api
            .replace(name, &PostParams::default(), &obj)
            .await
            .map_err(|e| backend_error(e, kind, name, &target_namespace, "update"))?;

        info!("Updated {} {}{}", kind, name, namespace_label(&target_namespace));
        from_dynamic_object(updated)
    }

    /// Delete an object by name
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: &str, name: &str, namespace: &str) -> Result<()> {
        let descriptor = self.resolver.resolve_descriptor(kind).await?;
        let api = self.api(&descriptor, namespace);

        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|e| backend_error(e, kind, name, namespace, "delete"))?;

        info!("Deleted {} {}{}", kind, name, namespace_label(namespace));
        Ok(())
    }
}

/// Explicit namespace, else the manifest's own, else empty (cluster scope)
pub fn effective_namespace(namespace: &str, doc: &ResourceDocument) -> String {
    if !namespace.is_empty() {
        return namespace.to_string();
    }
    document_namespace(doc).unwrap_or_default().to_string()
}

/// Reject a manifest whose embedded name differs from the targeted name
pub fn check_name(doc: &ResourceDocument, name: &str) -> Result<()> {
    let manifest_name = document_name(doc).unwrap_or_default();
    if manifest_name != name {
        return Err(ConduitError::NameMismatch {
            manifest: manifest_name.to_string(),
            requested: name.to_string(),
        });
    }
    Ok(())
}

fn namespace_label(namespace: &str) -> String {
    if namespace.is_empty() {
        String::new()
    } else {
        format!(" in namespace {}", namespace)
    }
}

fn backend_error(
    err: kube::Error,
    kind: &str,
    name: &str,
    namespace: &str,
    operation: &str,
) -> ConduitError {
    match err {
        kube::Error::Api(ref response) if response.code == 404 => ConduitError::ResourceNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
        },
        e => ConduitError::Backend {
            operation: format!("{} {} {}", operation, kind, name),
            source: e,
        },
    }
}
