// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking the Kubernetes API server.
//!
//! [`MockService`] serves discovery documents and keeps an in-memory object
//! store, so that create/get/update/delete/list round trips behave like a
//! small API server. Every request is recorded for later assertions.
//! [`FakeHelmBackend`] plays the same role for the helm executable.

use crate::error::{ConduitError, Result as HelmResult};
use crate::helm::backend::{ChartRequest, HelmBackend};
use crate::helm::chart::ChartMetadata;
use crate::helm::release::{HelmRelease, ReleaseStatus};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

impl RecordedRequest {
    /// Decoded query parameters
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A mock API resource definition
#[derive(Debug, Clone)]
pub struct MockApiResource {
    pub name: String,
    pub kind: String,
    pub namespaced: bool,
}

impl MockApiResource {
    pub fn namespaced(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced: true,
        }
    }

    pub fn cluster_scoped(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced: false,
        }
    }

    fn to_json(&self) -> Value {
        let singular = self.kind.to_lowercase();
        json!({
            "name": self.name,
            "singularName": singular,
            "namespaced": self.namespaced,
            "kind": self.kind,
            "verbs": ["create", "delete", "get", "list", "patch", "update", "watch"]
        })
    }
}

/// Discovery documents served by the mock, in enumeration order
#[derive(Debug, Clone)]
pub struct MockDiscovery {
    pub core_resources: Vec<MockApiResource>,
    /// (group/version, resources); each group is served at a single preferred version
    pub groups: Vec<(String, Vec<MockApiResource>)>,
    pub failing_groups: Vec<String>,
}

impl Default for MockDiscovery {
    fn default() -> Self {
        Self {
            core_resources: vec![
                MockApiResource::namespaced("configmaps", "ConfigMap"),
                MockApiResource::namespaced("secrets", "Secret"),
                MockApiResource::namespaced("services", "Service"),
                MockApiResource::namespaced("pods", "Pod"),
                MockApiResource::namespaced("events", "Event"),
                MockApiResource::cluster_scoped("namespaces", "Namespace"),
            ],
            groups: vec![(
                "apps/v1".to_string(),
                vec![
                    MockApiResource::namespaced("deployments", "Deployment"),
                    MockApiResource::namespaced("statefulsets", "StatefulSet"),
                    MockApiResource::namespaced("daemonsets", "DaemonSet"),
                ],
            )],
            failing_groups: Vec::new(),
        }
    }
}

impl MockDiscovery {
    pub fn with_group(mut self, group_version: &str, resources: Vec<MockApiResource>) -> Self {
        self.groups.push((group_version.to_string(), resources));
        self
    }

    /// Make the resource listing of one group version return 503
    pub fn with_failing_group(mut self, group_version: &str) -> Self {
        self.failing_groups.push(group_version.to_string());
        self
    }
}

#[derive(Default)]
struct MockState {
    fixed: HashMap<(String, String), (u16, String)>,
    /// Objects per collection prefix (e.g. `/api/v1/configmaps`), in insertion order
    objects: HashMap<String, Vec<Value>>,
    requests: Vec<RecordedRequest>,
    next_uid: u64,
}

/// A mock HTTP service standing in for the API server
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.state.lock().unwrap().fixed.insert(
            ("GET".to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Serve the given discovery documents
    pub fn with_discovery(self, discovery: MockDiscovery) -> Self {
        let core = json!({
            "kind": "APIVersions",
            "apiVersion": "v1",
            "versions": ["v1"],
            "serverAddressByClientCIDRs": []
        });
        let core_resources = resource_list("v1", &discovery.core_resources);

        let groups: Vec<Value> = discovery
            .groups
            .iter()
            .map(|(group_version, _)| {
                let (group, version) = group_version.split_once('/').unwrap();
                let gv = json!({ "groupVersion": group_version, "version": version });
                json!({ "name": group, "versions": [gv.clone()], "preferredVersion": gv })
            })
            .collect();
        let group_list = json!({ "kind": "APIGroupList", "apiVersion": "v1", "groups": groups });

        let mut svc = self
            .on_get("/api", 200, &core.to_string())
            .on_get("/api/v1", 200, &core_resources.to_string())
            .on_get("/apis", 200, &group_list.to_string());

        for (group_version, resources) in &discovery.groups {
            let path = format!("/apis/{}", group_version);
            svc = if discovery.failing_groups.contains(group_version) {
                let body = status_json(503, "ServiceUnavailable", "the server is currently unable to handle the request");
                svc.on_get(&path, 503, &body.to_string())
            } else {
                svc.on_get(&path, 200, &resource_list(group_version, resources).to_string())
            };
        }
        svc
    }

    /// Seed an object into a collection, e.g. `/api/v1/configmaps`
    pub fn with_object(self, collection: &str, object: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .objects
            .entry(collection.to_string())
            .or_default()
            .push(object);
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl MockState {
    fn respond(&mut self, method: &str, path: &str, query: Option<&str>, body: &[u8]) -> (u16, Value) {
        self.requests.push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            query: query.map(str::to_string),
        });

        if let Some((status, body)) = self.fixed.get(&(method.to_string(), path.to_string())) {
            let value = serde_json::from_str(body).unwrap_or(Value::Null);
            return (*status, value);
        }

        let Some(target) = ResourcePath::parse(path) else {
            return not_found("path", path);
        };

        match (method, target.name.as_deref()) {
            ("GET", Some(name)) => match self.find(&target, name) {
                Some(idx) => (200, self.objects[&target.collection][idx].clone()),
                None => not_found(&target.plural, name),
            },
            ("GET", None) => (200, self.list(&target, query)),
            ("POST", None) => self.create(&target, body),
            ("PUT", Some(name)) => self.replace(&target, name, body),
            ("DELETE", Some(name)) => match self.find(&target, name) {
                Some(idx) => {
                    let removed = self.objects.get_mut(&target.collection).unwrap().remove(idx);
                    (200, removed)
                }
                None => not_found(&target.plural, name),
            },
            _ => (405, status_json(405, "MethodNotAllowed", "method not allowed")),
        }
    }

    fn find(&self, target: &ResourcePath, name: &str) -> Option<usize> {
        self.objects.get(&target.collection)?.iter().position(|obj| {
            obj["metadata"]["name"].as_str() == Some(name)
                && obj["metadata"]["namespace"].as_str() == target.namespace.as_deref()
        })
    }

    fn list(&self, target: &ResourcePath, query: Option<&str>) -> Value {
        let selector = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == "labelSelector")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let items: Vec<Value> = self
            .objects
            .get(&target.collection)
            .map(|objs| {
                objs.iter()
                    .filter(|obj| match &target.namespace {
                        Some(ns) => obj["metadata"]["namespace"].as_str() == Some(ns),
                        None => true,
                    })
                    .filter(|obj| labels_match(obj, &selector))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": { "resourceVersion": "1" },
            "items": items
        })
    }

    fn create(&mut self, target: &ResourcePath, body: &[u8]) -> (u16, Value) {
        let Ok(mut obj) = serde_json::from_slice::<Value>(body) else {
            return (400, status_json(400, "BadRequest", "invalid body"));
        };
        let Some(name) = obj["metadata"]["name"].as_str().map(str::to_string) else {
            return (422, status_json(422, "Invalid", "metadata.name: Required value"));
        };
        if self.find(target, &name).is_some() {
            let message = format!("{} \"{}\" already exists", target.plural, name);
            return (409, status_json(409, "AlreadyExists", &message));
        }

        self.next_uid += 1;
        if let Some(ns) = &target.namespace {
            obj["metadata"]["namespace"] = json!(ns);
        }
        obj["metadata"]["uid"] = json!(format!("uid-{}", self.next_uid));
        obj["metadata"]["resourceVersion"] = json!("1");

        self.objects
            .entry(target.collection.clone())
            .or_default()
            .push(obj.clone());
        (201, obj)
    }

    fn replace(&mut self, target: &ResourcePath, name: &str, body: &[u8]) -> (u16, Value) {
        let Ok(mut obj) = serde_json::from_slice::<Value>(body) else {
            return (400, status_json(400, "BadRequest", "invalid body"));
        };
        let Some(idx) = self.find(target, name) else {
            return not_found(&target.plural, name);
        };

        let existing = &self.objects[&target.collection][idx];
        let version: u64 = existing["metadata"]["resourceVersion"]
            .as_str()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        obj["metadata"]["uid"] = existing["metadata"]["uid"].clone();
        obj["metadata"]["resourceVersion"] = json!((version + 1).to_string());
        if let Some(ns) = &target.namespace {
            obj["metadata"]["namespace"] = json!(ns);
        }

        self.objects.get_mut(&target.collection).unwrap()[idx] = obj.clone();
        (200, obj)
    }
}

/// A parsed resource URL: `/api/v1[/namespaces/{ns}]/{plural}[/{name}]`
/// or the same below `/apis/{group}/{version}`
struct ResourcePath {
    /// Collection key independent of namespace
    collection: String,
    plural: String,
    namespace: Option<String>,
    name: Option<String>,
}

impl ResourcePath {
    fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let (prefix, rest) = match segments.as_slice() {
            ["api", version, rest @ ..] => (format!("/api/{}", version), rest),
            ["apis", group, version, rest @ ..] => (format!("/apis/{}/{}", group, version), rest),
            _ => return None,
        };

        let (namespace, plural, name) = match rest {
            ["namespaces", ns, plural, tail @ ..] => (Some(ns.to_string()), *plural, tail.first()),
            [plural, tail @ ..] => (None, *plural, tail.first()),
            [] => return None,
        };

        Some(Self {
            collection: format!("{}/{}", prefix, plural),
            plural: plural.to_string(),
            namespace,
            name: name.map(|n| n.to_string()),
        })
    }
}

fn labels_match(obj: &Value, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|clause| !clause.is_empty())
        .all(|clause| {
            let label = |key: &str| obj["metadata"]["labels"][key.trim()].as_str().map(str::to_string);
            if let Some((key, value)) = clause.split_once("!=") {
                label(key).as_deref() != Some(value.trim())
            } else if let Some((key, value)) = clause.split_once('=') {
                label(key.trim_end_matches('=')).as_deref() == Some(value.trim_start_matches('=').trim())
            } else {
                label(clause).is_some()
            }
        })
}

fn resource_list(group_version: &str, resources: &[MockApiResource]) -> Value {
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources.iter().map(MockApiResource::to_json).collect::<Vec<_>>()
    })
}

fn status_json(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
}

fn not_found(resource: &str, name: &str) -> (u16, Value) {
    let message = format!("{} \"{}\" not found", resource, name);
    (404, status_json(404, "NotFound", &message))
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let bytes: Bytes = body.collect().await?.to_bytes();

            let (status, value) = state.lock().unwrap().respond(
                parts.method.as_str(),
                parts.uri.path(),
                parts.uri.query(),
                &bytes,
            );

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(value.to_string().into_bytes()))?)
        })
    }
}

/// In-memory [`HelmBackend`] keeping release history per namespace.
///
/// Charts are registered by name with their available versions; a chart
/// reference resolves by its last path segment, so `bitnami/redis` and
/// `redis` both find `redis`. Every call is recorded.
#[derive(Clone, Default)]
pub struct FakeHelmBackend {
    state: Arc<Mutex<FakeHelmState>>,
}

#[derive(Default)]
struct FakeHelmState {
    charts: HashMap<String, Vec<String>>,
    releases: BTreeMap<(String, String), Vec<HelmRelease>>,
    calls: Vec<String>,
}

impl FakeHelmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chart(self, name: &str, versions: &[&str]) -> Self {
        self.state.lock().unwrap().charts.insert(
            name.to_string(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Calls received so far, e.g. `install default/app bitnami/redis`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl FakeHelmState {
    fn locate(&self, chart: &str, version: Option<&str>) -> HelmResult<(String, String)> {
        let name = chart.rsplit('/').next().unwrap_or(chart).to_string();
        let not_found = |reason: String| ConduitError::ChartNotFound {
            chart: chart.to_string(),
            reason,
        };

        let versions = self
            .charts
            .get(&name)
            .ok_or_else(|| not_found(format!("chart \"{}\" not found", name)))?;
        let version = match version {
            Some(v) if versions.iter().any(|known| known == v) => v.to_string(),
            Some(v) => return Err(not_found(format!("chart \"{}\" version \"{}\" not found", name, v))),
            None => versions
                .last()
                .cloned()
                .ok_or_else(|| not_found(format!("no chart version found for {}", name)))?,
        };
        Ok((name, version))
    }

    fn latest(&self, namespace: &str, name: &str) -> Option<&HelmRelease> {
        self.releases
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|history| history.last())
    }

    fn push_revision(&mut self, namespace: &str, name: &str, mut release: HelmRelease) -> HelmRelease {
        let history = self
            .releases
            .entry((namespace.to_string(), name.to_string()))
            .or_default();
        for previous in history.iter_mut() {
            if previous.status == ReleaseStatus::Deployed {
                previous.status = ReleaseStatus::Superseded;
            }
        }
        release.revision = history.last().map(|r| r.revision + 1).unwrap_or(1);
        history.push(release.clone());
        release
    }
}

fn release_missing(operation: &str, name: &str) -> ConduitError {
    ConduitError::Helm {
        operation: operation.to_string(),
        message: format!("release {}: not found", name),
    }
}

#[async_trait]
impl HelmBackend for FakeHelmBackend {
    async fn list(&self, namespace: &str, all_namespaces: bool) -> HelmResult<Vec<HelmRelease>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list {}", namespace));
        Ok(state
            .releases
            .iter()
            .filter(|((ns, _), _)| all_namespaces || ns == namespace)
            .filter_map(|(_, history)| history.last())
            .filter(|release| release.status != ReleaseStatus::Uninstalled)
            .map(|release| HelmRelease { values: None, ..release.clone() })
            .collect())
    }

    async fn status(&self, namespace: &str, name: &str) -> HelmResult<HelmRelease> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("status {}/{}", namespace, name));
        state
            .latest(namespace, name)
            .cloned()
            .ok_or_else(|| release_missing("status", name))
    }

    async fn install(&self, namespace: &str, request: &ChartRequest) -> HelmResult<HelmRelease> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("install {}/{} {}", namespace, request.release, request.chart));

        let (chart, version) = state.locate(&request.chart, request.version.as_deref())?;
        if let Some(existing) = state.latest(namespace, &request.release) {
            if existing.status != ReleaseStatus::Uninstalled {
                return Err(ConduitError::Helm {
                    operation: "install".to_string(),
                    message: "cannot re-use a name that is still in use".to_string(),
                });
            }
        }

        let release = HelmRelease {
            name: request.release.clone(),
            namespace: namespace.to_string(),
            revision: 0,
            status: ReleaseStatus::Deployed,
            chart,
            chart_version: version,
            app_version: Some("1.0.0".to_string()),
            updated: Some(Utc::now()),
            values: (!request.values.is_empty()).then(|| request.values.clone()),
        };
        Ok(state.push_revision(namespace, &request.release, release))
    }

    async fn upgrade(&self, namespace: &str, request: &ChartRequest) -> HelmResult<HelmRelease> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("upgrade {}/{} {}", namespace, request.release, request.chart));

        let (chart, version) = state.locate(&request.chart, request.version.as_deref())?;
        match state.latest(namespace, &request.release) {
            Some(existing) if existing.status != ReleaseStatus::Uninstalled => {}
            _ => {
                return Err(ConduitError::Helm {
                    operation: "upgrade".to_string(),
                    message: format!("\"{}\" has no deployed releases", request.release),
                })
            }
        }

        let release = HelmRelease {
            name: request.release.clone(),
            namespace: namespace.to_string(),
            revision: 0,
            status: ReleaseStatus::Deployed,
            chart,
            chart_version: version,
            app_version: Some("1.0.0".to_string()),
            updated: Some(Utc::now()),
            values: (!request.values.is_empty()).then(|| request.values.clone()),
        };
        Ok(state.push_revision(namespace, &request.release, release))
    }

    async fn uninstall(&self, namespace: &str, name: &str) -> HelmResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("uninstall {}/{}", namespace, name));

        let latest = state
            .releases
            .get_mut(&(namespace.to_string(), name.to_string()))
            .and_then(|history| history.last_mut())
            .filter(|release| release.status != ReleaseStatus::Uninstalled)
            .ok_or_else(|| release_missing("uninstall", name))?;
        latest.status = ReleaseStatus::Uninstalled;
        Ok(())
    }

    async fn rollback(&self, namespace: &str, name: &str, revision: u32) -> HelmResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("rollback {}/{} {}", namespace, name, revision));

        let target = state
            .releases
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|history| history.iter().find(|r| r.revision == revision))
            .cloned()
            .ok_or_else(|| ConduitError::Helm {
                operation: "rollback".to_string(),
                message: format!("release: not found (revision {})", revision),
            })?;

        let release = HelmRelease {
            status: ReleaseStatus::Deployed,
            updated: Some(Utc::now()),
            ..target
        };
        state.push_revision(namespace, name, release);
        Ok(())
    }

    async fn history(&self, namespace: &str, name: &str) -> HelmResult<Vec<HelmRelease>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("history {}/{}", namespace, name));
        state
            .releases
            .get(&(namespace.to_string(), name.to_string()))
            .map(|history| {
                history
                    .iter()
                    .map(|r| HelmRelease { values: None, ..r.clone() })
                    .collect()
            })
            .ok_or_else(|| release_missing("history", name))
    }

    async fn show_chart(&self, chart: &str, version: Option<&str>) -> HelmResult<ChartMetadata> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("show {}", chart));

        let (name, version) = state.locate(chart, version)?;
        Ok(ChartMetadata {
            name,
            version,
            app_version: Some("1.0.0".to_string()),
            description: None,
            api_version: Some("v2".to_string()),
        })
    }
}
