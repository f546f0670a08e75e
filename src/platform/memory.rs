//! In-memory platform
//!
//! A stand-in for the orchestration platform used in standalone mode and in
//! tests. Enforces per-name uniqueness like the real API server, records
//! every call, and can be told to fail specific calls.

use crate::domain::ports::{ClusterResourceApi, ResourceKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use kube::error::ErrorResponse;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

// =============================================================================
// Call Tracking
// =============================================================================

/// Platform operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiOperation {
    Create,
    Delete,
    Read,
}

/// One recorded platform call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub operation: ApiOperation,
    pub kind: ResourceKind,
    pub name: String,
}

impl ApiCall {
    pub fn new(operation: ApiOperation, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            name: name.into(),
        }
    }
}

/// Failure to return from a matching call instead of performing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFault {
    /// "Already exists"
    Conflict,
    /// "Not found"
    NotFound,
    /// Server-side failure with the given HTTP code
    Server { code: u16, message: String },
}

impl InjectedFault {
    fn into_error(self, kind: ResourceKind, name: &str) -> Error {
        match self {
            InjectedFault::Conflict => Error::ResourceConflict {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            InjectedFault::NotFound => Error::ResourceNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            InjectedFault::Server { code, message } => Error::Kube(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message,
                reason: "InternalError".to_string(),
                code,
            })),
        }
    }
}

type ResourceKey = (ResourceKind, String, String);
type FaultKey = (ApiOperation, ResourceKind, String);

// =============================================================================
// In-Memory Platform
// =============================================================================

/// Platform backed by in-process maps
#[derive(Default)]
pub struct InMemoryResourceApi {
    /// Stored manifests by (kind, namespace, name)
    resources: RwLock<BTreeMap<ResourceKey, serde_json::Value>>,
    /// Every call, in order
    calls: RwLock<Vec<ApiCall>>,
    /// Queued failures by (operation, kind, name)
    faults: RwLock<BTreeMap<FaultKey, VecDeque<InjectedFault>>>,
}

impl InMemoryResourceApi {
    /// Create an empty platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource directly, bypassing uniqueness checks and call tracking
    pub async fn insert(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: serde_json::Value,
    ) -> Result<()> {
        let name = manifest_name(&manifest)?;
        self.resources
            .write()
            .await
            .insert((kind, namespace.to_string(), name), manifest);
        Ok(())
    }

    /// Set the status block of a stored Deployment
    pub async fn set_deployment_status(
        &self,
        name: &str,
        namespace: &str,
        status: DeploymentStatus,
    ) -> Result<()> {
        let key = (ResourceKind::Deployment, namespace.to_string(), name.to_string());
        let mut resources = self.resources.write().await;
        let manifest = resources.get_mut(&key).ok_or_else(|| Error::ResourceNotFound {
            kind: ResourceKind::Deployment.to_string(),
            name: name.to_string(),
        })?;

        let status = serde_json::to_value(status)?;
        match manifest.as_object_mut() {
            Some(object) => {
                object.insert("status".to_string(), status);
                Ok(())
            }
            None => Err(Error::Internal(format!(
                "stored Deployment {} is not an object",
                name
            ))),
        }
    }

    /// Make the next matching call fail. Faults for the same call queue up.
    pub async fn fail_next(
        &self,
        operation: ApiOperation,
        kind: ResourceKind,
        name: &str,
        fault: InjectedFault,
    ) {
        self.faults
            .write()
            .await
            .entry((operation, kind, name.to_string()))
            .or_default()
            .push_back(fault);
    }

    /// Stored manifest, if any
    pub async fn get(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Option<serde_json::Value> {
        self.resources
            .read()
            .await
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Whether a resource is stored
    pub async fn contains(&self, kind: ResourceKind, name: &str, namespace: &str) -> bool {
        self.get(kind, name, namespace).await.is_some()
    }

    /// Number of stored resources
    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.resources.read().await.is_empty()
    }

    /// All recorded calls, in order
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls of one operation against one kind
    pub async fn count(&self, operation: ApiOperation, kind: ResourceKind) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.operation == operation && call.kind == kind)
            .count()
    }

    /// Record a call and return the queued fault for it, if any
    async fn begin(&self, operation: ApiOperation, kind: ResourceKind, name: &str) -> Result<()> {
        self.calls
            .write()
            .await
            .push(ApiCall::new(operation, kind, name));

        let fault = self
            .faults
            .write()
            .await
            .get_mut(&(operation, kind, name.to_string()))
            .and_then(VecDeque::pop_front);

        match fault {
            Some(fault) => {
                debug!("Injecting {:?} into {:?} {}/{}", fault, operation, kind, name);
                Err(fault.into_error(kind, name))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterResourceApi for InMemoryResourceApi {
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &serde_json::Value,
    ) -> Result<()> {
        let name = manifest_name(manifest)?;
        self.begin(ApiOperation::Create, kind, &name).await?;

        let key = (kind, namespace.to_string(), name.clone());
        let mut resources = self.resources.write().await;
        if resources.contains_key(&key) {
            return Err(Error::ResourceConflict {
                kind: kind.to_string(),
                name,
            });
        }
        resources.insert(key, manifest.clone());
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, name: &str, namespace: &str) -> Result<()> {
        self.begin(ApiOperation::Delete, kind, name).await?;

        let key = (kind, namespace.to_string(), name.to_string());
        match self.resources.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(Error::ResourceNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn read_deployment(&self, name: &str, namespace: &str) -> Result<Deployment> {
        self.begin(ApiOperation::Read, ResourceKind::Deployment, name)
            .await?;

        let manifest = self
            .get(ResourceKind::Deployment, name, namespace)
            .await
            .ok_or_else(|| Error::ResourceNotFound {
                kind: ResourceKind::Deployment.to_string(),
                name: name.to_string(),
            })?;

        Ok(serde_json::from_value(manifest)?)
    }
}

/// `metadata.name` of a manifest
fn manifest_name(manifest: &serde_json::Value) -> Result<String> {
    manifest
        .pointer("/metadata/name")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Template("manifest has no metadata.name".into()))
}
