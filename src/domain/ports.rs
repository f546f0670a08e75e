//! Domain Ports - Core trait definitions for the cluster manager
//!
//! These traits define the boundaries between the lifecycle logic and the
//! systems it drives: the orchestration platform and the manifest renderer.
//! Adapters implement these traits to provide concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Resource Types
// =============================================================================

/// Kinds of platform resources a cluster is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Deployment,
    Service,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Deployment => write!(f, "Deployment"),
            ResourceKind::Service => write!(f, "Service"),
        }
    }
}

/// A rendered resource ready to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource name, also the key for replace and delete
    pub name: String,
    /// Rendered manifest; never inspected by the lifecycle logic
    pub manifest: serde_json::Value,
}

impl ResourceSpec {
    pub fn new(kind: ResourceKind, name: impl Into<String>, manifest: serde_json::Value) -> Self {
        Self {
            kind,
            name: name.into(),
            manifest,
        }
    }
}

// =============================================================================
// Platform Port
// =============================================================================

/// Port for the orchestration platform.
///
/// Implementations must signal a same-named existing resource on `create`
/// with [`Error::ResourceConflict`](crate::Error::ResourceConflict) and an
/// absent resource on `delete`/`read_deployment` with
/// [`Error::ResourceNotFound`](crate::Error::ResourceNotFound). Any other
/// error is treated as fatal by callers.
#[async_trait]
pub trait ClusterResourceApi: Send + Sync {
    /// Create a resource from a rendered manifest
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &serde_json::Value,
    ) -> Result<()>;

    /// Delete a resource by name
    async fn delete(&self, kind: ResourceKind, name: &str, namespace: &str) -> Result<()>;

    /// Read a Deployment; its `status` may be absent
    async fn read_deployment(&self, name: &str, namespace: &str) -> Result<Deployment>;
}

// =============================================================================
// Manifest Port
// =============================================================================

/// Templates a cluster is rendered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemplateId {
    MasterDeployment,
    MasterService,
    WorkerDeployment,
}

impl TemplateId {
    /// File name of the template
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateId::MasterDeployment => "spark_master_deployment.yaml",
            TemplateId::MasterService => "spark_master_service.yaml",
            TemplateId::WorkerDeployment => "spark_worker_deployment.yaml",
        }
    }

    /// Kind of resource the template produces
    pub fn kind(&self) -> ResourceKind {
        match self {
            TemplateId::MasterDeployment | TemplateId::WorkerDeployment => {
                ResourceKind::Deployment
            }
            TemplateId::MasterService => ResourceKind::Service,
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Port for manifest rendering
pub trait ManifestBuilder: Send + Sync {
    /// Render a template with the given values into a structured document
    fn render(
        &self,
        template: TemplateId,
        values: &BTreeMap<String, String>,
    ) -> Result<serde_json::Value>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ClusterResourceApiRef = Arc<dyn ClusterResourceApi>;
pub type ManifestBuilderRef = Arc<dyn ManifestBuilder>;
