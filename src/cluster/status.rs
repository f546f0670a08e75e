//! Readiness aggregation
//!
//! Normalizes raw Deployment reads into [`ResourceStatus`] and combines the
//! master and worker reads into a [`ClusterStatus`]. Reads never fail: a
//! missing Deployment is a normal answer and any other failure is reported
//! through the `error` field.

use crate::domain::naming::ClusterIdentity;
use crate::domain::ports::ClusterResourceApiRef;
use k8s_openapi::api::apps::v1::Deployment;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Error recorded when a Deployment has no status block
pub const MISSING_STATUS_ERROR: &str = "Deployment status is None";

/// A workload is ready when it wants replicas and all of them are ready
pub fn is_ready(replicas: u32, ready_replicas: u32) -> bool {
    replicas > 0 && ready_replicas == replicas
}

/// Negative or absent counters read as zero
fn counter(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

// =============================================================================
// Resource Status
// =============================================================================

/// Observed state of one Deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub exists: bool,
    pub replicas: u32,
    pub ready_replicas: u32,
    pub available_replicas: u32,
    pub unavailable_replicas: u32,
    pub is_ready: bool,
    pub error: Option<String>,
}

impl ResourceStatus {
    /// The Deployment does not exist
    pub fn absent() -> Self {
        Self::default()
    }

    /// The Deployment could not be read
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Status of an existing Deployment
    pub fn from_deployment(deployment: &Deployment) -> Self {
        let Some(status) = &deployment.status else {
            return Self {
                exists: true,
                error: Some(MISSING_STATUS_ERROR.to_string()),
                ..Self::default()
            };
        };

        let replicas = counter(status.replicas);
        let ready_replicas = counter(status.ready_replicas);

        Self {
            exists: true,
            replicas,
            ready_replicas,
            available_replicas: counter(status.available_replicas),
            unavailable_replicas: counter(status.unavailable_replicas),
            is_ready: is_ready(replicas, ready_replicas),
            error: None,
        }
    }
}

// =============================================================================
// Cluster Status
// =============================================================================

/// Observed state of a user's cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub master: ResourceStatus,
    pub workers: ResourceStatus,
    /// Set only while the master has a ready replica
    pub master_url: Option<String>,
    /// Set only while the master has a ready replica
    pub master_ui_url: Option<String>,
    /// True if either read recorded an error
    pub error: bool,
}

impl ClusterStatus {
    /// Combine the two reads. `urls` is only consulted when the master is serving.
    pub fn combine<F>(master: ResourceStatus, workers: ResourceStatus, urls: F) -> Self
    where
        F: FnOnce() -> (String, String),
    {
        let (master_url, master_ui_url) = if master.ready_replicas > 0 {
            let (url, ui_url) = urls();
            (Some(url), Some(ui_url))
        } else {
            (None, None)
        };
        let error = master.error.is_some() || workers.error.is_some();

        Self {
            master,
            workers,
            master_url,
            master_ui_url,
            error,
        }
    }
}

// =============================================================================
// Status Aggregator
// =============================================================================

/// Reads Deployment state from the platform
#[derive(Clone)]
pub struct StatusAggregator {
    api: ClusterResourceApiRef,
    namespace: String,
}

impl StatusAggregator {
    pub fn new(api: ClusterResourceApiRef, namespace: impl Into<String>) -> Self {
        Self {
            api,
            namespace: namespace.into(),
        }
    }

    /// Current status of one Deployment. Never fails.
    pub async fn deployment_status(&self, name: &str) -> ResourceStatus {
        match self.api.read_deployment(name, &self.namespace).await {
            Ok(deployment) => ResourceStatus::from_deployment(&deployment),
            Err(e) if e.is_not_found() => {
                debug!("Deployment {} not found in {}", name, self.namespace);
                ResourceStatus::absent()
            }
            Err(e) => {
                error!(
                    "Error while fetching deployment status for '{}' in namespace '{}': {}",
                    name, self.namespace, e
                );
                ResourceStatus::failed(e.to_string())
            }
        }
    }

    /// Current status of a cluster. Master and workers are read independently.
    pub async fn cluster_status(
        &self,
        identity: &ClusterIdentity,
        master_port: u16,
        master_webui_port: u16,
    ) -> ClusterStatus {
        let master = self.deployment_status(&identity.master_name).await;
        let workers = self.deployment_status(&identity.worker_name).await;

        ClusterStatus::combine(master, workers, || {
            (
                identity.master_url(&self.namespace, master_port),
                identity.master_ui_url(&self.namespace, master_webui_port),
            )
        })
    }
}
