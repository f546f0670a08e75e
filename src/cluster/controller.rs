//! Cluster Lifecycle Controller
//!
//! Entry point for one user's cluster. Coordinates:
//! - Creation: render master Deployment, master Service and worker Deployment,
//!   then create-or-replace each in that order
//! - Status: readiness of master and workers
//! - Deletion: ordered teardown with partial-failure detection

use crate::cluster::deletion::DeletionCoordinator;
use crate::cluster::reconciler::ResourceReconciler;
use crate::cluster::sizing::ClusterConfig;
use crate::cluster::status::{ClusterStatus, StatusAggregator};
use crate::config::ManagerConfig;
use crate::domain::naming::ClusterIdentity;
use crate::domain::ports::{
    ClusterResourceApiRef, ManifestBuilderRef, ResourceSpec, TemplateId,
};
use crate::error::Result;
use crate::manifest::{master_deployment_values, master_service_values, worker_deployment_values};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

// =============================================================================
// Results
// =============================================================================

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCreateResult {
    pub cluster_id: String,
    pub master_url: String,
    pub master_ui_url: String,
}

/// Result of a successful delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDeleteResult {
    pub message: String,
}

// =============================================================================
// Controller
// =============================================================================

/// Manages the cluster of a single user
pub struct ClusterLifecycleController {
    identity: ClusterIdentity,
    config: Arc<ManagerConfig>,
    builder: ManifestBuilderRef,
    reconciler: ResourceReconciler,
    status: StatusAggregator,
    deletion: DeletionCoordinator,
}

impl ClusterLifecycleController {
    /// Create a controller with a fresh cluster identity for `username`
    pub fn new(
        username: impl Into<String>,
        config: Arc<ManagerConfig>,
        api: ClusterResourceApiRef,
        builder: ManifestBuilderRef,
    ) -> Self {
        Self::with_identity(ClusterIdentity::new(username), config, api, builder)
    }

    /// Create a controller for a known identity
    pub fn with_identity(
        identity: ClusterIdentity,
        config: Arc<ManagerConfig>,
        api: ClusterResourceApiRef,
        builder: ManifestBuilderRef,
    ) -> Self {
        let namespace = config.namespace.clone();
        debug!(
            "Cluster controller for {} ({}) in {}",
            identity.username, identity.cluster_id, namespace
        );

        Self {
            reconciler: ResourceReconciler::new(api.clone(), namespace.clone()),
            status: StatusAggregator::new(api.clone(), namespace.clone()),
            deletion: DeletionCoordinator::new(api, namespace),
            identity,
            config,
            builder,
        }
    }

    /// Names and id of the managed cluster
    pub fn identity(&self) -> &ClusterIdentity {
        &self.identity
    }

    /// Create (or replace) the cluster.
    ///
    /// All three documents are rendered before the platform is touched. A
    /// failure after the master has been applied leaves the master in place.
    pub async fn create(&self, request: &ClusterConfig) -> Result<ClusterCreateResult> {
        let identity = &self.identity;
        let config = &self.config;

        let master_deployment = self.resource(
            TemplateId::MasterDeployment,
            &identity.master_name,
            &master_deployment_values(
                identity,
                config,
                request.master_cores,
                &request.master_memory,
            )?,
        )?;
        let master_service = self.resource(
            TemplateId::MasterService,
            &identity.master_name,
            &master_service_values(identity, config),
        )?;
        let worker_deployment = self.resource(
            TemplateId::WorkerDeployment,
            &identity.worker_name,
            &worker_deployment_values(
                identity,
                config,
                request.worker_count,
                request.worker_cores,
                &request.worker_memory,
            )?,
        )?;

        for (spec, label) in [
            (&master_deployment, "Spark master deployment"),
            (&master_service, "Spark master service"),
            (&worker_deployment, "Spark worker deployment"),
        ] {
            if let Err(e) = self.reconciler.apply(spec, label).await {
                error!("Error creating Spark cluster for {}: {}", identity.username, e);
                return Err(e);
            }
        }

        info!(
            "Spark cluster {} created for user {} ({} workers)",
            identity.cluster_id, identity.username, request.worker_count
        );

        Ok(ClusterCreateResult {
            cluster_id: identity.cluster_id.clone(),
            master_url: identity.master_url(&config.namespace, config.master_port),
            master_ui_url: identity.master_ui_url(&config.namespace, config.master_webui_port),
        })
    }

    /// Current state of the cluster. Never fails.
    pub async fn status(&self) -> ClusterStatus {
        self.status
            .cluster_status(
                &self.identity,
                self.config.master_port,
                self.config.master_webui_port,
            )
            .await
    }

    /// Delete every resource of the cluster
    pub async fn delete(&self) -> Result<ClusterDeleteResult> {
        let outcome = self.deletion.delete_cluster(&self.identity).await?;
        info!("{}", outcome.message);
        Ok(ClusterDeleteResult {
            message: outcome.message,
        })
    }

    fn resource(
        &self,
        template: TemplateId,
        name: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<ResourceSpec> {
        let manifest = self.builder.render(template, values)?;
        Ok(ResourceSpec::new(template.kind(), name, manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing::sample_config;
    use crate::domain::ports::ResourceKind;
    use crate::error::Error;
    use crate::manifest::TemplateManifestBuilder;
    use crate::platform::{ApiCall, ApiOperation, InMemoryResourceApi, InjectedFault};
    use assert_matches::assert_matches;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
    use serde_json::json;
    use tokio_test::assert_ok;

    const NS: &str = "test-namespace";
    const MASTER: &str = "spark-master-alice";
    const WORKER: &str = "spark-worker-alice";

    fn setup() -> (Arc<InMemoryResourceApi>, ClusterLifecycleController) {
        let api = Arc::new(InMemoryResourceApi::new());
        let controller = ClusterLifecycleController::with_identity(
            ClusterIdentity::with_suffix("alice", "0a1b2c3d"),
            Arc::new(sample_config()),
            api.clone(),
            Arc::new(TemplateManifestBuilder::new()),
        );
        (api, controller)
    }

    fn request() -> ClusterConfig {
        ClusterConfig {
            worker_count: 2,
            worker_cores: 1,
            worker_memory: "10G".to_string(),
            master_cores: 1,
            master_memory: "4G".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_assigns_identity() {
        let api = Arc::new(InMemoryResourceApi::new());
        let controller = ClusterLifecycleController::new(
            "Bob",
            Arc::new(sample_config()),
            api,
            Arc::new(TemplateManifestBuilder::new()),
        );

        assert_eq!(controller.identity().username, "Bob");
        assert_eq!(controller.identity().master_name, "spark-master-bob");
        assert!(controller.identity().cluster_id.starts_with("spark-bob-"));
    }

    #[tokio::test]
    async fn test_create_applies_in_order() {
        let (api, controller) = setup();

        let result = controller.create(&request()).await.unwrap();

        assert_eq!(result.cluster_id, "spark-alice-0a1b2c3d");
        assert_eq!(result.master_url, "spark://spark-master-alice.test-namespace:7077");
        assert_eq!(result.master_ui_url, "http://spark-master-alice.test-namespace:8090");
        assert_eq!(
            api.calls().await,
            vec![
                ApiCall::new(ApiOperation::Create, ResourceKind::Deployment, MASTER),
                ApiCall::new(ApiOperation::Create, ResourceKind::Service, MASTER),
                ApiCall::new(ApiOperation::Create, ResourceKind::Deployment, WORKER),
            ]
        );

        let worker: Deployment =
            serde_json::from_value(api.get(ResourceKind::Deployment, WORKER, NS).await.unwrap())
                .unwrap();
        assert_eq!(worker.spec.unwrap().replicas, Some(2));
    }

    #[tokio::test]
    async fn test_create_keeps_username_with_quotes() {
        let api = Arc::new(InMemoryResourceApi::new());
        let identity = ClusterIdentity::with_suffix(r#"o"brien"#, "0a1b2c3d");
        let master = identity.master_name.clone();
        let controller = ClusterLifecycleController::with_identity(
            identity,
            Arc::new(sample_config()),
            api.clone(),
            Arc::new(TemplateManifestBuilder::new()),
        );

        assert_ok!(controller.create(&request()).await);

        let service = api.get(ResourceKind::Service, &master, NS).await.unwrap();
        assert_eq!(
            service["metadata"]["annotations"]["spark-manager/username"],
            r#"o"brien"#
        );
    }

    #[tokio::test]
    async fn test_create_replaces_existing_cluster() {
        let (api, controller) = setup();
        assert_ok!(controller.create(&request()).await);

        let mut bigger = request();
        bigger.worker_count = 3;
        assert_ok!(controller.create(&bigger).await);

        assert_eq!(api.count(ApiOperation::Create, ResourceKind::Deployment).await, 6);
        assert_eq!(api.count(ApiOperation::Delete, ResourceKind::Deployment).await, 2);
        assert_eq!(api.count(ApiOperation::Delete, ResourceKind::Service).await, 1);
        let worker: Deployment =
            serde_json::from_value(api.get(ResourceKind::Deployment, WORKER, NS).await.unwrap())
                .unwrap();
        assert_eq!(worker.spec.unwrap().replicas, Some(3));
    }

    #[tokio::test]
    async fn test_worker_failure_keeps_master() {
        let (api, controller) = setup();
        api.fail_next(
            ApiOperation::Create,
            ResourceKind::Deployment,
            WORKER,
            InjectedFault::Server {
                code: 403,
                message: "quota exceeded".into(),
            },
        )
        .await;

        let result = controller.create(&request()).await;

        assert_matches!(result, Err(Error::Kube(_)));
        assert!(api.contains(ResourceKind::Deployment, MASTER, NS).await);
        assert!(api.contains(ResourceKind::Service, MASTER, NS).await);
        assert!(!api.contains(ResourceKind::Deployment, WORKER, NS).await);
    }

    #[tokio::test]
    async fn test_bad_memory_touches_nothing() {
        let (api, controller) = setup();
        let mut bad = request();
        bad.worker_memory = "10T".to_string();

        let result = controller.create(&bad).await;

        assert_matches!(result, Err(Error::InvalidMemory(_)));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_after_create() {
        let (api, controller) = setup();
        controller.create(&request()).await.unwrap();

        let pending = controller.status().await;
        assert!(pending.master.exists);
        assert_eq!(
            pending.master.error.as_deref(),
            Some(crate::cluster::status::MISSING_STATUS_ERROR)
        );
        assert!(pending.master_url.is_none());

        for (name, replicas) in [(MASTER, 1), (WORKER, 2)] {
            api.set_deployment_status(
                name,
                NS,
                DeploymentStatus {
                    replicas: Some(replicas),
                    ready_replicas: Some(replicas),
                    available_replicas: Some(replicas),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let ready = controller.status().await;
        assert!(ready.master.is_ready);
        assert!(ready.workers.is_ready);
        assert!(!ready.error);
        assert_eq!(
            ready.master_url.as_deref(),
            Some("spark://spark-master-alice.test-namespace:7077")
        );
    }

    #[tokio::test]
    async fn test_status_of_missing_cluster() {
        let (_api, controller) = setup();

        let status = controller.status().await;

        assert!(!status.master.exists);
        assert!(!status.workers.exists);
        assert!(!status.error);
        assert!(status.master_url.is_none());
    }

    #[tokio::test]
    async fn test_delete_lifecycle() {
        let (api, controller) = setup();

        let nothing = controller.delete().await.unwrap();
        assert_eq!(nothing.message, "No Spark cluster resources found for user alice");

        controller.create(&request()).await.unwrap();
        let deleted = controller.delete().await.unwrap();
        assert_eq!(deleted.message, "Spark cluster for user alice deleted successfully");
        assert!(api.is_empty().await);
    }

    #[tokio::test]
    async fn test_results_serialize() {
        let result = ClusterDeleteResult {
            message: "done".into(),
        };
        assert_eq!(serde_json::to_value(result).unwrap(), json!({ "message": "done" }));
    }
}
