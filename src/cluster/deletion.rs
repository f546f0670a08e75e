//! Cluster teardown
//!
//! Deletes a cluster's resources in a fixed order and decides whether the
//! teardown as a whole succeeded. A resource that is already gone counts as
//! neither found nor deleted; a teardown that found resources but did not
//! delete all of them is an error, never a success.

use crate::domain::naming::ClusterIdentity;
use crate::domain::ports::{ClusterResourceApiRef, ResourceKind};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// One resource to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionTarget {
    pub kind: ResourceKind,
    pub name: String,
    /// Human-readable description for logs
    pub label: String,
}

impl DeletionTarget {
    pub fn new(kind: ResourceKind, name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            label: label.into(),
        }
    }
}

/// Worker Deployment, master Deployment, master Service, in deletion order
pub fn cluster_targets(identity: &ClusterIdentity) -> [DeletionTarget; 3] {
    [
        DeletionTarget::new(
            ResourceKind::Deployment,
            &identity.worker_name,
            "worker deployment",
        ),
        DeletionTarget::new(
            ResourceKind::Deployment,
            &identity.master_name,
            "master deployment",
        ),
        DeletionTarget::new(ResourceKind::Service, &identity.master_name, "master service"),
    ]
}

/// What happened to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub target: DeletionTarget,
    pub deleted: bool,
    pub resource_existed: bool,
}

/// Successful teardown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub records: Vec<DeletionRecord>,
    pub message: String,
}

impl DeletionOutcome {
    /// Number of targets that existed
    pub fn resources_found(&self) -> usize {
        count_found(&self.records)
    }

    /// Number of targets deleted
    pub fn resources_deleted(&self) -> usize {
        count_deleted(&self.records)
    }
}

fn count_found(records: &[DeletionRecord]) -> usize {
    records.iter().filter(|r| r.resource_existed).count()
}

fn count_deleted(records: &[DeletionRecord]) -> usize {
    records.iter().filter(|r| r.deleted).count()
}

/// Classify a finished sequence of deletions
pub fn classify(username: &str, records: Vec<DeletionRecord>) -> Result<DeletionOutcome> {
    let found = count_found(&records);
    let deleted = count_deleted(&records);

    let message = if found == 0 {
        format!("No Spark cluster resources found for user {}", username)
    } else if deleted == found {
        format!("Spark cluster for user {} deleted successfully", username)
    } else {
        return Err(Error::PartialDeletion {
            username: username.to_string(),
            found,
            deleted,
        });
    };

    Ok(DeletionOutcome { records, message })
}

/// Deletes resources from one namespace
#[derive(Clone)]
pub struct DeletionCoordinator {
    api: ClusterResourceApiRef,
    namespace: String,
}

impl DeletionCoordinator {
    pub fn new(api: ClusterResourceApiRef, namespace: impl Into<String>) -> Self {
        Self {
            api,
            namespace: namespace.into(),
        }
    }

    /// Delete one target. Not-found is recorded; any other error is returned.
    pub async fn attempt_delete(&self, target: &DeletionTarget) -> Result<DeletionRecord> {
        match self
            .api
            .delete(target.kind, &target.name, &self.namespace)
            .await
        {
            Ok(()) => {
                info!("Deleted Spark {}: {}", target.label, target.name);
                Ok(DeletionRecord {
                    target: target.clone(),
                    deleted: true,
                    resource_existed: true,
                })
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    "Spark {} {} not found, skipping deletion",
                    target.label, target.name
                );
                Ok(DeletionRecord {
                    target: target.clone(),
                    deleted: false,
                    resource_existed: false,
                })
            }
            Err(e) => {
                error!("Error deleting Spark {}: {}", target.label, e);
                Err(e)
            }
        }
    }

    /// Delete targets in order, stopping at the first fatal error
    pub async fn delete_all(
        &self,
        username: &str,
        targets: &[DeletionTarget],
    ) -> Result<DeletionOutcome> {
        let mut records = Vec::with_capacity(targets.len());
        for target in targets {
            records.push(self.attempt_delete(target).await?);
        }

        classify(username, records).map_err(|e| {
            error!("Error deleting Spark cluster: {}", e);
            e
        })
    }

    /// Delete every resource of a user's cluster
    pub async fn delete_cluster(&self, identity: &ClusterIdentity) -> Result<DeletionOutcome> {
        self.delete_all(&identity.username, &cluster_targets(identity))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ApiCall, ApiOperation, InMemoryResourceApi, InjectedFault};
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    const NS: &str = "spark";

    fn identity() -> ClusterIdentity {
        ClusterIdentity::with_suffix("alice", "12345678")
    }

    fn record(kind: ResourceKind, existed: bool, deleted: bool) -> DeletionRecord {
        DeletionRecord {
            target: DeletionTarget::new(kind, "x", "x"),
            deleted,
            resource_existed: existed,
        }
    }

    async fn seed_cluster(api: &InMemoryResourceApi) {
        for (kind, name) in [
            (ResourceKind::Deployment, "spark-worker-alice"),
            (ResourceKind::Deployment, "spark-master-alice"),
            (ResourceKind::Service, "spark-master-alice"),
        ] {
            api.insert(kind, NS, json!({ "metadata": { "name": name } }))
                .await
                .unwrap();
        }
    }

    fn expected_order() -> Vec<ApiCall> {
        vec![
            ApiCall::new(ApiOperation::Delete, ResourceKind::Deployment, "spark-worker-alice"),
            ApiCall::new(ApiOperation::Delete, ResourceKind::Deployment, "spark-master-alice"),
            ApiCall::new(ApiOperation::Delete, ResourceKind::Service, "spark-master-alice"),
        ]
    }

    #[test]
    fn test_classify() {
        let none = vec![
            record(ResourceKind::Deployment, false, false),
            record(ResourceKind::Service, false, false),
        ];
        assert_matches!(
            classify("alice", none),
            Ok(outcome) if outcome.message.contains("No Spark cluster resources found")
        );

        let all = vec![
            record(ResourceKind::Deployment, true, true),
            record(ResourceKind::Service, false, false),
        ];
        assert_matches!(
            classify("alice", all),
            Ok(outcome) if outcome.message.contains("deleted successfully")
        );

        let partial = vec![
            record(ResourceKind::Deployment, true, true),
            record(ResourceKind::Service, true, false),
        ];
        assert_matches!(
            classify("alice", partial),
            Err(Error::PartialDeletion { found: 2, deleted: 1, .. })
        );
    }

    #[test]
    fn test_target_order() {
        let targets = cluster_targets(&identity());
        let order: Vec<_> = targets.iter().map(|t| (t.kind, t.name.as_str())).collect();

        assert_eq!(
            order,
            vec![
                (ResourceKind::Deployment, "spark-worker-alice"),
                (ResourceKind::Deployment, "spark-master-alice"),
                (ResourceKind::Service, "spark-master-alice"),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_absent_cluster() {
        let api = Arc::new(InMemoryResourceApi::new());
        let coordinator = DeletionCoordinator::new(api.clone(), NS);

        let outcome = coordinator.delete_cluster(&identity()).await.unwrap();

        assert_eq!(outcome.message, "No Spark cluster resources found for user alice");
        assert_eq!(outcome.resources_found(), 0);
        assert_eq!(outcome.resources_deleted(), 0);
        assert_eq!(api.calls().await, expected_order());
    }

    #[tokio::test]
    async fn test_delete_present_cluster() {
        let api = Arc::new(InMemoryResourceApi::new());
        seed_cluster(&api).await;
        let coordinator = DeletionCoordinator::new(api.clone(), NS);

        let outcome = coordinator.delete_cluster(&identity()).await.unwrap();

        assert!(outcome.message.contains("deleted successfully"));
        assert_eq!(outcome.resources_found(), 3);
        assert_eq!(outcome.resources_deleted(), 3);
        assert!(api.is_empty().await);
        assert_eq!(api.calls().await, expected_order());
    }

    #[tokio::test]
    async fn test_partially_present_cluster_is_success() {
        let api = Arc::new(InMemoryResourceApi::new());
        api.insert(
            ResourceKind::Service,
            NS,
            json!({ "metadata": { "name": "spark-master-alice" } }),
        )
        .await
        .unwrap();
        let coordinator = DeletionCoordinator::new(api.clone(), NS);

        let outcome = coordinator.delete_cluster(&identity()).await.unwrap();

        assert!(outcome.message.contains("deleted successfully"));
        assert_eq!(outcome.resources_found(), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_halts_remaining_steps() {
        let api = Arc::new(InMemoryResourceApi::new());
        seed_cluster(&api).await;
        api.fail_next(
            ApiOperation::Delete,
            ResourceKind::Deployment,
            "spark-master-alice",
            InjectedFault::Server {
                code: 500,
                message: "internal".into(),
            },
        )
        .await;
        let coordinator = DeletionCoordinator::new(api.clone(), NS);

        let result = coordinator.delete_cluster(&identity()).await;

        assert_matches!(result, Err(Error::Kube(_)));
        let calls = api.calls().await;
        assert_eq!(calls, expected_order()[..2].to_vec());
        // Worker is gone, master and service were left in place
        assert!(!api.contains(ResourceKind::Deployment, "spark-worker-alice", NS).await);
        assert!(api.contains(ResourceKind::Deployment, "spark-master-alice", NS).await);
        assert!(api.contains(ResourceKind::Service, "spark-master-alice", NS).await);
    }

    #[tokio::test]
    async fn test_first_step_failure_attempts_nothing_else() {
        let api = Arc::new(InMemoryResourceApi::new());
        api.fail_next(
            ApiOperation::Delete,
            ResourceKind::Deployment,
            "spark-worker-alice",
            InjectedFault::Server {
                code: 403,
                message: "forbidden".into(),
            },
        )
        .await;
        let coordinator = DeletionCoordinator::new(api.clone(), NS);

        let result = coordinator.delete_cluster(&identity()).await;

        assert!(result.is_err());
        assert_eq!(api.calls().await.len(), 1);
    }
}
