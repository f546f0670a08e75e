//! Cluster Lifecycle
//!
//! Everything that acts on a user's Spark cluster:
//! - Controller: create, status and delete for one user
//! - Reconciler: create-or-replace of a single resource
//! - Status: readiness aggregation
//! - Deletion: ordered teardown
//! - Sizing: requested cluster size and its limits

pub mod controller;
pub mod deletion;
pub mod reconciler;
pub mod sizing;
pub mod status;

pub use controller::{ClusterCreateResult, ClusterDeleteResult, ClusterLifecycleController};
pub use deletion::{DeletionCoordinator, DeletionOutcome, DeletionRecord, DeletionTarget};
pub use reconciler::{ApplyOutcome, ResourceReconciler};
pub use sizing::ClusterConfig;
pub use status::{ClusterStatus, ResourceStatus, StatusAggregator};
