//! Spark Cluster Manager
//!
//! Creates, inspects and tears down per-user Spark clusters (a master
//! Deployment, a master Service and a worker Deployment) on Kubernetes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                     Cluster Lifecycle Controller                            │
//! │                  (create / status / delete per user)                        │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │    Resource     │  │     Status      │  │        Deletion             │  │
//! │  │   Reconciler    │  │   Aggregator    │  │       Coordinator           │  │
//! │  │ (create/replace)│  │   (readiness)   │  │   (ordered teardown)        │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           │                    │                         │                  │
//! │           └────────────────────┼─────────────────────────┘                  │
//! │                                │                                            │
//! │  ┌─────────────────────┐       │       ┌─────────────────────────────────┐  │
//! │  │  Manifest Builder   │       │       │  Cluster Identity (naming)      │  │
//! │  │  (YAML templates)   │       │       │  spark-master-<user>, ...       │  │
//! │  └─────────────────────┘       │       └─────────────────────────────────┘  │
//! ├────────────────────────────────┴────────────────────────────────────────────┤
//! │                        Platform Adapters                                    │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────────────────┐   │
//! │  │        Kubernetes           │  │            In-Memory                │   │
//! │  │         (kube-rs)           │  │     (standalone mode, tests)        │   │
//! │  └─────────────────────────────┘  └─────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cluster`]: Lifecycle controller, reconciler, status and deletion
//! - [`config`]: Environment configuration
//! - [`domain`]: Naming rules and platform ports
//! - [`manifest`]: Template rendering
//! - [`platform`]: Kubernetes and in-memory adapters
//! - [`error`]: Error types and handling

pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod platform;

// Re-export commonly used types
pub use cluster::{
    ClusterConfig, ClusterCreateResult, ClusterDeleteResult, ClusterLifecycleController,
    ClusterStatus, ResourceStatus,
};

pub use config::ManagerConfig;

pub use domain::{
    sanitize_name, ClusterIdentity, ClusterResourceApi, ClusterResourceApiRef, ManifestBuilder,
    ManifestBuilderRef, ResourceKind, TemplateId,
};

pub use error::{Error, ErrorKind, Result};

pub use manifest::TemplateManifestBuilder;

pub use platform::{InMemoryResourceApi, KubeResourceApi};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
