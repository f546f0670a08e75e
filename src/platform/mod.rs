//! Platform Adapters
//!
//! Provides implementations of the orchestration platform port:
//! - Kubernetes: a live API server via `kube`
//! - In-memory: standalone runs and tests

pub mod kubernetes;
pub mod memory;

pub use kubernetes::*;
pub use memory::*;
