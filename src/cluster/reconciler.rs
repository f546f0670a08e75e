//! Create-or-replace for a single named resource
//!
//! The platform offers no transactions or locks, only "create, and be told if
//! the name is taken". Applying a resource is therefore a small state machine:
//!
//! ```text
//! Creating{1} ──ok──────────────────────────────▶ Present
//!      │ conflict
//!      ▼
//!  Replacing ──ok──▶ Creating{2} ──ok──────────▶ Present
//!      │ err              │ err (conflict included)
//!      ▼                  ▼
//!    failed             failed
//! ```
//!
//! Conflict is the only signal that leads to a retry, and only once. There is
//! a window between delete and re-create in which no resource exists.

use crate::domain::ports::{ClusterResourceApiRef, ResourceSpec};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Create attempts allowed per apply
pub const MAX_CREATE_ATTEMPTS: u8 = 2;

/// Position in the create-or-replace protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    /// Issuing create number `attempt`
    Creating { attempt: u8 },
    /// Removing the same-named resource that blocked the create
    Replacing,
    /// Created; `replaced` if an existing resource had to go first
    Present { replaced: bool },
}

/// How an apply finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyOutcome {
    /// No resource of that name existed
    Created,
    /// A resource of that name was deleted and created again
    Replaced,
}

/// Applies resources into one namespace
#[derive(Clone)]
pub struct ResourceReconciler {
    api: ClusterResourceApiRef,
    namespace: String,
}

impl ResourceReconciler {
    pub fn new(api: ClusterResourceApiRef, namespace: impl Into<String>) -> Self {
        Self {
            api,
            namespace: namespace.into(),
        }
    }

    /// Ensure exactly one resource named `spec.name` exists with `spec.manifest`.
    ///
    /// `label` describes the resource in logs, e.g. "Spark master deployment".
    pub async fn apply(&self, spec: &ResourceSpec, label: &str) -> Result<ApplyOutcome> {
        let mut state = ApplyState::Creating { attempt: 1 };

        loop {
            state = match state {
                ApplyState::Creating { attempt } => {
                    match self
                        .api
                        .create(spec.kind, &self.namespace, &spec.manifest)
                        .await
                    {
                        Ok(()) => ApplyState::Present {
                            replaced: attempt > 1,
                        },
                        Err(e) if e.is_conflict() && attempt < MAX_CREATE_ATTEMPTS => {
                            warn!("{} {} already exists, replacing it", label, spec.name);
                            ApplyState::Replacing
                        }
                        Err(e) => {
                            if attempt > 1 {
                                error!("Error replacing {}: {}", label, e);
                            } else {
                                error!("Error creating {}: {}", label, e);
                            }
                            return Err(e);
                        }
                    }
                }
                ApplyState::Replacing => {
                    if let Err(e) = self
                        .api
                        .delete(spec.kind, &spec.name, &self.namespace)
                        .await
                    {
                        error!("Error replacing {}: {}", label, e);
                        return Err(e);
                    }
                    info!("Deleted existing {}: {}", label, spec.name);
                    ApplyState::Creating {
                        attempt: MAX_CREATE_ATTEMPTS,
                    }
                }
                ApplyState::Present { replaced } => {
                    return Ok(if replaced {
                        info!("Recreated {}: {}", label, spec.name);
                        ApplyOutcome::Replaced
                    } else {
                        info!("Created {}: {}", label, spec.name);
                        ApplyOutcome::Created
                    });
                }
            };
        }
    }
}
