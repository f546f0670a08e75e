//! Error types for the Spark Cluster Manager
//!
//! Provides structured error types for configuration loading, manifest
//! rendering, platform calls and cluster lifecycle operations.

use thiserror::Error;

/// Unified error type for the cluster manager
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceConflict { kind: String, name: String },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error(
        "Spark cluster deletion partially completed for user {username}: \
         deleted {deleted} of {found} resources"
    )]
    PartialDeletion {
        username: String,
        found: usize,
        deleted: usize,
    },

    #[error("Configuration limit exceeded: {0}")]
    ConfigurationLimitExceeded(String),

    #[error("Request validation failed: {0}")]
    InvalidRequest(String),

    #[error("Invalid memory value: {0}")]
    InvalidMemory(String),

    // =========================================================================
    // Manifest Errors
    // =========================================================================
    #[error("Template error: {0}")]
    Template(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of failure, for whatever layer maps errors onto a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Process configuration is missing or malformed
    Configuration,
    /// Requested cluster size is larger than the caller may ask for
    ConfigurationLimitExceeded,
    /// Request parameters are malformed
    RequestValidation,
    /// A same-named resource already exists
    Conflict,
    /// The named resource does not exist
    NotFound,
    /// Some, but not all, cluster resources were removed
    ClusterDeletionFailed,
    /// The orchestration platform failed
    Upstream,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// Application error code, if this kind carries one
    pub fn code(&self) -> Option<u32> {
        match self {
            ErrorKind::ConfigurationLimitExceeded => Some(10050),
            ErrorKind::ClusterDeletionFailed => Some(10060),
            ErrorKind::RequestValidation => Some(30010),
            _ => None,
        }
    }

    /// Short description of the kind
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Configuration error",
            ErrorKind::ConfigurationLimitExceeded => "Configuration limit exceeded",
            ErrorKind::RequestValidation => "Request validation failed",
            ErrorKind::Conflict => "Resource already exists",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::ClusterDeletionFailed => "Cluster deletion failed",
            ErrorKind::Upstream => "Orchestration platform error",
            ErrorKind::Internal => "Internal error",
        }
    }
}

impl Error {
    /// Classify this error for a boundary layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::ConfigurationLimitExceeded(_) => ErrorKind::ConfigurationLimitExceeded,
            Error::InvalidRequest(_) | Error::InvalidMemory(_) => ErrorKind::RequestValidation,
            Error::ResourceConflict { .. } => ErrorKind::Conflict,
            Error::ResourceNotFound { .. } => ErrorKind::NotFound,
            Error::PartialDeletion { .. } => ErrorKind::ClusterDeletionFailed,
            Error::Kube(_) => ErrorKind::Upstream,
            Error::Internal(_)
            | Error::Template(_)
            | Error::Yaml(_)
            | Error::JsonParse(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Conflict and not-found are handled locally; everything else ends the operation
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ResourceConflict { .. } | Error::ResourceNotFound { .. }
        )
    }

    /// Check if this is a platform "already exists" signal
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ResourceConflict { .. })
    }

    /// Check if this is a platform "not found" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }
}

/// Result type alias for the cluster manager
pub type Result<T> = std::result::Result<T, Error>;
