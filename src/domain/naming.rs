//! Resource naming
//!
//! Turns a free-form username into the stable resource names that key every
//! lifecycle operation for that user's cluster.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a Kubernetes object name (DNS-1123 subdomain)
pub const MAX_NAME_LEN: usize = 253;

/// Prefix shared by every cluster id
pub const CLUSTER_ID_PREFIX: &str = "spark-";

/// Prefix for the master Deployment and Service names
pub const MASTER_NAME_PREFIX: &str = "spark-master-";

/// Prefix for the worker Deployment name
pub const WORKER_NAME_PREFIX: &str = "spark-worker-";

/// Number of random hex characters appended to a cluster id
pub const CLUSTER_ID_SUFFIX_LEN: usize = 8;

fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'
}

fn is_edge(c: char) -> bool {
    c == '-' || c == '.'
}

/// Reduce an arbitrary identifier to a valid resource-name fragment.
///
/// Lowercases ASCII letters, collapses every run of characters outside
/// `[a-z0-9-.]` (underscores included) into a single `-`, strips leading and
/// trailing `-`/`.`, and truncates to [`MAX_NAME_LEN`]. An input made only of
/// disallowed characters yields an empty string.
pub fn sanitize_name(input: &str) -> String {
    let mut replaced = String::with_capacity(input.len());
    let mut in_disallowed_run = false;

    for c in input.chars().map(|c| c.to_ascii_lowercase()) {
        if is_allowed(c) {
            replaced.push(c);
            in_disallowed_run = false;
        } else if !in_disallowed_run {
            replaced.push('-');
            in_disallowed_run = true;
        }
    }

    let mut name = replaced.trim_matches(is_edge).to_string();
    if name.len() > MAX_NAME_LEN {
        // ASCII only at this point, so byte truncation is char-safe
        name.truncate(MAX_NAME_LEN);
        let trimmed = name.trim_end_matches(is_edge).len();
        name.truncate(trimmed);
    }
    name
}

/// Stable names for one user's cluster, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    /// Username as supplied by the caller
    pub username: String,
    /// Username reduced by [`sanitize_name`]
    pub sanitized_username: String,
    /// `spark-{sanitized}-{8 hex}`; unique per controller, not per user
    pub cluster_id: String,
    /// Name of the master Deployment and its Service
    pub master_name: String,
    /// Name of the worker Deployment
    pub worker_name: String,
}

impl ClusterIdentity {
    /// Derive an identity with a random cluster id suffix
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_suffix(username, &random_suffix())
    }

    /// Derive an identity with an explicit cluster id suffix
    pub fn with_suffix(username: impl Into<String>, suffix: &str) -> Self {
        let username = username.into();
        let sanitized_username = sanitize_name(&username);

        Self {
            cluster_id: format!("{}{}-{}", CLUSTER_ID_PREFIX, sanitized_username, suffix),
            master_name: format!("{}{}", MASTER_NAME_PREFIX, sanitized_username),
            worker_name: format!("{}{}", WORKER_NAME_PREFIX, sanitized_username),
            username,
            sanitized_username,
        }
    }

    /// Spark master URL reachable inside the namespace
    pub fn master_url(&self, namespace: &str, port: u16) -> String {
        format!("spark://{}.{}:{}", self.master_name, namespace, port)
    }

    /// Spark master web UI URL reachable inside the namespace
    pub fn master_ui_url(&self, namespace: &str, port: u16) -> String {
        format!("http://{}.{}:{}", self.master_name, namespace, port)
    }
}

fn random_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(CLUSTER_ID_SUFFIX_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_name("TestUser"), "testuser");
        assert_eq!(sanitize_name("user___name"), "user-name");
        assert_eq!(sanitize_name("_user_"), "user");
        assert_eq!(sanitize_name("test_user"), "test-user");
        assert_eq!(sanitize_name("first.last@example.com"), "first.last-example.com");
        assert_eq!(sanitize_name("..--alice--.."), "alice");
    }

    #[test]
    fn test_sanitize_all_disallowed_is_empty() {
        assert_eq!(sanitize_name("___"), "");
        assert_eq!(sanitize_name("@#$%"), "");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(300);
        let name = sanitize_name(&long);
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert_eq!(name, "a".repeat(MAX_NAME_LEN));
    }

    #[test]
    fn test_sanitize_truncation_never_ends_on_separator() {
        let input = format!("{}_{}", "a".repeat(MAX_NAME_LEN - 1), "b".repeat(10));
        let name = sanitize_name(&input);
        assert_eq!(name, "a".repeat(MAX_NAME_LEN - 1));
    }

    #[test]
    fn test_sanitize_non_ascii() {
        assert_eq!(sanitize_name("jürgen"), "j-rgen");
        assert_eq!(sanitize_name("ñ"), "");
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(input in ".{0,400}") {
            let once = sanitize_name(&input);
            prop_assert_eq!(sanitize_name(&once), once);
        }

        #[test]
        fn prop_sanitize_output_is_valid(input in ".{0,400}") {
            let name = sanitize_name(&input);
            prop_assert!(name.len() <= MAX_NAME_LEN);
            prop_assert!(name.chars().all(is_allowed));
            prop_assert!(!name.starts_with(is_edge));
            prop_assert!(!name.ends_with(is_edge));
        }
    }

    #[test]
    fn test_identity_names() {
        let identity = ClusterIdentity::with_suffix("Test_User", "0a1b2c3d");

        assert_eq!(identity.username, "Test_User");
        assert_eq!(identity.sanitized_username, "test-user");
        assert_eq!(identity.cluster_id, "spark-test-user-0a1b2c3d");
        assert_eq!(identity.master_name, "spark-master-test-user");
        assert_eq!(identity.worker_name, "spark-worker-test-user");
    }

    #[test]
    fn test_identity_random_suffix() {
        let identity = ClusterIdentity::new("alice");
        let suffix = identity
            .cluster_id
            .strip_prefix("spark-alice-")
            .expect("cluster id prefix");

        assert_eq!(suffix.len(), CLUSTER_ID_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identity_urls() {
        let identity = ClusterIdentity::with_suffix("alice", "deadbeef");

        assert_eq!(
            identity.master_url("spark-ns", 7077),
            "spark://spark-master-alice.spark-ns:7077"
        );
        assert_eq!(
            identity.master_ui_url("spark-ns", 8090),
            "http://spark-master-alice.spark-ns:8090"
        );
    }
}
