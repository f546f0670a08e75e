//! Template values
//!
//! Builds the placeholder maps each template is rendered with, from the
//! cluster identity, the process configuration and the requested size.

use crate::cluster::sizing::{parse_memory_gib, worker_daemon_memory};
use crate::config::ManagerConfig;
use crate::domain::naming::ClusterIdentity;
use crate::error::Result;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::warn;

/// Node label matched by the node selector values
pub const NODE_SELECTOR_KEY: &str = "kubernetes.io/hostname";

/// Placeholder map under construction
#[derive(Debug, Default)]
struct Values(BTreeMap<String, String>);

impl Values {
    fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }
}

/// Values every template shares
fn common_values(identity: &ClusterIdentity, config: &ManagerConfig) -> Values {
    let mut values = Values::default();
    values
        .set("NAMESPACE", &config.namespace)
        .set("USERNAME", &identity.username)
        .set("USERNAME_SANITIZED", &identity.sanitized_username)
        .set("CLUSTER_ID", &identity.cluster_id)
        .set("MASTER_NAME", &identity.master_name)
        .set("SPARK_MASTER_PORT", config.master_port)
        .set("SPARK_MASTER_WEBUI_PORT", config.master_webui_port);
    values
}

/// Values shared by the two Deployments
fn workload_values(identity: &ClusterIdentity, config: &ManagerConfig) -> Values {
    let data = &config.data_plane;
    let mut values = common_values(identity, config);
    values
        .set("IMAGE", &config.image)
        .set("IMAGE_PULL_POLICY", &config.image_pull_policy)
        .set("TOLERATIONS", tolerations_json(&config.scheduling.tolerations))
        .set("BERDL_POSTGRES_USER", &data.postgres_user)
        .set("BERDL_POSTGRES_PASSWORD", &data.postgres_password)
        .set("BERDL_POSTGRES_DB", &data.postgres_db)
        .set("BERDL_POSTGRES_URL", &data.postgres_url)
        .set("BERDL_REDIS_HOST", &data.redis_host)
        .set("BERDL_REDIS_PORT", &data.redis_port)
        .set("BERDL_HIVE_METASTORE_URI", &data.hive_metastore_uri)
        .set(
            "BERDL_DELTALAKE_WAREHOUSE_DIRECTORY_PATH",
            &data.deltalake_warehouse_dir,
        );
    values
}

/// Values for the master Deployment
pub fn master_deployment_values(
    identity: &ClusterIdentity,
    config: &ManagerConfig,
    cores: u32,
    memory: &str,
) -> Result<BTreeMap<String, String>> {
    let mut values = workload_values(identity, config);
    values
        .set("MAX_EXECUTORS", config.spark.max_executors)
        .set("MAX_CORES_PER_APPLICATION", config.spark.max_cores_per_application)
        .set("EXECUTOR_CORES", config.spark.executor_cores)
        .set("SPARK_MASTER_CORES", cores)
        .set("SPARK_MASTER_MEMORY", container_memory(memory)?)
        .set(
            "MASTER_AFFINITY",
            node_affinity_json(&config.scheduling.master_node_selector_values),
        );
    Ok(values.0)
}

/// Values for the master Service
pub fn master_service_values(
    identity: &ClusterIdentity,
    config: &ManagerConfig,
) -> BTreeMap<String, String> {
    common_values(identity, config).0
}

/// Values for the worker Deployment
pub fn worker_deployment_values(
    identity: &ClusterIdentity,
    config: &ManagerConfig,
    count: u32,
    cores: u32,
    memory: &str,
) -> Result<BTreeMap<String, String>> {
    let mut values = workload_values(identity, config);
    values
        .set("WORKER_NAME", &identity.worker_name)
        .set(
            "SPARK_MASTER_URL",
            identity.master_url(&config.namespace, config.master_port),
        )
        .set("WORKER_COUNT", count)
        .set("SPARK_WORKER_CONTAINER_CORES", cores)
        .set("SPARK_WORKER_CONTAINER_MEMORY", container_memory(memory)?)
        .set("SPARK_WORKER_CORES", cores)
        .set("SPARK_WORKER_MEMORY", worker_daemon_memory(memory)?)
        .set("SPARK_WORKER_PORT", config.worker_port)
        .set("SPARK_WORKER_WEBUI_PORT", config.worker_webui_port)
        .set(
            "WORKER_AFFINITY",
            node_affinity_json(&config.scheduling.worker_node_selector_values),
        );
    Ok(values.0)
}

/// Memory as a Kubernetes quantity ("10G" -> "10Gi")
pub fn container_memory(memory: &str) -> Result<String> {
    Ok(format!("{}Gi", parse_memory_gib(memory)?))
}

/// Tolerations as a JSON array; anything that is not a JSON array becomes `[]`
pub fn tolerations_json(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "[]".to_string();
    }

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Array(_)) => value.to_string(),
        Ok(_) => {
            warn!("Ignoring tolerations: expected a JSON array");
            "[]".to_string()
        }
        Err(e) => {
            warn!("Ignoring tolerations: invalid JSON: {}", e);
            "[]".to_string()
        }
    }
}

/// Required node affinity for a comma-separated list of node names, or `{}`
pub fn node_affinity_json(selector_values: &str) -> String {
    let nodes: Vec<&str> = selector_values
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if nodes.is_empty() {
        return "{}".to_string();
    }

    json!({
        "nodeAffinity": {
            "requiredDuringSchedulingIgnoredDuringExecution": {
                "nodeSelectorTerms": [{
                    "matchExpressions": [{
                        "key": NODE_SELECTOR_KEY,
                        "operator": "In",
                        "values": nodes,
                    }]
                }]
            }
        }
    })
    .to_string()
}
