//! Process configuration
//!
//! Everything the manager needs from its environment is read once at startup
//! through clap, validated eagerly and handed to controllers by reference.
//! Each setting is an environment variable with a matching flag
//! (`KUBE_NAMESPACE` / `--kube-namespace`). Missing required settings are
//! reported together in one error.

use crate::cluster::sizing::parse_memory_gib;
use crate::error::{Error, Result};
use clap::{value_parser, Args, Parser};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_MAX_EXECUTORS: u32 = 5;
const DEFAULT_MAX_CORES_PER_APPLICATION: u32 = 10;
const DEFAULT_EXECUTOR_CORES: u32 = 2;

/// Trimmed value; empty and whitespace-only values are rejected
fn non_blank(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("must not be blank".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Memory in the "{int}G" form
fn memory(value: &str) -> std::result::Result<String, String> {
    let value = non_blank(value)?;
    parse_memory_gib(&value).map_err(|e| e.to_string())?;
    Ok(value)
}

// =============================================================================
// Configuration Sections
// =============================================================================

/// Cluster sizing used when a request does not say otherwise.
/// Also the ceiling for restricted callers.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ClusterDefaults {
    /// Default number of workers
    #[arg(
        long = "default-worker-count",
        env = "DEFAULT_WORKER_COUNT",
        default_value_t = 4,
        value_parser = value_parser!(u32).range(1..)
    )]
    pub worker_count: u32,

    /// CPU cores for each Spark worker
    #[arg(
        long = "default-spark-worker-cores",
        env = "DEFAULT_SPARK_WORKER_CORES",
        value_parser = value_parser!(u32).range(1..)
    )]
    pub worker_cores: u32,

    /// Memory for each Spark worker, e.g. 10GiB
    #[arg(
        long = "default-spark-worker-memory",
        env = "DEFAULT_SPARK_WORKER_MEMORY",
        value_parser = memory
    )]
    pub worker_memory: String,

    /// CPU cores for the Spark master
    #[arg(
        long = "default-master-cores",
        env = "DEFAULT_MASTER_CORES",
        default_value_t = 1,
        value_parser = value_parser!(u32).range(1..)
    )]
    pub master_cores: u32,

    /// Memory for the Spark master
    #[arg(
        long = "default-master-memory",
        env = "DEFAULT_MASTER_MEMORY",
        default_value = "50GiB",
        value_parser = memory
    )]
    pub master_memory: String,
}

/// Spark application limits baked into the master configuration
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SparkTuning {
    /// Maximum executors per application
    #[arg(long, env = "MAX_EXECUTORS", default_value_t = DEFAULT_MAX_EXECUTORS)]
    pub max_executors: u32,

    /// Maximum cores per application
    #[arg(
        long,
        env = "MAX_CORES_PER_APPLICATION",
        default_value_t = DEFAULT_MAX_CORES_PER_APPLICATION
    )]
    pub max_cores_per_application: u32,

    /// Cores per executor
    #[arg(long, env = "EXECUTOR_CORES", default_value_t = DEFAULT_EXECUTOR_CORES)]
    pub executor_cores: u32,
}

impl Default for SparkTuning {
    fn default() -> Self {
        Self {
            max_executors: DEFAULT_MAX_EXECUTORS,
            max_cores_per_application: DEFAULT_MAX_CORES_PER_APPLICATION,
            executor_cores: DEFAULT_EXECUTOR_CORES,
        }
    }
}

/// Pod placement hints forwarded to the templates
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduling {
    /// Comma-separated node names the master may run on
    #[arg(long, env = "MASTER_NODE_SELECTOR_VALUES", default_value = "")]
    pub master_node_selector_values: String,

    /// Comma-separated node names workers may run on
    #[arg(long, env = "WORKER_NODE_SELECTOR_VALUES", default_value = "")]
    pub worker_node_selector_values: String,

    /// Tolerations as a JSON array; anything else is ignored
    #[arg(long = "berdl-tolerations", env = "BERDL_TOLERATIONS", default_value = "")]
    pub tolerations: String,
}

/// Connection settings for data-plane services. Only rendered into manifests.
#[derive(Args, Clone, PartialEq, Eq)]
pub struct DataPlaneConfig {
    /// PostgreSQL username
    #[arg(long = "berdl-postgres-user", env = "BERDL_POSTGRES_USER", value_parser = non_blank)]
    pub postgres_user: String,

    /// PostgreSQL password
    #[arg(
        long = "berdl-postgres-password",
        env = "BERDL_POSTGRES_PASSWORD",
        hide_env_values = true,
        value_parser = non_blank
    )]
    pub postgres_password: String,

    /// PostgreSQL database name
    #[arg(long = "berdl-postgres-db", env = "BERDL_POSTGRES_DB", value_parser = non_blank)]
    pub postgres_db: String,

    /// PostgreSQL connection URL
    #[arg(
        long = "berdl-postgres-url",
        env = "BERDL_POSTGRES_URL",
        hide_env_values = true,
        value_parser = non_blank
    )]
    pub postgres_url: String,

    /// Redis host
    #[arg(long = "berdl-redis-host", env = "BERDL_REDIS_HOST", value_parser = non_blank)]
    pub redis_host: String,

    /// Redis port
    #[arg(long = "berdl-redis-port", env = "BERDL_REDIS_PORT", value_parser = non_blank)]
    pub redis_port: String,

    /// Hive metastore Thrift URI
    #[arg(
        long = "berdl-hive-metastore-uri",
        env = "BERDL_HIVE_METASTORE_URI",
        value_parser = non_blank
    )]
    pub hive_metastore_uri: String,

    /// Delta Lake warehouse directory (S3 bucket)
    #[arg(
        long = "berdl-deltalake-warehouse-directory-path",
        env = "BERDL_DELTALAKE_WAREHOUSE_DIRECTORY_PATH",
        value_parser = non_blank
    )]
    pub deltalake_warehouse_dir: String,
}

impl fmt::Debug for DataPlaneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPlaneConfig")
            .field("postgres_user", &self.postgres_user)
            .field("postgres_password", &"<redacted>")
            .field("postgres_db", &self.postgres_db)
            .field("postgres_url", &"<redacted>")
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("hive_metastore_uri", &self.hive_metastore_uri)
            .field("deltalake_warehouse_dir", &self.deltalake_warehouse_dir)
            .finish()
    }
}

// =============================================================================
// Manager Configuration
// =============================================================================

/// Validated configuration for the cluster manager
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Kubernetes namespace for Spark clusters
    #[arg(long = "kube-namespace", env = "KUBE_NAMESPACE", value_parser = non_blank)]
    pub namespace: String,

    /// Docker image for Spark master and workers
    #[arg(long = "spark-image", env = "SPARK_IMAGE", value_parser = non_blank)]
    pub image: String,

    /// Image pull policy
    #[arg(
        long = "spark-image-pull-policy",
        env = "SPARK_IMAGE_PULL_POLICY",
        default_value = "IfNotPresent",
        value_parser = non_blank
    )]
    pub image_pull_policy: String,

    /// Spark master RPC port
    #[arg(
        long = "spark-master-port",
        env = "SPARK_MASTER_PORT",
        value_parser = value_parser!(u16).range(1..)
    )]
    pub master_port: u16,

    /// Spark master web UI port
    #[arg(
        long = "spark-master-webui-port",
        env = "SPARK_MASTER_WEBUI_PORT",
        value_parser = value_parser!(u16).range(1..)
    )]
    pub master_webui_port: u16,

    /// Spark worker daemon port
    #[arg(
        long = "spark-worker-port",
        env = "SPARK_WORKER_PORT",
        value_parser = value_parser!(u16).range(1..)
    )]
    pub worker_port: u16,

    /// Spark worker web UI port
    #[arg(
        long = "spark-worker-webui-port",
        env = "SPARK_WORKER_WEBUI_PORT",
        value_parser = value_parser!(u16).range(1..)
    )]
    pub worker_webui_port: u16,

    #[command(flatten)]
    pub defaults: ClusterDefaults,

    #[command(flatten)]
    pub spark: SparkTuning,

    #[command(flatten)]
    pub scheduling: Scheduling,

    #[command(flatten)]
    pub data_plane: DataPlaneConfig,

    /// Directory whose templates override the built-in ones
    #[arg(long = "spark-template-dir", env = "SPARK_TEMPLATE_DIR")]
    pub template_dir: Option<PathBuf>,
}

/// Parser for the configuration on its own, outside the CLI
#[derive(Parser, Debug)]
#[command(name = "spark-cluster-manager")]
struct ConfigParser {
    #[command(flatten)]
    config: ManagerConfig,
}

impl ManagerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_args([crate::NAME])
    }

    /// Load from command-line style arguments, falling back to the environment.
    /// The first item is the program name.
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ConfigParser::try_parse_from(args)
            .map(|parsed| parsed.config)
            .map_err(|e| Error::Configuration(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    const REQUIRED_FLAGS: &[&str] = &[
        "--kube-namespace",
        "--spark-image",
        "--berdl-postgres-user",
        "--berdl-postgres-password",
        "--berdl-postgres-db",
        "--berdl-postgres-url",
        "--berdl-redis-host",
        "--berdl-redis-port",
        "--berdl-hive-metastore-uri",
        "--berdl-deltalake-warehouse-directory-path",
        "--spark-master-port",
        "--spark-master-webui-port",
        "--default-spark-worker-cores",
        "--default-spark-worker-memory",
        "--spark-worker-port",
        "--spark-worker-webui-port",
    ];

    fn load(flags: &BTreeMap<&'static str, &'static str>) -> Result<ManagerConfig> {
        ManagerConfig::from_args(command_line(flags))
    }

    #[test]
    fn test_load_complete_configuration() {
        let config = sample_config();

        assert_eq!(config.namespace, "test-namespace");
        assert_eq!(config.image, "spark:test-image");
        assert_eq!(config.image_pull_policy, "IfNotPresent");
        assert_eq!(config.master_port, 7077);
        assert_eq!(config.master_webui_port, 8090);
        assert_eq!(config.worker_port, 7078);
        assert_eq!(config.worker_webui_port, 8081);
        assert_eq!(config.defaults.worker_count, 4);
        assert_eq!(config.defaults.worker_cores, 2);
        assert_eq!(config.defaults.worker_memory, "2GiB");
        assert_eq!(config.defaults.master_cores, 1);
        assert_eq!(config.defaults.master_memory, "50GiB");
        assert_eq!(config.spark, SparkTuning::default());
        assert_eq!(config.scheduling, Scheduling::default());
        assert_eq!(config.data_plane.redis_port, "6379");
        assert!(config.template_dir.is_none());
    }

    #[test]
    fn test_optional_overrides() {
        let mut flags = sample_flags();
        flags.insert("--spark-image-pull-policy", "Always");
        flags.insert("--default-worker-count", "8");
        flags.insert("--max-executors", "12");
        flags.insert("--worker-node-selector-values", "gpu");
        flags.insert("--spark-template-dir", "/etc/spark-templates");

        let config = config_from(&flags);

        assert_eq!(config.image_pull_policy, "Always");
        assert_eq!(config.defaults.worker_count, 8);
        assert_eq!(config.spark.max_executors, 12);
        assert_eq!(config.scheduling.worker_node_selector_values, "gpu");
        assert_eq!(
            config.template_dir,
            Some(PathBuf::from("/etc/spark-templates"))
        );
    }

    #[test]
    fn test_every_missing_setting_is_listed() {
        let mut flags = sample_flags();
        flags.remove("--kube-namespace");
        flags.remove("--spark-image");
        flags.remove("--berdl-redis-host");

        let err = load(&flags).unwrap_err();

        assert_matches!(&err, Error::Configuration(message) => {
            assert!(message.contains("--kube-namespace"));
            assert!(message.contains("--spark-image"));
            assert!(message.contains("--berdl-redis-host"));
            assert!(!message.contains("--berdl-postgres-user"));
        });
    }

    #[test]
    fn test_empty_configuration_lists_all_required() {
        let err = load(&BTreeMap::new()).unwrap_err();

        assert_matches!(&err, Error::Configuration(message) => {
            for flag in REQUIRED_FLAGS {
                assert!(message.contains(flag), "{} not reported", flag);
            }
        });
    }

    #[test]
    fn test_blank_value_is_rejected() {
        let mut flags = sample_flags();
        flags.insert("--berdl-redis-host", "   ");

        let err = load(&flags).unwrap_err();

        assert_matches!(&err, Error::Configuration(message) => {
            assert!(message.contains("--berdl-redis-host"));
            assert!(message.contains("must not be blank"));
        });
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut flags = sample_flags();
        flags.insert("--kube-namespace", "  spark  ");

        assert_eq!(config_from(&flags).namespace, "spark");
    }

    #[test]
    fn test_malformed_port_is_reported() {
        let mut flags = sample_flags();
        flags.insert("--spark-master-port", "seventy");

        let err = load(&flags).unwrap_err();

        assert_matches!(&err, Error::Configuration(message) => {
            assert!(message.contains("--spark-master-port"));
            assert!(message.contains("seventy"));
        });
    }

    #[test]
    fn test_malformed_memory_is_reported() {
        let mut flags = sample_flags();
        flags.insert("--default-spark-worker-memory", "2TB");

        assert_matches!(
            load(&flags),
            Err(Error::Configuration(message)) if message.contains("2TB")
        );
    }

    #[test]
    fn test_zero_worker_count_is_rejected() {
        let mut flags = sample_flags();
        flags.insert("--default-worker-count", "0");

        assert_matches!(load(&flags), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = sample_config();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("test_password"));
        assert!(debug.contains("<redacted>"));
    }
}
