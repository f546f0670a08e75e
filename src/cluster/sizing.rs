//! Cluster sizing requests
//!
//! Validates the size of a requested cluster and, for restricted callers,
//! holds it to the configured defaults.

use crate::config::ClusterDefaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fraction of container memory handed to the Spark worker daemon
const WORKER_MEMORY_FRACTION: f64 = 0.9;

/// Requested size of a Spark cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of worker replicas
    pub worker_count: u32,
    /// CPU cores per worker
    pub worker_cores: u32,
    /// Memory per worker, e.g. "10G"
    pub worker_memory: String,
    /// CPU cores for the master
    pub master_cores: u32,
    /// Memory for the master, e.g. "10G"
    pub master_memory: String,
}

impl From<&ClusterDefaults> for ClusterConfig {
    fn from(defaults: &ClusterDefaults) -> Self {
        Self {
            worker_count: defaults.worker_count,
            worker_cores: defaults.worker_cores,
            worker_memory: defaults.worker_memory.clone(),
            master_cores: defaults.master_cores,
            master_memory: defaults.master_memory.clone(),
        }
    }
}

impl ClusterConfig {
    /// Check counts are positive and memory values are well formed
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.worker_count == 0 {
            problems.push("worker_count must be at least 1".to_string());
        }
        if self.worker_cores == 0 {
            problems.push("worker_cores must be at least 1".to_string());
        }
        if self.master_cores == 0 {
            problems.push("master_cores must be at least 1".to_string());
        }
        for (field, value) in [
            ("worker_memory", &self.worker_memory),
            ("master_memory", &self.master_memory),
        ] {
            if let Err(e) = parse_memory_gib(value) {
                problems.push(format!("{}: {}", field, e));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidRequest(problems.join("; ")))
        }
    }

    /// Reject any value larger than the configured defaults
    pub fn check_limits(&self, defaults: &ClusterDefaults) -> Result<()> {
        let worker_memory = parse_memory_gib(&self.worker_memory)?;
        let master_memory = parse_memory_gib(&self.master_memory)?;
        let max_worker_memory = parse_memory_gib(&defaults.worker_memory)?;
        let max_master_memory = parse_memory_gib(&defaults.master_memory)?;

        let exceeds = self.worker_count > defaults.worker_count
            || self.worker_cores > defaults.worker_cores
            || worker_memory > max_worker_memory
            || self.master_cores > defaults.master_cores
            || master_memory > max_master_memory;

        if exceeds {
            return Err(Error::ConfigurationLimitExceeded(format!(
                "Configuration exceeds default limits for non-admin users. \
                 Max Workers: {}, Max Worker Cores: {}, Max Worker Memory: {}, \
                 Max Master Cores: {}, Max Master Memory: {}.",
                defaults.worker_count,
                defaults.worker_cores,
                defaults.worker_memory,
                defaults.master_cores,
                defaults.master_memory,
            )));
        }

        Ok(())
    }
}

/// Parse a memory string ("10G", "10Gi", "10GiB") into GiB
pub fn parse_memory_gib(s: &str) -> Result<u64> {
    let s = s.trim();
    let num_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let (num_str, unit_str) = s.split_at(num_end);
    if num_str.is_empty() {
        return Err(Error::InvalidMemory(format!(
            "'{}' must be in format '{{int}}G'",
            s
        )));
    }

    match unit_str {
        "G" | "Gi" | "GiB" => num_str
            .parse()
            .map_err(|_| Error::InvalidMemory(format!("'{}' is out of range", s))),
        _ => Err(Error::InvalidMemory(format!(
            "'{}' must be in format '{{int}}G'",
            s
        ))),
    }
}

/// Memory for the Spark worker daemon, in the "{n}m" form Spark expects
pub fn worker_daemon_memory(container_memory: &str) -> Result<String> {
    let gib = parse_memory_gib(container_memory)?;
    let mib = (gib as f64 * 1024.0 * WORKER_MEMORY_FRACTION) as u64;
    Ok(format!("{}m", mib))
}
