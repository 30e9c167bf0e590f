use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use keytab_gate_core::cluster::{Cluster, ConfigBag};
use keytab_gate_core::errors::{RegistryError, UpstreamError};
use keytab_gate_core::traits::{ClusterRegistry, ConfigStore, KerberosOracle};
use keytab_gate_core::types::SecurityType;

/// Point-in-time export of clusters and their desired configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterInventory {
    #[serde(default)]
    pub clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub cluster_id: u64,
    pub name: String,
    #[serde(default)]
    pub security_type: SecurityType,
    #[serde(default)]
    pub desired_configs: BTreeMap<String, DesiredConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesiredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ClusterInventory {
    fn entry(&self, name: &str) -> Option<&ClusterEntry> {
        self.clusters.iter().find(|c| c.name == name)
    }

    fn entry_for(&self, cluster: &Cluster) -> Result<&ClusterEntry, UpstreamError> {
        self.clusters
            .iter()
            .find(|c| c.cluster_id == cluster.cluster_id)
            .ok_or_else(|| UpstreamError::Undetermined {
                service: "cluster inventory".into(),
                cluster: cluster.name.clone(),
            })
    }

    /// Reject snapshots the gate could not answer consistently from.
    pub fn validate(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        let mut ids = std::collections::HashSet::new();
        for entry in &self.clusters {
            if entry.name.trim().is_empty() {
                bail!("cluster {} has a blank name", entry.cluster_id);
            }
            if !names.insert(entry.name.as_str()) {
                bail!("duplicate cluster name '{}'", entry.name);
            }
            if !ids.insert(entry.cluster_id) {
                bail!("duplicate cluster_id {}", entry.cluster_id);
            }
        }
        Ok(())
    }
}

impl ClusterRegistry for ClusterInventory {
    fn get_cluster(&self, name: &str) -> Result<Cluster, RegistryError> {
        self.entry(name)
            .map(|e| Cluster {
                cluster_id: e.cluster_id,
                name: e.name.clone(),
            })
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}

impl KerberosOracle for ClusterInventory {
    fn is_cluster_kerberos_enabled(&self, cluster: &Cluster) -> Result<bool, UpstreamError> {
        Ok(self.entry_for(cluster)?.security_type == SecurityType::Kerberos)
    }
}

impl ConfigStore for ClusterInventory {
    fn desired_config(
        &self,
        cluster: &Cluster,
        config_type: &str,
    ) -> Result<Option<ConfigBag>, UpstreamError> {
        let entry = self.entry_for(cluster)?;
        Ok(entry.desired_configs.get(config_type).map(|c| ConfigBag {
            config_type: config_type.to_string(),
            tag: c.tag.clone(),
            properties: c.properties.clone(),
        }))
    }
}

/// Load and validate an inventory snapshot from a file.
pub fn load_inventory(path: &str) -> Result<ClusterInventory> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read inventory {path}"))?;
    let inventory: ClusterInventory =
        serde_json::from_str(&content).with_context(|| format!("{path}: invalid inventory JSON"))?;
    inventory
        .validate()
        .with_context(|| format!("{path}: inconsistent inventory"))?;
    Ok(inventory)
}
