use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle for a registered cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: u64,
    pub name: String,
}

/// Desired configuration of one type, e.g. `kerberos-env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigBag {
    pub config_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ConfigBag {
    pub fn new(config_type: impl Into<String>) -> Self {
        Self {
            config_type: config_type.into(),
            tag: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Trimmed property value; blank counts as absent.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
