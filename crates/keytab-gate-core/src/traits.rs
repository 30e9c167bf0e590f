use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::{Cluster, ConfigBag};
use crate::errors::{AuditError, RegistryError, UpstreamError};
use crate::types::{GateStatus, KdcType};

/// Resolves cluster names to handles.
pub trait ClusterRegistry: Send + Sync {
    fn get_cluster(&self, name: &str) -> Result<Cluster, RegistryError>;
}

/// Answers whether a cluster is secured by Kerberos.
pub trait KerberosOracle: Send + Sync {
    fn is_cluster_kerberos_enabled(&self, cluster: &Cluster) -> Result<bool, UpstreamError>;
}

/// Read-only access to a cluster's desired configuration.
pub trait ConfigStore: Send + Sync {
    fn desired_config(
        &self,
        cluster: &Cluster,
        config_type: &str,
    ) -> Result<Option<ConfigBag>, UpstreamError>;
}

/// One gate evaluation, as recorded for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateAuditEvent {
    pub cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<u64>,
    pub status: GateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kdc_type: Option<KdcType>,
    pub reason: String,
    pub ts: DateTime<Utc>,
}

/// Receives audit events for persistence.
pub trait AuditSink: Send + Sync {
    fn log_gate_report(&self, event: &GateAuditEvent) -> Result<(), AuditError>;
}
