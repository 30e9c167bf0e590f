use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::GateError;
use crate::CLUSTER_NAME_PARAM;

/// One invocation of the gate for one cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub command_params: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<u64>,
}

impl ExecutionContext {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.command_params.insert(key.into(), value.into());
        self
    }

    pub fn with_ids(mut self, request_id: u64, stage_id: u64) -> Self {
        self.request_id = Some(request_id);
        self.stage_id = Some(stage_id);
        self
    }

    /// The cluster this invocation targets.
    ///
    /// Uses `cluster_name`, falling back to the `clusterName` command
    /// parameter when the field is blank.
    pub fn resolve_cluster_name(&self) -> Result<&str, GateError> {
        let field = self.cluster_name.trim();
        if !field.is_empty() {
            return Ok(field);
        }
        self.command_params
            .get(CLUSTER_NAME_PARAM)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GateError::InvalidInput("cluster name is missing or blank".into()))
    }
}
