use serde::{Deserialize, Serialize};

use crate::types::GateStatus;

/// Result handed back to the pipeline executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: GateStatus,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub structured_out: serde_json::Value,
}

impl Report {
    pub fn new(status: GateStatus, stdout: String, structured_out: serde_json::Value) -> Self {
        let exit_code = match status {
            GateStatus::Failed => 1,
            GateStatus::Completed | GateStatus::Holding => 0,
        };
        Self {
            status,
            exit_code,
            stdout,
            stderr: String::new(),
            structured_out,
        }
    }

    pub fn failed(stdout: String, stderr: String, structured_out: serde_json::Value) -> Self {
        Self {
            stderr,
            ..Self::new(GateStatus::Failed, stdout, structured_out)
        }
    }
}
