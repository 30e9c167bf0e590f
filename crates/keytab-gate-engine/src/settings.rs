use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = ".ktgate/settings.json";

/// Environment variable overriding `log_filter`.
pub const LOG_ENV: &str = "KTGATE_LOG";

/// Operator settings for running the gate outside the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSettings {
    /// Audit log receiving every decision, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<String>,

    /// `tracing` filter directive, e.g. `warn` or `keytab_gate_engine=debug`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            audit_log: None,
            log_filter: default_log_filter(),
        }
    }
}

impl GateSettings {
    /// Load settings from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (DEFAULT_SETTINGS_PATH, false),
        };
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("cannot read settings {path}")),
        };
        serde_json::from_str(&content).with_context(|| format!("{path}: invalid settings JSON"))
    }

    /// Filter directive after applying the environment override.
    pub fn effective_log_filter(&self) -> String {
        std::env::var(LOG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.log_filter.clone())
    }

    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("cannot write settings {path}"))
    }
}
