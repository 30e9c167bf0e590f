use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

use keytab_gate_core::errors::AuditError;
use keytab_gate_core::traits::{AuditSink, GateAuditEvent};

const GENESIS: &str = "genesis";

fn line_hash(line: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(line.as_bytes()))
}

/// Append an audit entry to the log file, maintaining hash chain.
///
/// Each entry gets a `prev_hash` field containing the SHA-256 of the previous
/// line. The first entry uses "genesis". Returns the hash of the new line.
///
/// An exclusive `flock` is held on the log from reading the chain head until
/// the new line is written, so concurrent writers (threads or processes)
/// serialize and never fork the chain.
pub fn append_audit(path: &str, entry: &serde_json::Value) -> Result<String> {
    let mut entry = entry.clone();
    let Some(obj) = entry.as_object_mut() else {
        bail!("audit entry must be a JSON object");
    };

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .truncate(false)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open audit {path}"))?;
    fs2::FileExt::lock_exclusive(&file).with_context(|| format!("cannot lock audit {path}"))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("cannot read audit {path}"))?;

    let prev_hash = content
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(line_hash)
        .unwrap_or_else(|| GENESIS.to_string());
    obj.insert("prev_hash".into(), serde_json::Value::String(prev_hash));

    let entry_json = serde_json::to_string(&entry)?;
    let hash = line_hash(&entry_json);

    let mut line = entry_json;
    if !content.is_empty() && !content.ends_with('\n') {
        line.insert(0, '\n');
    }
    line.push('\n');
    file.write_all(line.as_bytes())
        .and_then(|()| file.sync_data())
        .with_context(|| format!("cannot write audit {path}"))?;

    // Closing the file releases the lock.
    Ok(hash)
}

/// Verify the hash chain in an audit log file.
///
/// Returns the number of valid entries.
pub fn verify_chain(path: &str) -> Result<u64> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read audit {path}"))?;

    let mut count = 0u64;
    let mut prev_hash = GENESIS.to_string();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("invalid JSON at line {}", i + 1))?;

        let entry_prev = entry
            .get("prev_hash")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(GENESIS);
        if entry_prev != prev_hash {
            return Err(AuditError::ChainCorruption(count)).with_context(|| {
                format!("expected prev_hash '{prev_hash}', got '{entry_prev}'")
            });
        }

        prev_hash = line_hash(line);
        count += 1;
    }

    Ok(count)
}

/// Key under which `summarize` counts lines that are not valid JSON.
pub const MALFORMED: &str = "MALFORMED";

/// Key under which `summarize` counts entries without a status.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Count audited gate decisions per status.
///
/// Unparseable lines are counted under [`MALFORMED`] rather than skipped.
pub fn summarize(path: &str) -> Result<BTreeMap<String, u64>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read audit {path}"))?;

    let mut counts = BTreeMap::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let key = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(entry) => entry
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or(UNKNOWN_STATUS)
                .to_string(),
            Err(_) => MALFORMED.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Hash-chained JSONL file receiving gate audit events.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: String,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl AuditSink for JsonlAuditLog {
    fn log_gate_report(&self, event: &GateAuditEvent) -> Result<(), AuditError> {
        let mut entry =
            serde_json::to_value(event).map_err(|e| AuditError::WriteFailure(e.to_string()))?;
        if let Some(obj) = entry.as_object_mut() {
            obj.insert(
                "event_type".into(),
                serde_json::Value::String("KeytabGateDecision".into()),
            );
        }
        append_audit(&self.path, &entry)
            .map(|_| ())
            .map_err(|e| AuditError::WriteFailure(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use keytab_gate_core::types::{GateStatus, KdcType};
    use tempfile::NamedTempFile;

    fn event(status: GateStatus) -> GateAuditEvent {
        GateAuditEvent {
            cluster_name: "c1".into(),
            request_id: Some(1),
            stage_id: Some(2),
            status,
            kdc_type: Some(KdcType::MitKdc),
            reason: "Regenerate keytabs after upgrade is complete.".into(),
            ts: Utc::now(),
        }
    }

    #[test]
    fn append_and_verify() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        append_audit(&path, &serde_json::json!({"status": "COMPLETED"})).unwrap();
        append_audit(&path, &serde_json::json!({"status": "HOLDING"})).unwrap();

        assert_eq!(verify_chain(&path).unwrap(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().next().unwrap().contains("\"prev_hash\":\"genesis\""));
    }

    #[test]
    fn append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.audit.jsonl");
        let path = path.to_str().unwrap();

        append_audit(path, &serde_json::json!({"status": "FAILED"})).unwrap();
        assert_eq!(verify_chain(path).unwrap(), 1);
    }

    #[test]
    fn non_object_entry_rejected() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert!(append_audit(path, &serde_json::json!("just a string")).is_err());
    }

    #[test]
    fn verify_detects_tampering() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        append_audit(&path, &serde_json::json!({"reason": "first"})).unwrap();
        append_audit(&path, &serde_json::json!({"reason": "second"})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("first", "TAMPERED", 1);
        std::fs::write(&path, tampered).unwrap();

        let err = verify_chain(&path).unwrap_err();
        assert!(format!("{err:#}").contains("chain corruption at entry 1"));
    }

    #[test]
    fn verify_chain_empty_file_is_zero_entries() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        std::fs::write(&path, "").unwrap();

        assert_eq!(verify_chain(&path).unwrap(), 0);
    }

    #[test]
    fn concurrent_writers_keep_chain_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.audit.jsonl");
        let log = JsonlAuditLog::new(path.to_str().unwrap());

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        log.log_gate_report(&event(GateStatus::Holding)).unwrap();
                    }
                });
            }
        });

        assert_eq!(verify_chain(log.path()).unwrap(), 200);
        assert_eq!(summarize(log.path()).unwrap().get("HOLDING"), Some(&200));
    }

    #[test]
    fn append_after_unterminated_line_starts_new_line() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        append_audit(&path, &serde_json::json!({"status": "COMPLETED"})).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.trim_end()).unwrap();
        append_audit(&path, &serde_json::json!({"status": "HOLDING"})).unwrap();

        assert_eq!(verify_chain(&path).unwrap(), 2);
    }

    #[test]
    fn summarize_counts_malformed_lines() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        append_audit(&path, &serde_json::json!({"status": "HOLDING"})).unwrap();
        append_audit(&path, &serde_json::json!({"reason": "no status"})).unwrap();
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"status\": \"HOLD\n");
        std::fs::write(&path, content).unwrap();

        let counts = summarize(&path).unwrap();
        assert_eq!(counts.get("HOLDING"), Some(&1));
        assert_eq!(counts.get(UNKNOWN_STATUS), Some(&1));
        assert_eq!(counts.get(MALFORMED), Some(&1));
    }

    #[test]
    fn sink_writes_chained_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c1.audit.jsonl");
        let log = JsonlAuditLog::new(path.to_str().unwrap());

        log.log_gate_report(&event(GateStatus::Holding)).unwrap();
        log.log_gate_report(&event(GateStatus::Completed)).unwrap();
        log.log_gate_report(&event(GateStatus::Holding)).unwrap();

        assert_eq!(verify_chain(log.path()).unwrap(), 3);
        let counts = summarize(log.path()).unwrap();
        assert_eq!(counts.get("HOLDING"), Some(&2));
        assert_eq!(counts.get("COMPLETED"), Some(&1));

        let first = std::fs::read_to_string(log.path()).unwrap();
        let first: serde_json::Value =
            serde_json::from_str(first.lines().next().unwrap()).unwrap();
        assert_eq!(first["event_type"], "KeytabGateDecision");
        assert_eq!(first["kdc_type"], "mit-kdc");
    }

    #[test]
    fn sink_reports_unwritable_path() {
        let log = JsonlAuditLog::new("/nonexistent-dir/gate.audit.jsonl");
        let err = log.log_gate_report(&event(GateStatus::Failed)).unwrap_err();
        assert!(matches!(err, AuditError::WriteFailure(_)));
    }
}
