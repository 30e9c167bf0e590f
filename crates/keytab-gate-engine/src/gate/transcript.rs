use keytab_gate_core::types::KdcType;

/// Operator-facing output collected while the gate runs.
#[derive(Debug, Default)]
pub(crate) struct Transcript {
    pub stdout: String,
    pub cluster: Option<String>,
    pub kerberos_enabled: Option<bool>,
    pub kdc_type: Option<KdcType>,
}

impl Transcript {
    pub fn line(&mut self, text: impl AsRef<str>) {
        if !self.stdout.is_empty() {
            self.stdout.push('\n');
        }
        self.stdout.push_str(text.as_ref());
    }

    pub fn last_line(&self) -> &str {
        self.stdout.lines().last().unwrap_or_default()
    }

    /// Facts established so far, for the structured output.
    pub fn structured(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        if let Some(cluster) = &self.cluster {
            out.insert("cluster".into(), serde_json::json!(cluster));
        }
        if let Some(enabled) = self.kerberos_enabled {
            out.insert("kerberos_enabled".into(), serde_json::json!(enabled));
        }
        if let Some(kdc_type) = &self.kdc_type {
            out.insert("kdc_type".into(), serde_json::json!(kdc_type));
        }
        serde_json::Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_newline_separated() {
        let mut t = Transcript::default();
        t.line("first");
        t.line(String::from("second"));
        assert_eq!(t.stdout, "first\nsecond");
        assert_eq!(t.last_line(), "second");
    }

    #[test]
    fn structured_only_has_known_facts() {
        let mut t = Transcript::default();
        assert_eq!(t.structured(), serde_json::json!({}));

        t.cluster = Some("c1".into());
        t.kdc_type = Some(KdcType::MitKdc);
        assert_eq!(
            t.structured(),
            serde_json::json!({"cluster": "c1", "kdc_type": "mit-kdc"})
        );
    }
}
