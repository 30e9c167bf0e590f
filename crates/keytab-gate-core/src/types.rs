use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Outcome signaled to the pipeline executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    /// Proceed with the upgrade.
    Completed,
    /// Pause until an operator acknowledges or remediates.
    Holding,
    /// The gate could not be evaluated.
    Failed,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Completed => "COMPLETED",
            GateStatus::Holding => "HOLDING",
            GateStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal_success(self) -> bool {
        self == GateStatus::Completed
    }

    pub fn requires_operator(self) -> bool {
        self == GateStatus::Holding
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security posture recorded for a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityType {
    #[default]
    None,
    Kerberos,
}

/// Normalized KDC technology behind a Kerberized cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KdcType {
    None,
    MitKdc,
    ActiveDirectory,
    Ipa,
    /// Non-blank value matching no known KDC. Keeps the raw text.
    Unrecognized(String),
}

impl KdcType {
    /// Classify the raw `kdc_type` property. Absent or blank means `None`.
    pub fn from_property(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return KdcType::None;
        };
        let normalized = raw.replace('-', "_").to_ascii_uppercase();
        match normalized.as_str() {
            "NONE" => KdcType::None,
            "MIT_KDC" => KdcType::MitKdc,
            "ACTIVE_DIRECTORY" => KdcType::ActiveDirectory,
            "IPA" => KdcType::Ipa,
            _ => KdcType::Unrecognized(raw.to_string()),
        }
    }

    /// Canonical property spelling, as written into `kerberos-env`.
    pub fn as_property(&self) -> &str {
        match self {
            KdcType::None => "none",
            KdcType::MitKdc => "mit-kdc",
            KdcType::ActiveDirectory => "active-directory",
            KdcType::Ipa => "ipa",
            KdcType::Unrecognized(raw) => raw,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, KdcType::None)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, KdcType::Unrecognized(_))
    }
}

impl fmt::Display for KdcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdcType::None => f.write_str("NONE"),
            KdcType::MitKdc => f.write_str("MIT_KDC"),
            KdcType::ActiveDirectory => f.write_str("ACTIVE_DIRECTORY"),
            KdcType::Ipa => f.write_str("IPA"),
            KdcType::Unrecognized(raw) => write!(f, "{raw} (unrecognized)"),
        }
    }
}

impl FromStr for KdcType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KdcType::from_property(Some(s)))
    }
}

impl Serialize for KdcType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_property())
    }
}

impl<'de> Deserialize<'de> for KdcType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(KdcType::from_property(Some(&s)))
    }
}
