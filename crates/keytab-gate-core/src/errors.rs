/// Failure of the gate itself, as opposed to a business outcome.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl GateError {
    /// Taxonomy class, stable for log scraping.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::InvalidInput(_) => "InvalidInput",
            GateError::ClusterNotFound(_) => "ClusterNotFound",
            GateError::UpstreamUnavailable(_) => "UpstreamUnavailable",
        }
    }

    /// Whether re-running the gate without operator action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GateError::UpstreamUnavailable(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("cluster {0} is not registered")]
    NotFound(String),
    #[error("cluster registry unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },
    #[error("{service} returned an undetermined answer for cluster {cluster}")]
    Undetermined { service: String, cluster: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("write failure: {0}")]
    WriteFailure(String),
    #[error("chain corruption at entry {0}")]
    ChainCorruption(u64),
}

impl From<RegistryError> for GateError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => GateError::ClusterNotFound(name),
            other @ RegistryError::Unavailable(_) => {
                GateError::UpstreamUnavailable(other.to_string())
            }
        }
    }
}

impl From<UpstreamError> for GateError {
    fn from(err: UpstreamError) -> Self {
        GateError::UpstreamUnavailable(err.to_string())
    }
}
