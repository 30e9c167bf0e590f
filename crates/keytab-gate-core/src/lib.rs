#![forbid(unsafe_code)]

pub mod cluster;
pub mod context;
pub mod errors;
pub mod report;
pub mod traits;
pub mod types;

/// Name of the configuration bag holding Kerberos settings.
pub const KERBEROS_ENV: &str = "kerberos-env";

/// Property within `kerberos-env` naming the KDC technology.
pub const KDC_TYPE_KEY: &str = "kdc_type";

/// Command parameter carrying the cluster name when the context field is blank.
pub const CLUSTER_NAME_PARAM: &str = "clusterName";
