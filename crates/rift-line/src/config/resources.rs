//! On-disk layout and resource store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourcesConfig {
    /// Scenario resources land in `<root>/<group>/<scenario>/<testcase>/`
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Evidence lands in `<evidence_root>/<group>/<scenario>/<testcase>/`
    #[serde(default = "default_evidence_root")]
    pub evidence_root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("./work/resources")
}

fn default_evidence_root() -> PathBuf {
    PathBuf::from("./work/evidence")
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            evidence_root: default_evidence_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String, // "local" or "none"
    /// Download source for the local backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Upload target for the local backend (defaults to `<path>/../uploads`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_path: Option<PathBuf>,
}

fn default_backend() -> String {
    "none".to_string()
}

impl Default for ResourceStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            evidence_path: None,
        }
    }
}
