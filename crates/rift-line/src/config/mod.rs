//! Configuration types for Rift Line.

mod listen;
mod resources;
mod responses;
mod scripting;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use listen::{AdminConfig, ListenConfig};
pub use resources::{ResourceStoreConfig, ResourcesConfig};
pub use responses::{DispatchConfig, DispatchStrategy, ResponsesConfig};
pub use scripting::ScriptEngineConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Identifies this stub instance to the resource store
    #[serde(default = "default_stub_id")]
    pub stub_id: String,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub responses: ResponsesConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub script_engine: ScriptEngineConfig,
    #[serde(default)]
    pub resource_store: ResourceStoreConfig,
}

fn default_stub_id() -> String {
    "rift-line".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stub_id: default_stub_id(),
            listen: ListenConfig::default(),
            admin: AdminConfig::default(),
            resources: ResourcesConfig::default(),
            responses: ResponsesConfig::default(),
            dispatch: DispatchConfig::default(),
            script_engine: ScriptEngineConfig::default(),
            resource_store: ResourceStoreConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        // serde_yaml rejects an empty document, treat it as all defaults
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.stub_id.trim().is_empty() {
            anyhow::bail!("'stub_id' must not be empty");
        }

        if self.listen.delimiter.is_empty() {
            anyhow::bail!("'listen.delimiter' must not be empty");
        }

        if self.listen.max_connections == 0 {
            anyhow::bail!("'listen.max_connections' must be greater than zero");
        }

        if self.listen.max_request_bytes == 0 {
            anyhow::bail!("'listen.max_request_bytes' must be greater than zero");
        }

        let root = &self.resources.root;
        let evidence = &self.resources.evidence_root;
        if root.starts_with(evidence) || evidence.starts_with(root) {
            anyhow::bail!(
                "'resources.root' ({}) and 'resources.evidence_root' ({}) must not contain each other. \
                 Test cases are discovered from the root's subdirectories",
                root.display(),
                evidence.display()
            );
        }

        if self.script_engine.engine != "rhai" {
            anyhow::bail!(
                "Unsupported script engine: '{}'. Currently supported: rhai",
                self.script_engine.engine
            );
        }

        match self.resource_store.backend.as_str() {
            "none" => {}
            "local" => {
                if self.resource_store.path.is_none() {
                    anyhow::bail!("'resource_store.path' is required for the local backend");
                }
            }
            other => anyhow::bail!(
                "Unknown resource store backend: '{other}'. Supported backends: local, none"
            ),
        }

        Ok(())
    }
}
