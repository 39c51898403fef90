//! Script engine configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptEngineConfig {
    /// Without an engine, response scripts are ignored and the raw message is served
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_engine_type")]
    pub engine: String, // only "rhai"
    /// Operation budget per evaluation (0 = unlimited)
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_engine_type() -> String {
    "rhai".to_string()
}

fn default_max_operations() -> u64 {
    1_000_000
}

impl Default for ScriptEngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            engine: default_engine_type(),
            max_operations: default_max_operations(),
        }
    }
}
