//! Script transforms applied to response messages.
//!
//! A response file may embed a script block. When an engine is configured the
//! script receives the raw request and the parsed message and its result
//! replaces the message.

mod rhai_engine;

pub use rhai_engine::RhaiScriptEngine;

use crate::config::ScriptEngineConfig;
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Variables exposed to a response script
#[derive(Debug, Clone, Copy)]
pub struct ScriptVariables<'a> {
    /// Raw request text as received
    pub request: &'a str,
    /// Message parsed from the response file
    pub response_message: &'a str,
}

/// Backend-agnostic script evaluation
///
/// Evaluation is synchronous; it runs on the thread handling the request.
pub trait ScriptEngine: Send + Sync {
    /// Evaluate `script` and return the payload to send
    fn evaluate(&self, script: &str, variables: &ScriptVariables<'_>) -> Result<String>;
}

/// Create the configured script engine, `None` when scripting is disabled
pub fn create_script_engine(config: &ScriptEngineConfig) -> Result<Option<Arc<dyn ScriptEngine>>> {
    if !config.enabled {
        tracing::info!("Script engine disabled, response scripts will be ignored");
        return Ok(None);
    }

    match config.engine.as_str() {
        "rhai" => {
            tracing::info!(
                "Using Rhai script engine (max_operations={})",
                config.max_operations
            );
            Ok(Some(Arc::new(RhaiScriptEngine::new(config.max_operations))))
        }
        other => Err(anyhow!("Unknown script engine type: {other}")),
    }
}
