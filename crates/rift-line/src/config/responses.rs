//! Response rendering and dispatch configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponsesConfig {
    /// Payload written when no pattern matches or a sequence is exhausted
    #[serde(default = "default_not_found_message")]
    pub not_found_message: String,
    /// Payload used when a response file has no message line
    #[serde(default)]
    pub default_message: String,
    /// Appended to every payload when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminator: Option<String>,
    /// Cache parsed response files for the lifetime of a scenario
    #[serde(default = "default_true")]
    pub cache: bool,
    /// Restart a pattern's sequence from the first file once exhausted
    #[serde(default)]
    pub allow_repeat_requests: bool,
    /// Persist captured requests as evidence artifacts
    #[serde(default = "default_true")]
    pub save_requests: bool,
}

fn default_not_found_message() -> String {
    "NOT_FOUND".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self {
            not_found_message: default_not_found_message(),
            default_message: String::new(),
            terminator: None,
            cache: default_true(),
            allow_repeat_requests: false,
            save_requests: default_true(),
        }
    }
}

/// How request handling is ordered against lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// One request at a time, totally ordered with lifecycle transitions
    #[default]
    Serialized,
    /// Requests run in parallel; lifecycle transitions stay exclusive
    Concurrent,
}

impl DispatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStrategy::Serialized => "serialized",
            DispatchStrategy::Concurrent => "concurrent",
        }
    }
}

impl std::str::FromStr for DispatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serialized" => Ok(DispatchStrategy::Serialized),
            "concurrent" => Ok(DispatchStrategy::Concurrent),
            other => Err(format!("Unknown dispatch strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub strategy: DispatchStrategy,
}
