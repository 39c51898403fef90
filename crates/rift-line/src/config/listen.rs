//! Listener configuration for the stub front end and the admin API.

use serde::{Deserialize, Serialize};

/// TCP front end that feeds requests into the engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request delimiter on the wire (may be multi-byte, e.g. "\r\n")
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Maximum connections served at once (bounded worker pool)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Longest accepted request, delimiter excluded; longer requests close the connection
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9100
}

fn default_delimiter() -> String {
    "\n".to_string()
}

fn default_max_connections() -> usize {
    64
}

fn default_max_request_bytes() -> usize {
    crate::channel::DEFAULT_MAX_REQUEST_BYTES
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            delimiter: default_delimiter(),
            max_connections: default_max_connections(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_host")]
    pub host: String,
    #[serde(default = "default_admin_port")]
    pub port: u16,
}

fn default_admin_host() -> String {
    "127.0.0.1".to_string()
}

fn default_admin_port() -> u16 {
    2626
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: default_admin_host(),
            port: default_admin_port(),
        }
    }
}
