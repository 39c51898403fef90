//! Admin REST API driving the scenario lifecycle.
//!
//! An orchestrator starts and ends scenarios and test cases here while the
//! system under test talks to the TCP stub. Also serves health, status and
//! Prometheus metrics.
//!
//! The API listens on a configurable port (default: 2626).

mod handlers;
mod router;
mod server;
mod types;

pub use server::AdminApiServer;
pub use types::{StartScenarioRequest, StartTestCaseRequest};
