//! Error types for the stub engine.
//!
//! Lifecycle errors propagate to the orchestrator. Dispatch errors never leave
//! the engine: they are logged, counted and handed to the optional error hook.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while building the resource index for a scenario
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read resource tree {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Resource file {0} has no pattern line")]
    MissingPattern(PathBuf),
}

/// Failure while parsing a response resource file
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to read response file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Invalid sleep value '{value}' on line {line}")]
    InvalidSleep { value: String, line: usize },
    #[error("Script block opened on line {0} is never closed")]
    UnterminatedScript(usize),
}

/// Failure while producing the payload for a single request
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Script evaluation failed for {file}: {source}")]
    Script {
        file: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to record evidence: {0}")]
    Evidence(#[source] std::io::Error),
    #[error("Failed to write response: {0}")]
    Write(#[source] std::io::Error),
}

/// Lifecycle precondition violations and setup failures
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(
        "Scenario {active_group}/{active_scenario} (user {active_user}) is already active, \
         cannot start {group}/{scenario} for user {user}"
    )]
    ScenarioAlreadyActive {
        active_user: String,
        active_group: String,
        active_scenario: String,
        user: String,
        group: String,
        scenario: String,
    },
    #[error("Invalid {kind} '{value}': must be a non-empty single path segment")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("No active scenario")]
    NoActiveScenario,
    #[error("Test case {active} is already active in scenario {scenario}, cannot start {testcase}")]
    TestCaseAlreadyActive {
        scenario: String,
        active: String,
        testcase: String,
    },
    #[error("No active test case in scenario {scenario}")]
    NoActiveTestCase { scenario: String },
    #[error("Test case {testcase} does not exist in scenario {scenario}")]
    UnknownTestCase { scenario: String, testcase: String },
    #[error("Failed to index resources of scenario {scenario}: {source}")]
    Index {
        scenario: String,
        #[source]
        source: IndexError,
    },
    #[error("Resource store failed for scenario {scenario}: {source}")]
    Store {
        scenario: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("I/O failure for scenario {scenario} at {path}: {source}")]
    Io {
        scenario: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
