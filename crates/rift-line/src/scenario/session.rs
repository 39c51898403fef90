//! Active scenario / test case state shared by lifecycle and dispatch.

use crate::evidence::EvidenceRecorder;
use crate::index::ResourceIndex;
use crate::render::ResponseRenderer;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Identity of a running scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveScenario {
    pub user_id: String,
    pub group_id: String,
    pub scenario_id: String,
}

impl ActiveScenario {
    pub fn same_scenario(&self, group_id: &str, scenario_id: &str) -> bool {
        self.group_id == group_id && self.scenario_id == scenario_id
    }
}

impl fmt::Display for ActiveScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.scenario_id)
    }
}

/// Everything that lives exactly as long as one scenario.
///
/// Replacing the runtime is how index, evidence and response cache are reset
/// together: in-flight requests keep the runtime they started with.
pub struct ScenarioRuntime {
    pub index: ResourceIndex,
    pub renderer: ResponseRenderer,
    pub evidence: EvidenceRecorder,
}

#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) scenario: Option<(ActiveScenario, Arc<ScenarioRuntime>)>,
    pub(crate) testcase: Option<String>,
}

/// What a request sees when it starts
#[derive(Clone)]
pub struct SessionSnapshot {
    pub scenario: ActiveScenario,
    pub testcase: String,
    pub runtime: Arc<ScenarioRuntime>,
}

/// Missing state that prevents dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inactive {
    Scenario,
    TestCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    ScenarioActive,
    TestCaseActive,
}

/// Serializable view of the session for the admin API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ActiveScenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testcase: Option<String>,
    pub testcases: Vec<String>,
    pub strategy: &'static str,
}

#[derive(Default)]
pub struct Session {
    pub(crate) state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, Inactive> {
        let state = self.state.read();
        let (scenario, runtime) = state.scenario.as_ref().ok_or(Inactive::Scenario)?;
        let testcase = state.testcase.as_ref().ok_or(Inactive::TestCase)?;
        Ok(SessionSnapshot {
            scenario: scenario.clone(),
            testcase: testcase.clone(),
            runtime: Arc::clone(runtime),
        })
    }

    pub fn active_scenario(&self) -> Option<ActiveScenario> {
        self.state
            .read()
            .scenario
            .as_ref()
            .map(|(scenario, _)| scenario.clone())
    }

    pub fn runtime(&self) -> Option<Arc<ScenarioRuntime>> {
        self.state
            .read()
            .scenario
            .as_ref()
            .map(|(_, runtime)| Arc::clone(runtime))
    }

    pub fn active_testcase(&self) -> Option<String> {
        self.state.read().testcase.clone()
    }

    pub fn status(&self, strategy: &'static str) -> SessionStatus {
        let state = self.state.read();
        let phase = match (&state.scenario, &state.testcase) {
            (None, _) => SessionPhase::Idle,
            (Some(_), None) => SessionPhase::ScenarioActive,
            (Some(_), Some(_)) => SessionPhase::TestCaseActive,
        };
        SessionStatus {
            state: phase,
            scenario: state.scenario.as_ref().map(|(s, _)| s.clone()),
            testcase: state.testcase.clone(),
            testcases: state
                .scenario
                .as_ref()
                .map(|(_, runtime)| runtime.index.testcase_ids())
                .unwrap_or_default(),
            strategy,
        }
    }
}
