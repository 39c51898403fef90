//! Scenario and test case lifecycle.
//!
//! States: Idle → ScenarioActive → (TestCaseActive ⇄ ScenarioActive)* → Idle.
//! Every transition runs under one lifecycle lock; the serialized dispatch
//! strategy reuses the same lock so requests and transitions are totally
//! ordered.

mod session;

pub use session::{
    ActiveScenario, Inactive, ScenarioRuntime, Session, SessionPhase, SessionSnapshot,
    SessionStatus,
};

use crate::dispatch::PatternCache;
use crate::error::LifecycleError;
use crate::evidence::EvidenceRecorder;
use crate::index::ResourceIndex;
use crate::metrics;
use crate::render::ResponseRenderer;
use crate::store::ResourceStore;
use parking_lot::{Mutex, MutexGuard};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where scenario resources and evidence live on disk
#[derive(Debug, Clone)]
pub struct ResourceLayout {
    pub resource_root: PathBuf,
    pub evidence_root: PathBuf,
}

impl ResourceLayout {
    pub fn scenario_dir(&self, group: &str, scenario: &str) -> PathBuf {
        self.resource_root.join(group).join(scenario)
    }

    pub fn scenario_evidence_dir(&self, group: &str, scenario: &str) -> PathBuf {
        self.evidence_root.join(group).join(scenario)
    }
}

/// Settings the manager needs to build a scenario runtime
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub stub_id: String,
    pub default_message: String,
    pub cache_responses: bool,
}

/// Orchestrates scenario/test case transitions and resource provisioning
pub struct ScenarioManager {
    options: ScenarioOptions,
    layout: ResourceLayout,
    session: Arc<Session>,
    patterns: Arc<PatternCache>,
    store: Arc<dyn ResourceStore>,
    lifecycle: Mutex<()>,
}

impl ScenarioManager {
    pub fn new(
        options: ScenarioOptions,
        layout: ResourceLayout,
        session: Arc<Session>,
        patterns: Arc<PatternCache>,
        store: Arc<dyn ResourceStore>,
    ) -> Self {
        Self {
            options,
            layout,
            session,
            patterns,
            store,
            lifecycle: Mutex::new(()),
        }
    }

    /// Exclusive access against every lifecycle transition
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn layout(&self) -> &ResourceLayout {
        &self.layout
    }

    /// Provision and index a scenario.
    ///
    /// Starting the scenario that is already active is a no-op; starting any
    /// other scenario while one is active fails.
    pub fn start_scenario(
        &self,
        user_id: &str,
        group_id: &str,
        scenario_id: &str,
    ) -> Result<(), LifecycleError> {
        validate_identifier("user id", user_id)?;
        validate_identifier("scenario group id", group_id)?;
        validate_identifier("scenario id", scenario_id)?;

        let _guard = self.lifecycle.lock();

        if let Some(active) = self.session.active_scenario() {
            if active.same_scenario(group_id, scenario_id) {
                info!(
                    "Scenario {} already active (user {}), ignoring start from user {}",
                    active, active.user_id, user_id
                );
                return Ok(());
            }
            return Err(LifecycleError::ScenarioAlreadyActive {
                active_user: active.user_id,
                active_group: active.group_id,
                active_scenario: active.scenario_id,
                user: user_id.to_string(),
                group: group_id.to_string(),
                scenario: scenario_id.to_string(),
            });
        }

        let scenario = ActiveScenario {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            scenario_id: scenario_id.to_string(),
        };
        let dir = self.layout.scenario_dir(group_id, scenario_id);

        let runtime = match self.provision(&scenario, &dir) {
            Ok(runtime) => runtime,
            Err(e) => {
                if let Err(cleanup) = remove_tree(&dir) {
                    warn!("Failed to clean up {:?} after failed start: {}", dir, cleanup);
                }
                metrics::record_lifecycle_event("start_scenario_failed");
                return Err(e);
            }
        };

        if runtime.index.is_empty() {
            warn!(
                "Scenario {} has no test cases, every request will be answered with NotFound",
                scenario
            );
        }
        info!(
            "Scenario {} started by user {} with {} test case(s)",
            scenario,
            user_id,
            runtime.index.len()
        );

        self.patterns.clear();
        let mut state = self.session.state.write();
        state.scenario = Some((scenario, Arc::new(runtime)));
        state.testcase = None;
        metrics::record_lifecycle_event("start_scenario");
        Ok(())
    }

    fn provision(&self, scenario: &ActiveScenario, dir: &Path) -> Result<ScenarioRuntime, LifecycleError> {
        let name = scenario.to_string();
        let io_error = |path: &Path, source: std::io::Error| LifecycleError::Io {
            scenario: name.clone(),
            path: path.to_path_buf(),
            source,
        };

        remove_tree(dir).map_err(|e| io_error(dir, e))?;
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let evidence_dir = self
            .layout
            .scenario_evidence_dir(&scenario.group_id, &scenario.scenario_id);
        remove_tree(&evidence_dir).map_err(|e| io_error(&evidence_dir, e))?;

        self.store
            .download_scenario_resource(
                dir,
                &scenario.group_id,
                &scenario.scenario_id,
                &self.options.stub_id,
            )
            .map_err(|source| LifecycleError::Store {
                scenario: name.clone(),
                source,
            })?;

        let index = ResourceIndex::build(dir).map_err(|source| LifecycleError::Index {
            scenario: name.clone(),
            source,
        })?;

        Ok(ScenarioRuntime {
            index,
            renderer: ResponseRenderer::new(
                self.options.default_message.clone(),
                self.options.cache_responses,
            ),
            evidence: EvidenceRecorder::new(evidence_dir),
        })
    }

    /// Abort the active scenario. Idle is not an error.
    pub fn cancel_scenario(&self) -> Result<(), LifecycleError> {
        let _guard = self.lifecycle.lock();
        match self.teardown("cancelled")? {
            Some(_) => metrics::record_lifecycle_event("cancel_scenario"),
            None => info!("Cancel requested with no active scenario"),
        }
        Ok(())
    }

    /// Finish the active scenario
    pub fn end_scenario(&self) -> Result<(), LifecycleError> {
        let _guard = self.lifecycle.lock();
        match self.teardown("ended")? {
            Some(_) => {
                metrics::record_lifecycle_event("end_scenario");
                Ok(())
            }
            None => Err(LifecycleError::NoActiveScenario),
        }
    }

    /// Clear session state and delete the scenario's resource and evidence
    /// trees. Caller holds the lifecycle lock.
    fn teardown(&self, verb: &str) -> Result<Option<ActiveScenario>, LifecycleError> {
        let (scenario, testcase) = {
            let mut state = self.session.state.write();
            let testcase = state.testcase.take();
            (state.scenario.take().map(|(scenario, _)| scenario), testcase)
        };
        let Some(scenario) = scenario else {
            return Ok(None);
        };

        if let Some(testcase) = testcase {
            warn!(
                "Scenario {} {} while test case {} was active, its evidence is not uploaded",
                scenario, verb, testcase
            );
        }
        self.patterns.clear();

        let dir = self
            .layout
            .scenario_dir(&scenario.group_id, &scenario.scenario_id);
        remove_tree(&dir).map_err(|source| LifecycleError::Io {
            scenario: scenario.to_string(),
            path: dir.clone(),
            source,
        })?;
        let evidence_dir = self
            .layout
            .scenario_evidence_dir(&scenario.group_id, &scenario.scenario_id);
        remove_tree(&evidence_dir).map_err(|source| LifecycleError::Io {
            scenario: scenario.to_string(),
            path: evidence_dir.clone(),
            source,
        })?;

        info!("Scenario {} {} (user {})", scenario, verb, scenario.user_id);
        Ok(Some(scenario))
    }

    /// Activate a test case of the running scenario
    pub fn start_testcase(&self, testcase_id: &str) -> Result<(), LifecycleError> {
        let _guard = self.lifecycle.lock();
        let mut state = self.session.state.write();

        let Some((scenario, runtime)) = state.scenario.as_ref() else {
            return Err(LifecycleError::NoActiveScenario);
        };
        if let Some(active) = &state.testcase {
            return Err(LifecycleError::TestCaseAlreadyActive {
                scenario: scenario.to_string(),
                active: active.clone(),
                testcase: testcase_id.to_string(),
            });
        }
        if !runtime.index.contains(testcase_id) {
            return Err(LifecycleError::UnknownTestCase {
                scenario: scenario.to_string(),
                testcase: testcase_id.to_string(),
            });
        }

        info!("Test case {} started in scenario {}", testcase_id, scenario);
        state.testcase = Some(testcase_id.to_string());
        metrics::record_lifecycle_event("start_testcase");
        Ok(())
    }

    /// Upload the running test case's evidence, if any was written, then
    /// deactivate it. A failed upload leaves the test case active so the
    /// call can be retried.
    pub fn end_testcase(&self) -> Result<(), LifecycleError> {
        let _guard = self.lifecycle.lock();

        let (scenario, runtime, testcase) = {
            let state = self.session.state.read();
            let Some((scenario, runtime)) = state.scenario.clone() else {
                return Err(LifecycleError::NoActiveScenario);
            };
            let Some(testcase) = state.testcase.clone() else {
                return Err(LifecycleError::NoActiveTestCase {
                    scenario: scenario.to_string(),
                });
            };
            (scenario, runtime, testcase)
        };

        let evidence_dir = runtime.evidence.testcase_dir(&testcase);
        if evidence_dir.is_dir() {
            self.upload_evidence(&scenario, &runtime, &testcase, &evidence_dir)?;
            info!(
                "Test case {} ended in scenario {}, evidence uploaded from {:?}",
                testcase, scenario, evidence_dir
            );
        } else {
            info!(
                "Test case {} ended in scenario {}, no evidence to upload",
                testcase, scenario
            );
        }

        self.session.state.write().testcase = None;
        metrics::record_lifecycle_event("end_testcase");
        Ok(())
    }

    fn upload_evidence(
        &self,
        scenario: &ActiveScenario,
        runtime: &ScenarioRuntime,
        testcase: &str,
        evidence_dir: &Path,
    ) -> Result<(), LifecycleError> {
        runtime
            .evidence
            .write_manifest(testcase)
            .map_err(|source| LifecycleError::Io {
                scenario: scenario.to_string(),
                path: evidence_dir.to_path_buf(),
                source,
            })?;
        self.store
            .upload_testcase_resource(
                evidence_dir,
                &scenario.group_id,
                &scenario.scenario_id,
                testcase,
                &self.options.stub_id,
            )
            .map_err(|source| {
                warn!(
                    "Evidence upload for test case {} in scenario {} failed, test case stays active",
                    testcase, scenario
                );
                LifecycleError::Store {
                    scenario: scenario.to_string(),
                    source,
                }
            })
    }
}

fn validate_identifier(kind: &'static str, value: &str) -> Result<(), LifecycleError> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(LifecycleError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

fn remove_tree(dir: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("scenario id", "login-flow_01").is_ok());
        assert!(validate_identifier("scenario id", "").is_err());
        assert!(validate_identifier("scenario id", "..").is_err());
        assert!(validate_identifier("scenario id", "a/b").is_err());
        assert!(validate_identifier("scenario id", "a\\b").is_err());
    }

    #[test]
    fn test_layout_paths() {
        let layout = ResourceLayout {
            resource_root: PathBuf::from("/work/resources"),
            evidence_root: PathBuf::from("/work/evidence"),
        };
        assert_eq!(
            layout.scenario_dir("grp", "scn"),
            PathBuf::from("/work/resources/grp/scn")
        );
        assert_eq!(
            layout.scenario_evidence_dir("grp", "scn"),
            PathBuf::from("/work/evidence/grp/scn")
        );
    }

    #[test]
    fn test_remove_missing_tree_is_ok() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(remove_tree(&dir.path().join("absent")).is_ok());
    }
}
