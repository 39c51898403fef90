//! The stub engine: lifecycle manager plus dispatcher behind one strategy.

use crate::channel::{RequestChannel, ResponseChannel};
use crate::config::{Config, DispatchStrategy};
use crate::dispatch::{DispatchErrorHook, DispatchOptions, DispatchOutcome, Dispatcher, PatternCache};
use crate::error::LifecycleError;
use crate::scenario::{ResourceLayout, ScenarioManager, ScenarioOptions, Session, SessionStatus};
use crate::scripting::{create_script_engine, ScriptEngine};
use crate::store::{create_resource_store, ResourceStore};
use std::io;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything the engine needs besides its collaborators
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub strategy: DispatchStrategy,
    pub scenario: ScenarioOptions,
    pub layout: ResourceLayout,
    pub dispatch: DispatchOptions,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let responses = &config.responses;
        Self {
            strategy: config.dispatch.strategy,
            scenario: ScenarioOptions {
                stub_id: config.stub_id.clone(),
                default_message: responses.default_message.clone(),
                cache_responses: responses.cache,
            },
            layout: ResourceLayout {
                resource_root: config.resources.root.clone(),
                evidence_root: config.resources.evidence_root.clone(),
            },
            dispatch: DispatchOptions {
                not_found_message: responses.not_found_message.clone(),
                terminator: responses.terminator.clone(),
                allow_repeat_requests: responses.allow_repeat_requests,
                save_requests: responses.save_requests,
            },
        }
    }
}

/// Scenario-scoped stub engine.
///
/// With [`DispatchStrategy::Serialized`] every request holds the lifecycle
/// lock for its whole dispatch, response delay included. With
/// [`DispatchStrategy::Concurrent`] requests run in parallel and only the
/// lifecycle transitions are exclusive.
pub struct StubEngine {
    strategy: DispatchStrategy,
    manager: ScenarioManager,
    dispatcher: Dispatcher,
}

impl StubEngine {
    pub fn new(
        settings: EngineSettings,
        store: Arc<dyn ResourceStore>,
        script_engine: Option<Arc<dyn ScriptEngine>>,
    ) -> Self {
        let session = Arc::new(Session::new());
        let patterns = Arc::new(PatternCache::new());
        let manager = ScenarioManager::new(
            settings.scenario,
            settings.layout,
            Arc::clone(&session),
            Arc::clone(&patterns),
            store,
        );
        let dispatcher = Dispatcher::new(session, patterns, script_engine, settings.dispatch);
        Self {
            strategy: settings.strategy,
            manager,
            dispatcher,
        }
    }

    /// Build the engine and its collaborators from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = create_resource_store(&config.resource_store)?;
        let script_engine = create_script_engine(&config.script_engine)?;
        let engine = Self::new(EngineSettings::from_config(config), store, script_engine);
        info!(
            "Stub engine '{}' ready (strategy={}, resources={:?}, evidence={:?})",
            config.stub_id,
            engine.strategy.as_str(),
            config.resources.root,
            config.resources.evidence_root
        );
        Ok(engine)
    }

    /// Observe per-request failures that are otherwise only logged
    pub fn with_error_hook(mut self, hook: DispatchErrorHook) -> Self {
        self.dispatcher.set_error_hook(hook);
        self
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    pub fn manager(&self) -> &ScenarioManager {
        &self.manager
    }

    pub fn start_scenario(
        &self,
        user_id: &str,
        group_id: &str,
        scenario_id: &str,
    ) -> Result<(), LifecycleError> {
        self.manager.start_scenario(user_id, group_id, scenario_id)
    }

    pub fn cancel_scenario(&self) -> Result<(), LifecycleError> {
        self.manager.cancel_scenario()
    }

    pub fn end_scenario(&self) -> Result<(), LifecycleError> {
        self.manager.end_scenario()
    }

    pub fn start_testcase(&self, testcase_id: &str) -> Result<(), LifecycleError> {
        self.manager.start_testcase(testcase_id)
    }

    pub fn end_testcase(&self) -> Result<(), LifecycleError> {
        self.manager.end_testcase()
    }

    /// Dispatch one request under the configured strategy
    pub fn handle(&self, request: &str, out: &mut dyn ResponseChannel) -> DispatchOutcome {
        match self.strategy {
            DispatchStrategy::Serialized => {
                let _guard = self.manager.lock();
                self.dispatcher.dispatch(request, out)
            }
            DispatchStrategy::Concurrent => self.dispatcher.dispatch(request, out),
        }
    }

    /// Read and dispatch requests until the request channel is exhausted.
    ///
    /// Returns the number of requests handled.
    pub fn serve<R, W>(&self, requests: &mut R, responses: &mut W) -> io::Result<u64>
    where
        R: RequestChannel,
        W: ResponseChannel,
    {
        let mut handled = 0;
        while let Some(request) = requests.read_request()? {
            let outcome = self.handle(&request, responses);
            debug!("Request {} handled: {}", handled + 1, outcome.label());
            handled += 1;
        }
        Ok(handled)
    }

    pub fn status(&self) -> SessionStatus {
        self.manager.session().status(self.strategy.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DelimitedReader;
    use crate::store::NoOpResourceStore;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn engine(root: &TempDir, strategy: DispatchStrategy) -> StubEngine {
        let mut config = Config::default();
        config.dispatch.strategy = strategy;
        config.resources.root = root.path().join("resources");
        config.resources.evidence_root = root.path().join("evidence");
        let settings = EngineSettings::from_config(&config);
        StubEngine::new(settings, Arc::new(NoOpResourceStore), None)
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.responses.terminator = Some("\r\n".to_string());
        config.responses.allow_repeat_requests = true;
        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.strategy, DispatchStrategy::Serialized);
        assert_eq!(settings.dispatch.terminator.as_deref(), Some("\r\n"));
        assert!(settings.dispatch.allow_repeat_requests);
        assert_eq!(settings.scenario.stub_id, "rift-line");
    }

    #[test]
    fn test_serve_counts_requests_until_eof() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root, DispatchStrategy::Serialized);

        let mut requests = DelimitedReader::new(Cursor::new(b"A\nB\nC".to_vec()), "\n");
        let mut responses = Vec::new();
        let handled = engine.serve(&mut requests, &mut responses).unwrap();
        assert_eq!(handled, 3);
        assert_eq!(
            String::from_utf8(responses).unwrap(),
            crate::dispatch::NO_SCENARIO_MESSAGE.repeat(3)
        );
    }

    #[test]
    fn test_status_reports_strategy_and_testcases() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root, DispatchStrategy::Concurrent);

        let status = engine.status();
        assert_eq!(status.strategy, "concurrent");
        assert!(status.testcases.is_empty());

        let err = engine.start_testcase("TC1").unwrap_err();
        assert!(matches!(err, LifecycleError::NoActiveScenario));

        fs::create_dir_all(root.path().join("resources")).unwrap();
        engine.start_scenario("u", "g", "s").unwrap();
        assert!(engine.status().testcases.is_empty());
        engine.end_scenario().unwrap();
    }
}
