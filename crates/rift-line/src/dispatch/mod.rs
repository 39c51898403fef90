//! Request matching and response production.
//!
//! The dispatcher runs on the caller's thread and writes straight to the
//! response channel. Per-request failures never escape: they are logged,
//! counted and reported to the optional error hook, and nothing is written
//! for that request.

mod patterns;

pub use patterns::{compile_full_match, PatternCache};

use crate::channel::ResponseChannel;
use crate::error::DispatchError;
use crate::index::PatternEntry;
use crate::metrics;
use crate::scenario::{Inactive, ScenarioRuntime, Session, SessionSnapshot};
use crate::scripting::{ScriptEngine, ScriptVariables};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Payload written when a request arrives with no scenario running
pub const NO_SCENARIO_MESSAGE: &str = "RIFT_LINE: no active scenario";
/// Payload written when a scenario runs but no test case is active
pub const NO_TESTCASE_MESSAGE: &str = "RIFT_LINE: no active test case";

/// Response behaviour knobs
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub not_found_message: String,
    pub terminator: Option<String>,
    pub allow_repeat_requests: bool,
    pub save_requests: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            not_found_message: "NOT_FOUND".to_string(),
            terminator: None,
            allow_repeat_requests: false,
            save_requests: true,
        }
    }
}

/// What happened to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A pattern matched and its response file was served
    Responded { pattern: String, file: PathBuf },
    /// The NotFound message was served
    NotFound,
    /// Diagnostic payload written, no scenario running
    NoScenario,
    /// Diagnostic payload written, no test case active
    NoTestCase,
    /// Producing or writing the response failed; nothing (or a partial write) was sent
    Failed,
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Responded { .. } => "matched",
            DispatchOutcome::NotFound => "not_found",
            DispatchOutcome::NoScenario => "no_scenario",
            DispatchOutcome::NoTestCase => "no_testcase",
            DispatchOutcome::Failed => "failed",
        }
    }
}

/// Context handed to the error hook for a swallowed failure
#[derive(Debug)]
pub struct DispatchFailure<'a> {
    pub request: &'a str,
    pub testcase: &'a str,
    pub file: Option<&'a Path>,
    pub error: &'a DispatchError,
}

/// Observer for swallowed dispatch failures
pub type DispatchErrorHook = Arc<dyn Fn(&DispatchFailure<'_>) + Send + Sync>;

pub struct Dispatcher {
    session: Arc<Session>,
    patterns: Arc<PatternCache>,
    script_engine: Option<Arc<dyn ScriptEngine>>,
    options: DispatchOptions,
    error_hook: Option<DispatchErrorHook>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<Session>,
        patterns: Arc<PatternCache>,
        script_engine: Option<Arc<dyn ScriptEngine>>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            session,
            patterns,
            script_engine,
            options,
            error_hook: None,
        }
    }

    pub fn set_error_hook(&mut self, hook: DispatchErrorHook) {
        self.error_hook = Some(hook);
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Match `request` against the active test case and write the response
    pub fn dispatch(&self, request: &str, out: &mut dyn ResponseChannel) -> DispatchOutcome {
        let outcome = match self.session.snapshot() {
            Ok(snapshot) => self.dispatch_active(&snapshot, request, out),
            Err(Inactive::Scenario) => {
                debug!("Request received with no active scenario");
                self.write_diagnostic(NO_SCENARIO_MESSAGE, out);
                DispatchOutcome::NoScenario
            }
            Err(Inactive::TestCase) => {
                debug!("Request received with no active test case");
                self.write_diagnostic(NO_TESTCASE_MESSAGE, out);
                DispatchOutcome::NoTestCase
            }
        };
        metrics::record_request(outcome.label());
        outcome
    }

    fn dispatch_active(
        &self,
        snapshot: &SessionSnapshot,
        request: &str,
        out: &mut dyn ResponseChannel,
    ) -> DispatchOutcome {
        let runtime = &snapshot.runtime;
        let testcase = snapshot.testcase.as_str();

        let Some(index) = runtime.index.testcase(testcase) else {
            warn!(
                "Test case {} has no resources in scenario {}",
                testcase, snapshot.scenario
            );
            return self.not_found(runtime, testcase, "", out);
        };

        let Some(entry) = self.first_match(index.entries(), request) else {
            debug!("No pattern of test case {} matches request", testcase);
            return self.not_found(runtime, testcase, request, out);
        };

        let Some(file) = entry.responses.next(self.options.allow_repeat_requests) else {
            debug!(
                "Responses for pattern '{}' exhausted after {} request(s)",
                entry.pattern,
                entry.responses.request_count()
            );
            return self.not_found(runtime, testcase, request, out);
        };

        debug!("Pattern '{}' matched, serving {:?}", entry.pattern, file);
        match self.respond(runtime, testcase, &entry.pattern, file, request, out) {
            Ok(()) => DispatchOutcome::Responded {
                pattern: entry.pattern.clone(),
                file: file.to_path_buf(),
            },
            Err(e) => {
                self.report_failure(request, testcase, Some(file), &e);
                DispatchOutcome::Failed
            }
        }
    }

    fn first_match<'a>(&self, entries: &'a [PatternEntry], request: &str) -> Option<&'a PatternEntry> {
        entries
            .iter()
            .find(|entry| self.patterns.full_match(&entry.pattern, request))
    }

    fn respond(
        &self,
        runtime: &ScenarioRuntime,
        testcase: &str,
        pattern: &str,
        file: &Path,
        request: &str,
        out: &mut dyn ResponseChannel,
    ) -> Result<(), DispatchError> {
        let saved = self.options.save_requests.then_some(request);
        runtime
            .evidence
            .record_response(testcase, pattern, file, saved)
            .map_err(DispatchError::Evidence)?;

        let data = runtime.renderer.read(file)?;

        if data.sleep_millis > 0 {
            std::thread::sleep(Duration::from_millis(data.sleep_millis));
            metrics::record_response_delay(data.sleep_millis);
        }

        let message = match (&data.script, &self.script_engine) {
            (Some(script), Some(engine)) => {
                let variables = ScriptVariables {
                    request,
                    response_message: &data.message,
                };
                let start = Instant::now();
                let result = engine.evaluate(script, &variables);
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                match result {
                    Ok(payload) => {
                        metrics::record_script_evaluation(elapsed, "success");
                        payload
                    }
                    Err(source) => {
                        metrics::record_script_evaluation(elapsed, "error");
                        return Err(DispatchError::Script {
                            file: file.to_path_buf(),
                            source,
                        });
                    }
                }
            }
            (Some(_), None) => {
                debug!("Script in {:?} ignored, no script engine configured", file);
                data.message.clone()
            }
            (None, _) => data.message.clone(),
        };

        out.write_response(self.with_terminator(&message).as_bytes())
            .map_err(DispatchError::Write)
    }

    fn not_found(
        &self,
        runtime: &ScenarioRuntime,
        testcase: &str,
        request: &str,
        out: &mut dyn ResponseChannel,
    ) -> DispatchOutcome {
        let payload = self.with_terminator(&self.options.not_found_message);
        if let Err(e) = out.write_response(payload.as_bytes()) {
            self.report_failure(request, testcase, None, &DispatchError::Write(e));
            return DispatchOutcome::Failed;
        }

        let saved = self.options.save_requests.then_some(request);
        if let Err(e) = runtime.evidence.record_not_found(testcase, saved) {
            error!(
                "Failed to record NotFound evidence for test case {}: {}",
                testcase, e
            );
        }
        DispatchOutcome::NotFound
    }

    fn write_diagnostic(&self, message: &str, out: &mut dyn ResponseChannel) {
        if let Err(e) = out.write_response(self.with_terminator(message).as_bytes()) {
            debug!("Failed to write diagnostic payload: {}", e);
        }
    }

    fn with_terminator(&self, message: &str) -> String {
        match &self.options.terminator {
            Some(terminator) => format!("{message}{terminator}"),
            None => message.to_string(),
        }
    }

    fn report_failure(&self, request: &str, testcase: &str, file: Option<&Path>, error: &DispatchError) {
        error!(
            "Failed to respond to request in test case {} ({:?}): {}",
            testcase, file, error
        );
        metrics::record_render_failure();
        if let Some(hook) = &self.error_hook {
            hook(&DispatchFailure {
                request,
                testcase,
                file,
                error,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceRecorder;
    use crate::index::ResourceIndex;
    use crate::render::ResponseRenderer;
    use crate::scenario::ActiveScenario;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        session: Arc<Session>,
        evidence_root: PathBuf,
    }

    fn fixture(files: &[(&str, &str)], testcase: Option<&str>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let resources = dir.path().join("resources");
        for (path, content) in files {
            let path = resources.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        fs::create_dir_all(&resources).unwrap();
        let evidence_root = dir.path().join("evidence");

        let session = Arc::new(Session::new());
        {
            let mut state = session.state.write();
            state.scenario = Some((
                ActiveScenario {
                    user_id: "u".to_string(),
                    group_id: "g".to_string(),
                    scenario_id: "s".to_string(),
                },
                Arc::new(ScenarioRuntime {
                    index: ResourceIndex::build(&resources).unwrap(),
                    renderer: ResponseRenderer::new("", true),
                    evidence: EvidenceRecorder::new(&evidence_root),
                }),
            ));
            state.testcase = testcase.map(str::to_string);
        }
        Fixture {
            _dir: dir,
            session,
            evidence_root,
        }
    }

    fn dispatcher(session: &Arc<Session>, options: DispatchOptions) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(session),
            Arc::new(PatternCache::new()),
            None,
            options,
        )
    }

    fn send(dispatcher: &Dispatcher, request: &str) -> (DispatchOutcome, String) {
        let mut out = Vec::new();
        let outcome = dispatcher.dispatch(request, &mut out);
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_no_scenario_diagnostic() {
        let session = Arc::new(Session::new());
        let dispatcher = dispatcher(&session, DispatchOptions::default());
        let (outcome, payload) = send(&dispatcher, "PING");
        assert_eq!(outcome, DispatchOutcome::NoScenario);
        assert_eq!(payload, NO_SCENARIO_MESSAGE);
    }

    #[test]
    fn test_no_testcase_diagnostic_with_terminator() {
        let fx = fixture(&[("TC1/001", "PING\nPONG")], None);
        let dispatcher = dispatcher(
            &fx.session,
            DispatchOptions {
                terminator: Some("\r\n".to_string()),
                ..Default::default()
            },
        );
        let (outcome, payload) = send(&dispatcher, "PING");
        assert_eq!(outcome, DispatchOutcome::NoTestCase);
        assert_eq!(payload, format!("{NO_TESTCASE_MESSAGE}\r\n"));
    }

    #[test]
    fn test_first_match_wins() {
        let fx = fixture(&[("TC1/001", "a.*\nWIDE"), ("TC1/002", "abc\nEXACT")], Some("TC1"));
        let dispatcher = dispatcher(&fx.session, DispatchOptions::default());
        let (outcome, payload) = send(&dispatcher, "abc");
        assert_eq!(payload, "WIDE");
        assert!(matches!(outcome, DispatchOutcome::Responded { pattern, .. } if pattern == "a.*"));
    }

    #[test]
    fn test_unknown_testcase_is_not_found_with_empty_request() {
        let fx = fixture(&[("TC1/001", "PING\nPONG")], Some("TC9"));
        let dispatcher = dispatcher(&fx.session, DispatchOptions::default());
        let (outcome, payload) = send(&dispatcher, "PING");
        assert_eq!(outcome, DispatchOutcome::NotFound);
        assert_eq!(payload, "NOT_FOUND");

        let saved = fs::read_to_string(fx.evidence_root.join("TC9").join("NOT_FOUND_1.txt")).unwrap();
        assert_eq!(saved, "");
    }

    #[test]
    fn test_exhausted_list_saves_request_as_not_found() {
        let fx = fixture(&[("TC1/001", "PING\nPONG")], Some("TC1"));
        let dispatcher = dispatcher(&fx.session, DispatchOptions::default());
        assert_eq!(send(&dispatcher, "PING").1, "PONG");

        let (outcome, payload) = send(&dispatcher, "PING");
        assert_eq!(outcome, DispatchOutcome::NotFound);
        assert_eq!(payload, "NOT_FOUND");
        let saved = fs::read_to_string(fx.evidence_root.join("TC1").join("NOT_FOUND_1.txt")).unwrap();
        assert_eq!(saved, "PING");
        assert!(fx.evidence_root.join("TC1").join("001.req").is_file());
    }

    #[test]
    fn test_save_requests_disabled_writes_no_artifacts() {
        let fx = fixture(&[("TC1/001", "PING\nPONG")], Some("TC1"));
        let dispatcher = dispatcher(
            &fx.session,
            DispatchOptions {
                save_requests: false,
                ..Default::default()
            },
        );
        send(&dispatcher, "PING");
        send(&dispatcher, "NOPE");
        assert!(!fx.evidence_root.join("TC1").exists());

        let runtime = fx.session.runtime().unwrap();
        assert_eq!(runtime.evidence.bucket("TC1", "PING").len(), 1);
        assert_eq!(runtime.evidence.not_found("TC1").len(), 1);
    }

    #[test]
    fn test_render_failure_is_swallowed_and_reported() {
        let fx = fixture(&[("TC1/001", "PING\nsleep soon\nPONG")], Some("TC1"));
        let mut dispatcher = dispatcher(&fx.session, DispatchOptions::default());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.set_error_hook(Arc::new(move |failure: &DispatchFailure<'_>| {
            sink.lock().push(failure.error.to_string());
        }));

        let (outcome, payload) = send(&dispatcher, "PING");
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(payload.is_empty());
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("Invalid sleep value"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_swallowed_failure_is_logged() {
        let fx = fixture(&[("TC1/001", "PING\ninterpreter:start\nx\n")], Some("TC1"));
        let dispatcher = dispatcher(&fx.session, DispatchOptions::default());

        let (outcome, payload) = send(&dispatcher, "PING");
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(payload.is_empty());
        assert!(logs_contain("Failed to respond to request in test case TC1"));
        assert!(logs_contain("never closed"));
    }

    #[test]
    fn test_script_without_engine_serves_raw_message() {
        let fx = fixture(
            &[("TC1/001", "\ninterpreter:start\nresponseMessage.to_upper()\ninterpreter:end\nhello")],
            Some("TC1"),
        );
        let dispatcher = dispatcher(&fx.session, DispatchOptions::default());
        assert_eq!(send(&dispatcher, "anything").1, "hello");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DispatchOutcome::NotFound.label(), "not_found");
        assert_eq!(DispatchOutcome::Failed.label(), "failed");
        let responded = DispatchOutcome::Responded {
            pattern: "P".to_string(),
            file: PathBuf::from("001"),
        };
        assert_eq!(responded.label(), "matched");
    }
}
