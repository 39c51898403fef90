//! Evidence captured while a scenario runs.
//!
//! Every served response is recorded in the bucket of the pattern that
//! matched it; unmatched requests go to a reserved NotFound bucket. When
//! request saving is on, the request text is also written next to the other
//! artifacts of the test case so it can be uploaded when the test case ends.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the manifest written before upload
pub const MANIFEST_FILE: &str = "evidence.json";
const REQUEST_SUFFIX: &str = ".req";
const NOT_FOUND_PREFIX: &str = "NOT_FOUND_";

/// One captured request/response reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceEntry {
    /// Response resource served (file name), absent for NotFound entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_file: Option<String>,
    /// Saved request artifact (file name in the evidence directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_file: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// Append-only evidence for one pattern
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceBucket {
    pub pattern: String,
    pub entries: Vec<EvidenceEntry>,
}

#[derive(Debug, Default)]
struct TestCaseEvidence {
    // Buckets in order of first capture
    buckets: Vec<EvidenceBucket>,
    not_found: Vec<EvidenceEntry>,
    not_found_count: u32,
}

impl TestCaseEvidence {
    fn bucket_mut(&mut self, pattern: &str) -> &mut EvidenceBucket {
        let pos = match self.buckets.iter().position(|b| b.pattern == pattern) {
            Some(pos) => pos,
            None => {
                self.buckets.push(EvidenceBucket {
                    pattern: pattern.to_string(),
                    entries: Vec::new(),
                });
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[pos]
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    testcase: &'a str,
    generated_at: DateTime<Utc>,
    patterns: &'a [EvidenceBucket],
    not_found: &'a [EvidenceEntry],
}

/// Evidence of one scenario, partitioned by test case
pub struct EvidenceRecorder {
    root: PathBuf,
    testcases: RwLock<HashMap<String, TestCaseEvidence>>,
}

impl EvidenceRecorder {
    /// `root` is the scenario's evidence directory; each test case gets a subdirectory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            testcases: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn testcase_dir(&self, testcase: &str) -> PathBuf {
        self.root.join(testcase)
    }

    /// Record a served response, saving `request` as `<response file>.req` when given
    pub fn record_response(
        &self,
        testcase: &str,
        pattern: &str,
        response_file: &Path,
        request: Option<&str>,
    ) -> io::Result<EvidenceEntry> {
        let response_name = response_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let request_file = match request {
            Some(text) => {
                let name = format!("{response_name}{REQUEST_SUFFIX}");
                self.write_artifact(testcase, &name, text)?;
                Some(name)
            }
            None => None,
        };

        let entry = EvidenceEntry {
            response_file: Some(response_name),
            request_file,
            captured_at: Utc::now(),
        };
        self.testcases
            .write()
            .entry(testcase.to_string())
            .or_default()
            .bucket_mut(pattern)
            .entries
            .push(entry.clone());
        Ok(entry)
    }

    /// Record an unmatched request, saving it as `NOT_FOUND_<n>.txt` when given
    pub fn record_not_found(
        &self,
        testcase: &str,
        request: Option<&str>,
    ) -> io::Result<EvidenceEntry> {
        let sequence = {
            let mut testcases = self.testcases.write();
            let evidence = testcases.entry(testcase.to_string()).or_default();
            evidence.not_found_count += 1;
            evidence.not_found_count
        };

        let request_file = match request {
            Some(text) => {
                let name = format!("{NOT_FOUND_PREFIX}{sequence}.txt");
                self.write_artifact(testcase, &name, text)?;
                Some(name)
            }
            None => None,
        };

        let entry = EvidenceEntry {
            response_file: None,
            request_file,
            captured_at: Utc::now(),
        };
        self.testcases
            .write()
            .entry(testcase.to_string())
            .or_default()
            .not_found
            .push(entry.clone());
        Ok(entry)
    }

    fn write_artifact(&self, testcase: &str, name: &str, content: &str) -> io::Result<()> {
        let dir = self.testcase_dir(testcase);
        fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        fs::write(&path, content)?;
        debug!("Saved evidence artifact {:?}", path);
        Ok(())
    }

    /// Entries captured for a pattern
    pub fn bucket(&self, testcase: &str, pattern: &str) -> Vec<EvidenceEntry> {
        self.testcases
            .read()
            .get(testcase)
            .and_then(|e| e.buckets.iter().find(|b| b.pattern == pattern))
            .map(|b| b.entries.clone())
            .unwrap_or_default()
    }

    /// Entries of the reserved NotFound bucket
    pub fn not_found(&self, testcase: &str) -> Vec<EvidenceEntry> {
        self.testcases
            .read()
            .get(testcase)
            .map(|e| e.not_found.clone())
            .unwrap_or_default()
    }

    /// Total number of entries over every bucket of every test case
    pub fn len(&self) -> usize {
        self.testcases
            .read()
            .values()
            .map(|e| e.not_found.len() + e.buckets.iter().map(|b| b.entries.len()).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `evidence.json` into the test case directory if the directory
    /// exists. Returns the manifest path when written.
    pub fn write_manifest(&self, testcase: &str) -> io::Result<Option<PathBuf>> {
        let dir = self.testcase_dir(testcase);
        if !dir.is_dir() {
            return Ok(None);
        }

        let testcases = self.testcases.read();
        let evidence = testcases.get(testcase);
        let manifest = Manifest {
            testcase,
            generated_at: Utc::now(),
            patterns: evidence.map(|e| e.buckets.as_slice()).unwrap_or_default(),
            not_found: evidence.map(|e| e.not_found.as_slice()).unwrap_or_default(),
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, json)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_response_saves_request() {
        let root = TempDir::new().unwrap();
        let recorder = EvidenceRecorder::new(root.path());

        let entry = recorder
            .record_response("TC1", "PING", Path::new("/res/TC1/001"), Some("PING"))
            .unwrap();
        assert_eq!(entry.response_file.as_deref(), Some("001"));
        assert_eq!(entry.request_file.as_deref(), Some("001.req"));

        let saved = fs::read_to_string(root.path().join("TC1").join("001.req")).unwrap();
        assert_eq!(saved, "PING");
        assert_eq!(recorder.bucket("TC1", "PING").len(), 1);
    }

    #[test]
    fn test_record_response_without_request_writes_nothing() {
        let root = TempDir::new().unwrap();
        let recorder = EvidenceRecorder::new(root.path());

        let entry = recorder
            .record_response("TC1", "PING", Path::new("/res/TC1/001"), None)
            .unwrap();
        assert_eq!(entry.request_file, None);
        assert!(!root.path().join("TC1").exists());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_not_found_numbering_is_per_testcase() {
        let root = TempDir::new().unwrap();
        let recorder = EvidenceRecorder::new(root.path());

        recorder.record_not_found("TC1", Some("a")).unwrap();
        recorder.record_not_found("TC1", Some("b")).unwrap();
        let other = recorder.record_not_found("TC2", Some("c")).unwrap();

        assert_eq!(other.request_file.as_deref(), Some("NOT_FOUND_1.txt"));
        assert_eq!(
            fs::read_to_string(root.path().join("TC1").join("NOT_FOUND_2.txt")).unwrap(),
            "b"
        );
        assert_eq!(recorder.not_found("TC1").len(), 2);
        assert_eq!(recorder.not_found("TC2").len(), 1);
    }

    #[test]
    fn test_buckets_are_append_only_and_ordered() {
        let root = TempDir::new().unwrap();
        let recorder = EvidenceRecorder::new(root.path());

        recorder
            .record_response("TC1", "PING", Path::new("001"), None)
            .unwrap();
        recorder
            .record_response("TC1", "PING", Path::new("002"), None)
            .unwrap();

        let files: Vec<_> = recorder
            .bucket("TC1", "PING")
            .into_iter()
            .map(|e| e.response_file.unwrap())
            .collect();
        assert_eq!(files, vec!["001", "002"]);
        assert!(recorder.bucket("TC1", "OTHER").is_empty());
    }

    #[test]
    fn test_manifest_only_written_when_dir_exists() {
        let root = TempDir::new().unwrap();
        let recorder = EvidenceRecorder::new(root.path());

        recorder
            .record_response("TC1", "PING", Path::new("001"), None)
            .unwrap();
        assert_eq!(recorder.write_manifest("TC1").unwrap(), None);

        recorder.record_not_found("TC1", Some("PONG?")).unwrap();
        let path = recorder.write_manifest("TC1").unwrap().unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(manifest["testcase"], "TC1");
        assert_eq!(manifest["patterns"][0]["pattern"], "PING");
        assert_eq!(manifest["patterns"][0]["entries"][0]["responseFile"], "001");
        assert_eq!(manifest["notFound"][0]["requestFile"], "NOT_FOUND_1.txt");
    }
}
