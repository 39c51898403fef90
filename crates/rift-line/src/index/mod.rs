//! Resource index: test case → ordered pattern → response sequence.
//!
//! A scenario directory holds one subdirectory per test case. Every file in a
//! test case directory is a response resource whose first line is the regex
//! pattern it answers. Files are visited in filename order and grouped under
//! their pattern in first-seen order, which is also the match precedence.

mod response_list;

pub use response_list::ResponseList;

use crate::error::IndexError;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A pattern and the responses that serve it
#[derive(Debug)]
pub struct PatternEntry {
    pub pattern: String,
    pub responses: ResponseList,
}

/// All patterns of one test case, in declaration order
#[derive(Debug)]
pub struct TestCaseIndex {
    id: String,
    dir: PathBuf,
    entries: Vec<PatternEntry>,
}

impl TestCaseIndex {
    /// Index a single test case directory
    pub fn load(id: impl Into<String>, dir: &Path) -> Result<Self, IndexError> {
        let id = id.into();
        let mut entries: Vec<PatternEntry> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for file in list_resource_files(dir)? {
            let pattern = read_pattern_line(&file)?;
            match positions.get(&pattern) {
                Some(&pos) => entries[pos].responses.push(file),
                None => {
                    positions.insert(pattern.clone(), entries.len());
                    entries.push(PatternEntry {
                        pattern,
                        responses: ResponseList::new(vec![file]),
                    });
                }
            }
        }

        debug!(
            "Indexed test case {} with {} pattern(s) from {:?}",
            id,
            entries.len(),
            dir
        );

        Ok(Self {
            id,
            dir: dir.to_path_buf(),
            entries,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pattern entries in match precedence order
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn get(&self, pattern: &str) -> Option<&PatternEntry> {
        self.entries.iter().find(|entry| entry.pattern == pattern)
    }
}

/// Per-scenario index of every test case
#[derive(Debug, Default)]
pub struct ResourceIndex {
    testcases: HashMap<String, TestCaseIndex>,
}

impl ResourceIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index from a scenario root. Each immediate subdirectory is a
    /// test case; plain files and hidden entries at the root are ignored.
    pub fn build(root: &Path) -> Result<Self, IndexError> {
        let mut testcases = HashMap::new();

        let entries = fs::read_dir(root).map_err(|e| IndexError::Io(root.to_path_buf(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| IndexError::Io(root.to_path_buf(), e))?;
            let path = entry.path();
            let id = entry.file_name().to_string_lossy().into_owned();
            if id.starts_with('.') || !path.is_dir() {
                debug!("Ignoring {:?}: not a test case directory", path);
                continue;
            }
            let testcase = TestCaseIndex::load(id.clone(), &path)?;
            testcases.insert(id, testcase);
        }

        Ok(Self { testcases })
    }

    pub fn testcase(&self, id: &str) -> Option<&TestCaseIndex> {
        self.testcases.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.testcases.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.testcases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.testcases.len()
    }

    /// Test case ids, sorted
    pub fn testcase_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.testcases.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Regular files of a test case directory sorted by filename, dotfiles skipped
pub fn list_resource_files(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| IndexError::Io(dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| IndexError::Io(dir.to_path_buf(), e))?;
        let path = entry.path();
        if !path.is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(path);
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read the pattern line of a resource file without loading the rest
pub fn read_pattern_line(file: &Path) -> Result<String, IndexError> {
    let handle = fs::File::open(file).map_err(|e| IndexError::Io(file.to_path_buf(), e))?;
    let mut line = String::new();
    let read = BufReader::new(handle)
        .read_line(&mut line)
        .map_err(|e| IndexError::Io(file.to_path_buf(), e))?;
    if read == 0 {
        return Err(IndexError::MissingPattern(file.to_path_buf()));
    }
    Ok(strip_line_ending(line.trim_start_matches('\u{feff}')).to_string())
}

pub(crate) fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn file_names(list: &ResponseList) -> Vec<String> {
        list.files()
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_files_grouped_by_pattern_in_filename_order() {
        let root = TempDir::new().unwrap();
        let tc = root.path().join("TC1");
        write(&tc, "002", "PING\nPONG2\n");
        write(&tc, "001", "PING\nPONG1\n");
        write(&tc, "003", "STATUS\nUP\n");

        let index = ResourceIndex::build(root.path()).unwrap();
        let testcase = index.testcase("TC1").unwrap();
        let entry = testcase.get("PING").unwrap();
        assert_eq!(file_names(&entry.responses), vec!["001", "002"]);
        assert_eq!(file_names(&testcase.get("STATUS").unwrap().responses), vec!["003"]);
    }

    #[test]
    fn test_patterns_keep_first_seen_order() {
        let root = TempDir::new().unwrap();
        let tc = root.path().join("TC1");
        write(&tc, "a", "zzz\nlast-alphabetically-first-seen\n");
        write(&tc, "b", "aaa\nsecond\n");
        write(&tc, "c", "zzz\nagain\n");
        write(&tc, "d", "mmm\nthird\n");

        let index = ResourceIndex::build(root.path()).unwrap();
        let patterns: Vec<&str> = index
            .testcase("TC1")
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["zzz", "aaa", "mmm"]);
    }

    #[test]
    fn test_missing_pattern_line_is_fatal() {
        let root = TempDir::new().unwrap();
        write(&root.path().join("TC1"), "001", "");

        let err = ResourceIndex::build(root.path()).unwrap_err();
        assert!(matches!(err, IndexError::MissingPattern(_)));
    }

    #[test]
    fn test_blank_first_line_is_match_any_pattern() {
        let root = TempDir::new().unwrap();
        write(&root.path().join("TC1"), "001", "\r\nhello\r\n");

        let index = ResourceIndex::build(root.path()).unwrap();
        assert!(index.testcase("TC1").unwrap().get("").is_some());
    }

    #[test]
    fn test_root_files_and_dotfiles_ignored() {
        let root = TempDir::new().unwrap();
        write(root.path(), "README", "not a test case\n");
        write(&root.path().join("TC1"), ".DS_Store", "");
        write(&root.path().join("TC1"), "001", "PING\nPONG\n");
        fs::create_dir_all(root.path().join("TC2")).unwrap();

        let index = ResourceIndex::build(root.path()).unwrap();
        assert_eq!(index.testcase_ids(), vec!["TC1", "TC2"]);
        assert_eq!(index.testcase("TC1").unwrap().entries().len(), 1);
        assert!(index.testcase("TC2").unwrap().entries().is_empty());
    }

    #[test]
    fn test_hidden_directories_are_not_test_cases() {
        let root = TempDir::new().unwrap();
        write(&root.path().join("TC1"), "001", "PING\nPONG\n");
        write(&root.path().join(".meta"), "lock", "");
        write(&root.path().join(".git"), "HEAD", "");

        let index = ResourceIndex::build(root.path()).unwrap();
        assert_eq!(index.testcase_ids(), vec!["TC1"]);
        assert!(!index.contains(".meta"));
    }

    #[test]
    fn test_empty_root_builds_empty_index() {
        let root = TempDir::new().unwrap();
        let index = ResourceIndex::build(root.path()).unwrap();
        assert!(index.is_empty());
        assert!(!index.contains("TC1"));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let root = TempDir::new().unwrap();
        let err = ResourceIndex::build(&root.path().join("absent")).unwrap_err();
        assert!(matches!(err, IndexError::Io(_, _)));
    }
}
