//! Resource tree linting for Rift Line stubs.
//!
//! Checks response files the way the stub engine will read them: the pattern
//! line, `sleep` directives, script blocks and the order in which patterns
//! are tried. Usable as a library or through the `rift-line-lint` CLI.
//!
//! # Example
//!
//! ```no_run
//! use rift_line_lint::{lint_path, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_path(Path::new("./resources/payments/happy-path"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;

use rift_line::index::list_resource_files;
use std::path::{Path, PathBuf};

pub use types::{LintIssue, LintOptions, LintResult, Severity};
pub use validator::{is_match_any, validate_resource, validate_testcase_patterns};

/// Lint a single response file.
pub fn lint_resource_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    lint_file_into(path, options, &mut result);
    result
}

fn lint_file_into(path: &Path, options: &LintOptions, result: &mut LintResult) -> Option<String> {
    result.files_checked += 1;
    match std::fs::read_to_string(path) {
        Ok(content) => validate_resource(path, &content, result, options),
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path.to_path_buf(),
            ));
            None
        }
    }
}

/// Lint one test case directory: every response file plus pattern ordering.
pub fn lint_testcase_dir(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let files = match list_resource_files(path) {
        Ok(files) => files,
        Err(e) => {
            result.add_issue(LintIssue::error("E001", e.to_string(), path.to_path_buf()));
            return result;
        }
    };

    let mut patterns: Vec<(String, Vec<PathBuf>)> = Vec::new();
    for file in files {
        let Some(pattern) = lint_file_into(&file, options, &mut result) else {
            continue;
        };
        match patterns.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, group)) => group.push(file),
            None => patterns.push((pattern, vec![file])),
        }
    }

    validate_testcase_patterns(&patterns, &mut result);
    result
}

/// Lint a scenario directory: each subdirectory is a test case.
pub fn lint_scenario_dir(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    let mut children: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .collect();
    children.sort();

    for child in children {
        if child.is_dir() {
            result.merge(lint_testcase_dir(&child, options));
        } else {
            result.add_issue(
                LintIssue::warning(
                    "W003",
                    "File is outside any test case directory and is never served",
                    child,
                )
                .with_suggestion("Move it into a test case directory"),
            );
        }
    }

    result
}

/// Lint a scenario directory, a test case directory or a single file.
///
/// A directory with subdirectories is treated as a scenario.
pub fn lint_path(path: &Path, options: &LintOptions) -> LintResult {
    if path.is_file() {
        return lint_resource_file(path, options);
    }
    if is_scenario_dir(path) {
        lint_scenario_dir(path, options)
    } else {
        lint_testcase_dir(path, options)
    }
}

fn is_scenario_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|entries| entries.flatten().any(|entry| entry.path().is_dir()))
        .unwrap_or(false)
}
