//! Core validation logic for response resource files.

use crate::types::{LintIssue, LintOptions, LintResult};
use rift_line::dispatch::compile_full_match;
use rift_line::error::RenderError;
use rift_line::render::parse_response;
use rift_line::scripting::RhaiScriptEngine;
use std::path::{Path, PathBuf};

/// Patterns that match every request
const MATCH_ANY: &[&str] = &["", ".*", "(?s).*", ".*?", "(?s).*?", "[\\s\\S]*"];

/// Validate the content of one response file.
///
/// Returns the file's pattern when it has one, for test case level checks.
pub fn validate_resource(
    file: &Path,
    content: &str,
    result: &mut LintResult,
    options: &LintOptions,
) -> Option<String> {
    let Some(first_line) = content.lines().next() else {
        result.add_issue(
            LintIssue::error("E002", "File has no pattern line", file.to_path_buf())
                .with_location("line 1")
                .with_suggestion("Put the request pattern on the first line, or leave it blank to match any request"),
        );
        return None;
    };
    let pattern = first_line
        .trim_start_matches('\u{feff}')
        .trim_end_matches('\r')
        .to_string();

    validate_pattern(file, &pattern, result);
    validate_body(file, content, result, options);
    Some(pattern)
}

fn validate_pattern(file: &Path, pattern: &str, result: &mut LintResult) {
    if let Err(e) = compile_full_match(pattern) {
        result.add_issue(
            LintIssue::error(
                "E003",
                format!("Invalid regex pattern '{pattern}': {e}"),
                file.to_path_buf(),
            )
            .with_location("line 1")
            .with_suggestion("The stub ignores this file's pattern and never serves it"),
        );
    }
}

fn validate_body(file: &Path, content: &str, result: &mut LintResult, options: &LintOptions) {
    let data = match parse_response(content, "") {
        Ok(data) => data,
        Err(RenderError::InvalidSleep { value, line }) => {
            result.add_issue(
                LintIssue::error(
                    "E004",
                    format!("Invalid sleep value '{value}'"),
                    file.to_path_buf(),
                )
                .with_location(format!("line {line}"))
                .with_suggestion("Use 'sleep <milliseconds>' with a non-negative integer"),
            );
            return;
        }
        Err(RenderError::UnterminatedScript(line)) => {
            result.add_issue(
                LintIssue::error(
                    "E005",
                    "Script block is never closed",
                    file.to_path_buf(),
                )
                .with_location(format!("line {line}"))
                .with_suggestion("Close the block with a line containing 'interpreter:end'"),
            );
            return;
        }
        Err(e) => {
            result.add_issue(LintIssue::error("E001", e.to_string(), file.to_path_buf()));
            return;
        }
    };

    match &data.script {
        Some(script) if options.check_scripts => {
            if let Err(e) = RhaiScriptEngine::new(0).compile(script) {
                result.add_issue(
                    LintIssue::error("E006", format!("{e:#}"), file.to_path_buf())
                        .with_location("script"),
                );
            }
        }
        Some(_) => {}
        None if data.message.trim().is_empty() => {
            result.add_issue(
                LintIssue::warning(
                    "W001",
                    "Response has no message and no script",
                    file.to_path_buf(),
                )
                .with_suggestion("The configured default message will be served"),
            );
        }
        None => {}
    }
}

/// Whether `pattern` matches any request
pub fn is_match_any(pattern: &str) -> bool {
    MATCH_ANY.contains(&pattern)
}

/// Checks across the patterns of one test case, given in declaration order
/// with their response files in serving order.
pub fn validate_testcase_patterns(patterns: &[(String, Vec<PathBuf>)], result: &mut LintResult) {
    let mut catch_all: Option<&str> = None;

    for (pattern, files) in patterns {
        let Some(first) = files.first() else {
            continue;
        };

        if let Some(shadowing) = catch_all {
            result.add_issue(
                LintIssue::warning(
                    "W002",
                    format!(
                        "Pattern '{pattern}' is unreachable: earlier pattern '{shadowing}' matches every request"
                    ),
                    first.clone(),
                )
                .with_location("line 1")
                .with_suggestion("Rename the files so the catch-all pattern sorts last"),
            );
        } else if is_match_any(pattern) {
            catch_all = Some(pattern.as_str());
        }

        if files.len() > 1 {
            let names: Vec<String> = files
                .iter()
                .map(|f| f.file_name().unwrap_or_default().to_string_lossy().into_owned())
                .collect();
            result.add_issue(
                LintIssue::info(
                    "I001",
                    format!(
                        "Pattern '{pattern}' has {} responses, served in order: {}",
                        files.len(),
                        names.join(", ")
                    ),
                    first.clone(),
                ),
            );
        }
    }
}
