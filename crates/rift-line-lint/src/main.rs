//! Rift Line resource linter CLI
//!
//! Validates a scenario tree, a test case directory or a single response
//! file before it is uploaded to the resource store.
//!
//! Usage:
//!   rift-line-lint <path> [OPTIONS]

use clap::Parser;
use rift_line_lint::{lint_path, LintIssue, LintOptions, LintResult, Severity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Rift Line resource linter
#[derive(Parser, Debug)]
#[command(name = "rift-line-lint")]
#[command(
    author,
    version,
    about = "Validate Rift Line scenario resources before upload"
)]
struct Args {
    /// Scenario directory, test case directory or response file
    #[arg(required = true)]
    path: PathBuf,

    /// Output format: text (default), json
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Only show errors (hide warnings and info)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Skip compiling embedded scripts
    #[arg(long)]
    no_scripts: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

fn main() {
    let args = Args::parse();

    if !args.path.exists() {
        eprintln!("{RED}Error:{RESET} {} does not exist", args.path.display());
        std::process::exit(2);
    }

    let options = LintOptions {
        check_scripts: !args.no_scripts,
    };
    let result = lint_path(&args.path, &options);

    if args.output == "json" {
        print_results_json(&result);
    } else {
        print_results(&result, &args);
    }

    std::process::exit(if result.passes(args.strict) { 0 } else { 1 });
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("{RED}Error serializing results: {e}{RESET}"),
    }
}

fn print_results(result: &LintResult, args: &Args) {
    println!("{BOLD}{CYAN}Rift Line Resource Linter{RESET}");
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    println!("{DIM}Scanning:{RESET} {CYAN}{}{RESET}\n", args.path.display());

    let mut issues_by_file: BTreeMap<&Path, Vec<&LintIssue>> = BTreeMap::new();
    for issue in &result.issues {
        if args.errors_only && issue.severity != Severity::Error {
            continue;
        }
        issues_by_file.entry(issue.file.as_path()).or_default().push(issue);
    }

    if issues_by_file.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    }

    for (&file, issues) in &issues_by_file {
        let file_errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let status_indicator = if file_errors > 0 {
            format!("{RED}FAIL{RESET}")
        } else if issues.iter().any(|i| i.severity == Severity::Warning) {
            format!("{YELLOW}WARN{RESET}")
        } else {
            format!("{CYAN}INFO{RESET}")
        };
        let display = file.strip_prefix(&args.path).unwrap_or(file);
        let display = if display.as_os_str().is_empty() {
            file.display()
        } else {
            display.display()
        };
        println!("{status_indicator} {BOLD}{CYAN}{display}{RESET}");

        for issue in issues {
            let color = severity_color(&issue.severity);
            let location_str = issue
                .location
                .as_ref()
                .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
                .unwrap_or_default();
            println!(
                "  {color}|{RESET} {location_str}{BOLD}{color}{}{RESET}: {} {DIM}({color}{}{DIM}){RESET}",
                issue.severity.label(),
                issue.message,
                issue.code
            );
            if let Some(suggestion) = &issue.suggestion {
                println!("  {color}|{RESET}   {GREEN}-> {suggestion}{RESET}");
            }
        }
        println!();
    }

    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    println!(
        "  {DIM}Files checked:{RESET} {BOLD}{}{RESET}",
        result.files_checked
    );
    if result.errors > 0 {
        println!("  {RED}Errors:{RESET}    {BOLD}{RED}{}{RESET}", result.errors);
    } else {
        println!("  {GREEN}Errors:{RESET}    {BOLD}{GREEN}0{RESET}");
    }
    if result.warnings > 0 {
        println!(
            "  {YELLOW}Warnings:{RESET}  {BOLD}{YELLOW}{}{RESET}",
            result.warnings
        );
    } else {
        println!("  {DIM}Warnings:{RESET}  {BOLD}0{RESET}");
    }
    println!();

    if result.passes(args.strict) {
        if result.warnings == 0 {
            println!("{GREEN}{BOLD}All checks passed!{RESET}");
        } else {
            println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
        }
    } else {
        println!("{RED}{BOLD}Linting failed{RESET}");
    }
}

fn severity_color(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    }
}
