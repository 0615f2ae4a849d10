//! uastify Fixture Harness
//!
//! Discovers YAML fixture suites, runs every case through the driver
//! [`Transforms`] and reports the outcome with colored diffs.
//!
//! # Fixture Format
//!
//! ```yaml
//! - name: "string literal"
//!   mode: semantic                  # optional, defaults to semantic
//!   source: "f(\"hi\");"            # optional, enables line/col resolution
//!   input:                          # native root node
//!     IASTClass: CPPASTLiteralExpression
//!     LiteralValue: "\"hi\""
//!     kind: string_literal
//!   expected:                       # for success cases
//!     "@type": uast:String
//!     Value: hi
//!     Format: ""
//!   expect_error: "substring"       # for error cases
//!   skip: false                     # optional, defaults to false
//!   only: false                     # optional, defaults to false
//! ```
//!
//! Inputs are native root nodes, without the parser response envelope.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use uastify::test_harness::{run_all_tests, TestConfig};
//!
//! let config = TestConfig::default();
//! let (passed, failed, skipped) = run_all_tests(None, &config);
//! if failed > 0 {
//!     std::process::exit(1);
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use difference::{Changeset, Difference};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::config::DriverConfig;
use crate::diagnostics::{ErrorContext, UastError};
use crate::node::Node;
use crate::normalizer::{Mode, Transforms};

// =============================================================================
// CORE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TestResult {
    Pass {
        file: String,
        name: String,
    },
    Fail {
        file: String,
        name: String,
        error: String,
        /// Expected and actual trees, pretty-printed, when the output differed.
        mismatch: Option<(String, String)>,
    },
    Skipped {
        file: String,
        name: String,
        reason: String,
    },
}

/// One fixture case.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub name: String,
    pub input: Node,
    #[serde(default)]
    pub mode: Mode,
    pub source: Option<String>,
    pub expected: Option<Node>,
    pub expect_error: Option<String>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub only: bool,
}

pub struct TestConfig {
    pub test_root: String,
    pub driver: DriverConfig,
    pub use_colors: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            test_root: "tests/suites".to_string(),
            driver: DriverConfig {
                top_level_is_root: true,
                ..DriverConfig::default()
            },
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

impl TestConfig {
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

// =============================================================================
// DISCOVERY AND LOADING
// =============================================================================

/// Every `.yaml`/`.yml` file under `root`, in a stable order.
pub fn discover_yaml_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, UastError> {
    let content = fs::read_to_string(path)
        .map_err(|e| UastError::from(e).context(format!("reading {}", path.display())))?;
    serde_yaml::from_str::<Vec<TestCase>>(&content).map_err(|e| UastError::Config {
        message: format!("invalid fixture file {}: {}", path.display(), e),
        ctx: ErrorContext::with_help("fixtures are a YAML list of cases with 'name' and 'input'"),
        source: Some(Box::new(e)),
    })
}

pub fn skip_reason(case: &TestCase, has_only: bool, filter: Option<&str>) -> Option<String> {
    if has_only && !case.only {
        return Some("Not marked 'only' in 'only' mode".to_string());
    }
    if case.skip {
        return Some("Marked 'skip'".to_string());
    }
    if let Some(f) = filter {
        if !case.name.to_lowercase().contains(f) {
            return Some(format!("Filtered out by substring: {}", f));
        }
    }
    None
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Runs one case and compares the outcome with its expectation.
pub fn run_test_case(file: &str, case: &TestCase, transforms: &Transforms) -> TestResult {
    let fail = |error: String, mismatch: Option<(String, String)>| TestResult::Fail {
        file: file.to_string(),
        name: case.name.clone(),
        error,
        mismatch,
    };
    let pass = || TestResult::Pass {
        file: file.to_string(),
        name: case.name.clone(),
    };

    let outcome = transforms.run(case.input.clone(), case.source.as_deref(), case.mode);
    match (outcome, &case.expected, &case.expect_error) {
        (Ok(actual), Some(expected), None) => {
            if &actual == expected {
                pass()
            } else {
                fail(
                    "Output did not match expected".to_string(),
                    Some((expected.to_json_pretty(), actual.to_json_pretty())),
                )
            }
        }
        (Ok(actual), None, Some(expected)) => fail(
            format!(
                "Expected error '{}' but the pipeline produced: {}",
                expected,
                actual.to_json_string()
            ),
            None,
        ),
        (Err(e), None, Some(expected)) => {
            let message = e.to_string();
            if message.contains(expected.as_str()) {
                pass()
            } else {
                fail(
                    format!("Expected error '{}' but got: {}", expected, message),
                    None,
                )
            }
        }
        (Err(e), _, _) => fail(e.to_string(), None),
        (Ok(_), _, _) => fail(
            "A case needs exactly one of 'expected' and 'expect_error'".to_string(),
            None,
        ),
    }
}

// =============================================================================
// REPORTING
// =============================================================================

pub fn partition_results(results: &[TestResult]) -> (usize, usize, usize) {
    let count = |f: fn(&TestResult) -> bool| results.iter().filter(|r| f(r)).count();
    (
        count(|r| matches!(r, TestResult::Pass { .. })),
        count(|r| matches!(r, TestResult::Fail { .. })),
        count(|r| matches!(r, TestResult::Skipped { .. })),
    )
}

pub fn report_results(results: &[TestResult], config: &TestConfig) {
    for r in results {
        match r {
            TestResult::Pass { file, name } => {
                println!("{}: {} [{}]", config.colorize("PASS", GREEN), name, file)
            }
            TestResult::Fail { .. } => print_failure(r, config),
            TestResult::Skipped { file, name, reason } => println!(
                "{}: {} [{}] ({})",
                config.colorize("SKIP", YELLOW),
                name,
                file,
                reason
            ),
        }
    }

    let (passed, failed, skipped) = partition_results(results);
    println!(
        "\nTest summary: total {}, {} {}, {} {}, {} {}",
        results.len(),
        config.colorize("passed", GREEN),
        passed,
        config.colorize("failed", RED),
        failed,
        config.colorize("skipped", YELLOW),
        skipped,
    );

    if failed > 0 {
        eprintln!("\nFailed tests:");
        for r in results {
            if let TestResult::Fail { name, .. } = r {
                eprintln!("  - {}", name);
            }
        }
    }
}

pub fn print_failure(r: &TestResult, config: &TestConfig) {
    let TestResult::Fail {
        file,
        name,
        error,
        mismatch,
    } = r
    else {
        return;
    };
    eprintln!("{}: {} [{}]", config.colorize("FAIL", RED), name, file);
    eprintln!("  Error: {}", error);
    if let Some((expected, actual)) = mismatch {
        eprintln!("  Diff:");
        print_diff(expected, actual, config);
    }
}

/// Line diff of two pretty-printed trees.
pub fn print_diff(expected: &str, actual: &str, config: &TestConfig) {
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(x) => {
                for line in x.lines() {
                    eprintln!("    {}", line);
                }
            }
            Difference::Rem(x) => {
                for line in x.lines() {
                    eprintln!("  - {}", config.colorize(line, GREEN));
                }
            }
            Difference::Add(x) => {
                for line in x.lines() {
                    eprintln!("  + {}", config.colorize(line, RED));
                }
            }
        }
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Runs every discovered case, prints a report and returns
/// `(passed, failed, skipped)`.
pub fn run_all_tests(filter: Option<&str>, config: &TestConfig) -> (usize, usize, usize) {
    let transforms = Transforms::new(&config.driver);
    let mut results = Vec::new();
    let mut all_cases = Vec::new();

    for path in discover_yaml_files(&config.test_root) {
        let file = path.display().to_string();
        match load_test_cases(&path) {
            Ok(cases) => all_cases.extend(cases.into_iter().map(|c| (file.clone(), c))),
            Err(e) => results.push(TestResult::Fail {
                file: file.clone(),
                name: "<load>".to_string(),
                error: e.to_string(),
                mismatch: None,
            }),
        }
    }

    let has_only = all_cases.iter().any(|(_, c)| c.only);
    results.extend(all_cases.iter().map(|(file, case)| {
        match skip_reason(case, has_only, filter) {
            Some(reason) => TestResult::Skipped {
                file: file.clone(),
                name: case.name.clone(),
                reason,
            },
            None => run_test_case(file, case, &transforms),
        }
    }));

    report_results(&results, config);
    partition_results(&results)
}

pub struct TestResults {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Entry point for the `suite_runner` binary: the first argument, if any,
/// filters cases by name.
pub fn run_tests_with_args(args: &[String]) -> TestResults {
    let filter = args.first().map(|s| s.to_lowercase());
    let (passed, failed, skipped) = run_all_tests(filter.as_deref(), &TestConfig::default());
    TestResults {
        passed,
        failed,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(yaml: &str) -> TestCase {
        let mut cases: Vec<TestCase> = serde_yaml::from_str(yaml).unwrap();
        cases.remove(0)
    }

    fn config() -> TestConfig {
        TestConfig {
            use_colors: false,
            ..TestConfig::default()
        }
    }

    #[test]
    fn test_case_passes_on_equal_tree() {
        let c = case(
            r#"
- name: name
  input: {IASTClass: CPPASTName, Name: x}
  expected: {"@type": "uast:Identifier", Name: x}
"#,
        );
        let t = Transforms::new(&config().driver);
        assert!(matches!(run_test_case("f.yaml", &c, &t), TestResult::Pass { .. }));
    }

    #[test]
    fn test_case_mismatch_carries_both_trees() {
        let c = case(
            r#"
- name: name
  input: {IASTClass: CPPASTName, Name: x}
  expected: {"@type": "uast:Identifier", Name: y}
"#,
        );
        let t = Transforms::new(&config().driver);
        match run_test_case("f.yaml", &c, &t) {
            TestResult::Fail { mismatch: Some((expected, actual)), .. } => {
                assert!(expected.contains("\"y\""));
                assert!(actual.contains("\"x\""));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_expected_error_matches_substring() {
        let c = case(
            r#"
- name: offsets without type
  mode: preprocessed
  input: {LocOffsetStart: 1}
  expect_error: "no 'IASTClass' field"
"#,
        );
        let t = Transforms::new(&config().driver);
        assert!(matches!(run_test_case("f.yaml", &c, &t), TestResult::Pass { .. }));
    }

    #[test]
    fn test_skip_reason() {
        let mut c = case("- name: Alpha\n  input: null\n  expected: null\n");
        assert_eq!(skip_reason(&c, false, None), None);
        assert!(skip_reason(&c, true, None).is_some());
        assert!(skip_reason(&c, false, Some("beta")).is_some());
        c.skip = true;
        assert_eq!(skip_reason(&c, false, None), Some("Marked 'skip'".to_string()));
    }
}
