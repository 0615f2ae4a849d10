// Runs every YAML fixture suite under tests/suites through the shared harness.

use uastify::test_harness::{discover_yaml_files, load_test_cases, run_all_tests, TestConfig};

#[test]
fn all_fixture_suites_pass() {
    let config = TestConfig {
        use_colors: false,
        ..TestConfig::default()
    };
    let (passed, failed, _skipped) = run_all_tests(None, &config);
    assert!(passed > 0, "no fixture cases were discovered");
    assert_eq!(failed, 0, "{} fixture case(s) failed", failed);
}

#[test]
fn every_fixture_file_parses() {
    let files = discover_yaml_files("tests/suites");
    assert!(!files.is_empty());
    for file in files {
        let cases = load_test_cases(&file).unwrap_or_else(|e| panic!("{}: {}", file.display(), e));
        assert!(!cases.is_empty(), "{} has no cases", file.display());
    }
}
