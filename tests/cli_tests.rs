#![allow(clippy::unwrap_used, clippy::expect_used)]

use clap::Parser;
use specrouter::cli::{execute, Cli};
use specrouter::conformance::run_conformance_check;
use specrouter::validator::{resolve_validators, Outcome, RuleSet, ValidatorChain};
use std::path::PathBuf;
use std::process::Command;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn run(args: &[&str]) -> (i32, String) {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    let code = execute(&cli, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_three_valid_files_pass() {
    let root = fixture("valid");
    let (code, out) = run(&["specrouter", "validate", "--path", &root]);
    assert_eq!(code, 0, "{out}");
    assert!(out.contains("Total: 3, Passed: 3, Failed: 0"), "{out}");
    assert_eq!(out.matches("✅ [PASSED] DefaultValidator").count(), 3, "{out}");
}

#[test]
fn test_custom_rule_fails_independently_of_default_validator() {
    let root = fixture("two_paths");
    let rules = fixture("rules.yaml");
    let (code, out) = run(&[
        "specrouter",
        "validate",
        "--path",
        &root,
        "--rules",
        &rules,
        "--validator",
        "SingleEndpoint",
    ]);
    assert_eq!(code, 1, "{out}");
    assert!(out.contains("✅ [PASSED] DefaultValidator"), "{out}");
    assert!(out.contains("❌ [FAILED] SingleEndpoint: [PathCountMismatch]"), "{out}");
    assert!(out.contains("Total: 1, Passed: 0, Failed: 1"), "{out}");
}

#[test]
fn test_report_outcomes_per_validator() {
    let rules = RuleSet::from_path(&PathBuf::from(fixture("rules.yaml"))).unwrap();
    let custom = resolve_validators(
        &["SingleEndpoint".to_string(), "PostOnly".to_string()],
        Some(&rules),
    )
    .unwrap();
    let chain = ValidatorChain::new(custom);
    let report = run_conformance_check(&PathBuf::from(fixture("two_paths")), &chain).unwrap();

    let doc = &report.documents[0];
    assert_eq!(doc.outcome_of("DefaultValidator"), Some(&Outcome::Passed));
    assert!(doc.outcome_of("SingleEndpoint").unwrap().is_failed());
    assert_eq!(doc.outcome_of("PostOnly"), Some(&Outcome::Passed));
    assert_eq!(report.summary().exit_code(), 1);
}

#[test]
fn test_failures_in_one_file_do_not_hide_others() {
    let root = fixture("");
    let (code, out) = run(&["specrouter", "validate", "-p", &root]);
    assert_eq!(code, 1, "{out}");
    // cyclic.json fails; POST /pet is first declared in duplicate/a.json, so
    // duplicate/b.json and valid/pets/pet.json both fail
    assert!(out.contains("[CircularReference]"), "{out}");
    assert!(out.contains("[DuplicateRoute]"), "{out}");
    assert!(out.contains("Total: 8, Passed: 5, Failed: 3"), "{out}");
}

#[test]
fn test_data_product_standards_from_registry() {
    let root = fixture("data_product");
    let (code, out) = run(&["specrouter", "validate", "-p", &root, "-v", "DataProductStandards"]);
    assert_eq!(code, 0, "{out}");
    assert!(out.contains("✅ [PASSED] DataProductStandards"), "{out}");

    let root = fixture("valid");
    let (code, out) = run(&["specrouter", "validate", "-p", &root, "-v", "DataProductStandards"]);
    assert_eq!(code, 1, "{out}");
    assert!(out.contains("[OnlyOneEndpointAllowed]"), "{out}");
}

#[test]
fn test_binary_exit_codes() {
    let ok = Command::new(env!("CARGO_BIN_EXE_specrouter"))
        .args(["validate", "--path", &fixture("valid")])
        .output()
        .unwrap();
    assert!(ok.status.success());
    assert!(String::from_utf8_lossy(&ok.stdout).contains("Total: 3, Passed: 3, Failed: 0"));

    let failed = Command::new(env!("CARGO_BIN_EXE_specrouter"))
        .args(["validate", "--path", &fixture("duplicate")])
        .output()
        .unwrap();
    assert_eq!(failed.status.code(), Some(1));

    let usage = Command::new(env!("CARGO_BIN_EXE_specrouter"))
        .args(["validate", "--path", &fixture("valid"), "-v", "Missing"])
        .output()
        .unwrap();
    assert_eq!(usage.status.code(), Some(2));
}
