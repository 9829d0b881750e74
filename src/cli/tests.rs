//! Unit tests for CLI commands

use crate::cli::{execute, Cli, Commands, EXIT_FAILED, EXIT_OK, EXIT_USAGE};
use clap::Parser;
use tempfile::TempDir;

const PET: &str = r#"{"openapi": "3.0.0", "paths": {"/pet": {"post": {"responses": {}}}}}"#;

fn run(args: &[&str]) -> (i32, String) {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    let code = execute(&cli, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_validate_command_with_validators() {
    let cli = Cli::try_parse_from([
        "specrouter",
        "validate",
        "--path",
        "specs",
        "-v",
        "DataProductStandards",
        "--validator",
        "SingleEndpoint",
        "--rules",
        "rules.yaml",
    ])
    .unwrap();

    match cli.command {
        Commands::Validate {
            path,
            validators,
            rules,
        } => {
            assert_eq!(path.to_string_lossy(), "specs");
            assert_eq!(validators, vec!["DataProductStandards", "SingleEndpoint"]);
            assert_eq!(rules.unwrap().to_string_lossy(), "rules.yaml");
        }
        _ => panic!("Expected Validate command"),
    }
}

#[test]
fn test_routes_command_flags() {
    let cli = Cli::try_parse_from(["specrouter", "routes", "-p", "specs", "--schemas"]).unwrap();
    match cli.command {
        Commands::Routes { schemas, strict, .. } => {
            assert!(schemas);
            assert!(!strict);
        }
        _ => panic!("Expected Routes command"),
    }
}

#[test]
fn test_unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["specrouter", "serve"]).is_err());
}

#[test]
fn test_unknown_validator_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pet.json"), PET).unwrap();
    let root = dir.path().to_str().unwrap();

    let (code, out) = run(&["specrouter", "validate", "-p", root, "-v", "Nope"]);
    assert_eq!(code, EXIT_USAGE);
    assert!(out.contains("failed to load validator 'Nope'"), "{out}");
    assert!(!out.contains("Summary"), "{out}");
}

#[test]
fn test_routes_lists_stubbed_routes() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pet.json"), PET).unwrap();
    let root = dir.path().to_str().unwrap();

    let (code, out) = run(&["specrouter", "routes", "-p", root]);
    assert_eq!(code, EXIT_OK);
    assert!(out.contains("1 route(s)"), "{out}");
    assert!(out.contains("POST    /pet -> post_pet (stub)"), "{out}");
}

#[test]
fn test_routes_reports_construction_failure() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.json"), PET).unwrap();
    std::fs::write(dir.path().join("b.json"), PET).unwrap();
    let root = dir.path().to_str().unwrap();

    let (code, out) = run(&["specrouter", "routes", "-p", root]);
    assert_eq!(code, EXIT_FAILED);
    assert!(out.contains("[DuplicateRouteError]"), "{out}");
}
