//! # Conformance Check
//!
//! Checks a whole spec tree the way CI does: every document is loaded,
//! validated and compiled, and every problem is recorded instead of aborting
//! at the first one. A broken file never stops its siblings from being checked.
//!
//! Each document gets one outcome per stage:
//!
//! | Stage | Outcome name |
//! |---|---|
//! | parsing | `SpecLoader` (only recorded on failure) |
//! | validators | one per validator of the chain |
//! | model compilation | `ModelCompiler` |
//! | cross-document route check | `RouteResolver` |
//!
//! Later stages are [`Outcome::Skipped`] once an earlier stage failed.

use crate::error::{CompileError, LoadError, ValidationError};
use crate::model::compile_document;
use crate::spec::load_specs_lenient;
use crate::validator::{DocumentReport, Outcome, ValidationReport, ValidatorChain};
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const LOADER_STAGE: &str = "SpecLoader";
pub const COMPILER_STAGE: &str = "ModelCompiler";
pub const ROUTES_STAGE: &str = "RouteResolver";

const RULE: &str = "------------------------------------------------------------";

/// Check every document under `root` and report per document.
///
/// # Errors
///
/// Only fails when `root` itself cannot be walked; per-file problems end up in
/// the report.
pub fn run_conformance_check(root: &Path, chain: &ValidatorChain) -> Result<ValidationReport, LoadError> {
    let mut report = ValidationReport::default();
    // (path, method) -> document that declared it first
    let mut declared: HashMap<(String, Method), PathBuf> = HashMap::new();

    for loaded in load_specs_lenient(root)? {
        let doc = match loaded {
            Ok(doc) => doc,
            Err(err) => {
                let mut doc_report = DocumentReport::new(&err.path);
                doc_report.push(
                    LOADER_STAGE,
                    Outcome::Failed(ValidationError::new("LoadError", err.reason.clone())),
                );
                for name in chain.names() {
                    doc_report.push(name, Outcome::Skipped);
                }
                doc_report.push(COMPILER_STAGE, Outcome::Skipped);
                doc_report.push(ROUTES_STAGE, Outcome::Skipped);
                report.documents.push(doc_report);
                continue;
            }
        };

        let mut doc_report = chain.check(&doc);
        if !doc_report.passed() {
            doc_report.push(COMPILER_STAGE, Outcome::Skipped);
            doc_report.push(ROUTES_STAGE, Outcome::Skipped);
            report.documents.push(doc_report);
            continue;
        }

        let compiled = match compile_document(&doc) {
            Ok(compiled) => compiled,
            Err(err) => {
                doc_report.push(COMPILER_STAGE, Outcome::Failed(compile_failure(&err)));
                doc_report.push(ROUTES_STAGE, Outcome::Skipped);
                report.documents.push(doc_report);
                continue;
            }
        };
        doc_report.push(COMPILER_STAGE, Outcome::Passed);

        let mut duplicate = None;
        for op in &compiled.operations {
            let key = (op.path.clone(), op.method.clone());
            match declared.get(&key) {
                Some(first) if duplicate.is_none() => {
                    duplicate = Some(
                        ValidationError::new(
                            "DuplicateRoute",
                            format!("route already declared in '{}'", first.display()),
                        )
                        .at(op.location()),
                    );
                }
                Some(_) => {}
                None => {
                    declared.insert(key, doc.path().to_path_buf());
                }
            }
        }
        match duplicate {
            Some(err) => doc_report.push(ROUTES_STAGE, Outcome::Failed(err)),
            None => doc_report.push(ROUTES_STAGE, Outcome::Passed),
        }

        report.documents.push(doc_report);
    }

    let summary = report.summary();
    if summary.failed > 0 {
        warn!(root = %root.display(), %summary, "conformance check failed");
    } else {
        info!(root = %root.display(), %summary, "conformance check passed");
    }
    Ok(report)
}

fn compile_failure(err: &CompileError) -> ValidationError {
    match err {
        CompileError::Schema { location, error, .. } => {
            ValidationError::from_schema(location.clone(), error.clone())
        }
        CompileError::Validation { error, .. } => error.clone(),
        other => ValidationError::new(other.kind(), other.to_string()),
    }
}

/// Console rendering of a [`ValidationReport`]
struct Console<'a>(&'a ValidationReport);

impl fmt::Display for Console<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for doc in &self.0.documents {
            writeln!(f, "{RULE}")?;
            let mark = if doc.passed() { "✅" } else { "❌" };
            writeln!(f, "{mark} {}", doc.path.display())?;
            for outcome in &doc.outcomes {
                match &outcome.outcome {
                    Outcome::Passed => writeln!(f, "   ✅ [PASSED] {}", outcome.validator)?,
                    Outcome::Failed(err) => {
                        writeln!(f, "   ❌ [FAILED] {}: {err}", outcome.validator)?
                    }
                    Outcome::Skipped => writeln!(f, "   ⏭️  [SKIPPED] {}", outcome.validator)?,
                }
            }
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "Summary: {}", self.0.summary())
    }
}

/// Render the console report: one block per document, then the tally
pub fn render_report(report: &ValidationReport) -> String {
    Console(report).to_string()
}

/// Print the console report to stdout
pub fn print_report(report: &ValidationReport) {
    print!("{}", render_report(report));
}
