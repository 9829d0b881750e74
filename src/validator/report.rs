use crate::error::ValidationError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of one check against one document
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(ValidationError),
    /// Not run because an earlier, prerequisite check failed
    Skipped,
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorOutcome {
    /// Validator (or pipeline stage) that produced the outcome
    pub validator: String,
    pub outcome: Outcome,
}

/// Every outcome recorded for one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub outcomes: Vec<ValidatorOutcome>,
}

impl DocumentReport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        DocumentReport {
            path: path.as_ref().to_path_buf(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, validator: impl Into<String>, outcome: Outcome) {
        self.outcomes.push(ValidatorOutcome {
            validator: validator.into(),
            outcome,
        });
    }

    /// A document passes when nothing recorded for it failed
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_failed())
    }

    pub fn outcome_of(&self, validator: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.validator == validator)
            .map(|o| &o.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(err) => Some((o.validator.as_str(), err)),
            _ => None,
        })
    }
}

/// Per-document reports, in discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub documents: Vec<DocumentReport>,
}

impl ValidationReport {
    pub fn summary(&self) -> ValidationSummary {
        let passed = self.documents.iter().filter(|d| d.passed()).count();
        ValidationSummary {
            total: self.documents.len(),
            passed,
            failed: self.documents.len() - passed,
        }
    }

    pub fn passed(&self) -> bool {
        self.documents.iter().all(DocumentReport::passed)
    }

    pub fn document(&self, path: &Path) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.path == path || d.path.ends_with(path))
    }
}

/// Process-level tally of passed and failed documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl ValidationSummary {
    /// Exit code of the conformance command: 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, Passed: {}, Failed: {}",
            self.total, self.passed, self.failed
        )
    }
}
