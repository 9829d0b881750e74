//! # Validator Chain
//!
//! Every spec document is checked by an ordered chain of [`SpecValidator`]s
//! before the compiler trusts it. The [`DefaultValidator`] is always the first
//! element; caller-supplied validators follow in the order given.
//!
//! The chain short-circuits per document: when the default validator fails,
//! custom validators are skipped for that document because they assume the
//! basic shape is intact. Documents never affect each other.
//!
//! ## Built-in validators
//!
//! | Name | Type |
//! |---|---|
//! | `DefaultValidator` | [`DefaultValidator`] (always present) |
//! | `DataProductStandards` | [`DataProductStandardsValidator`] |
//!
//! Further validators are declared in a rules file ([`RuleSet`]) or
//! implemented directly against [`SpecValidator`].

mod default;
mod report;
mod rules;
mod standards;

pub use default::{DefaultValidator, DEFAULT_VALIDATOR_NAME};
pub use report::{DocumentReport, Outcome, ValidationReport, ValidationSummary, ValidatorOutcome};
pub use rules::{RuleSet, RuleSpec, RuleValidator};
pub use standards::{DataProductStandardsValidator, DATA_PRODUCT_STANDARDS_NAME};

use crate::error::{CompileError, ValidationError};
use crate::spec::SpecDocument;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Capability to check one parsed spec document.
///
/// Implementations return normally on success and a [`ValidationError`] with
/// a distinct `kind` on violation.
pub trait SpecValidator: Send + Sync {
    /// Name shown in reports and used to select the validator on the command line
    fn name(&self) -> &str;

    /// Validate `doc`
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    fn validate(&self, doc: &SpecDocument) -> Result<(), ValidationError>;
}

/// Ordered validator list with the [`DefaultValidator`] fixed in first place
#[derive(Clone)]
pub struct ValidatorChain {
    validators: Vec<Arc<dyn SpecValidator>>,
}

impl Default for ValidatorChain {
    fn default() -> Self {
        ValidatorChain {
            validators: vec![Arc::new(DefaultValidator)],
        }
    }
}

impl ValidatorChain {
    /// Chain of the default validator followed by `custom`, in order
    pub fn new(custom: Vec<Arc<dyn SpecValidator>>) -> Self {
        let mut chain = ValidatorChain::default();
        chain.validators.extend(custom);
        chain
    }

    /// Append a validator after the ones already in the chain
    #[must_use]
    pub fn with(mut self, validator: impl SpecValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Router-construction mode: stop at the first failing validator.
    ///
    /// # Errors
    ///
    /// Returns the failure folded into a [`CompileError`] naming the document
    /// and the validator.
    pub fn validate(&self, doc: &SpecDocument) -> Result<(), CompileError> {
        for validator in &self.validators {
            if let Err(error) = validator.validate(doc) {
                warn!(
                    spec = %doc.path().display(),
                    validator = validator.name(),
                    kind = %error.kind,
                    "spec failed validation"
                );
                return Err(CompileError::from_validation(
                    doc.path().to_path_buf(),
                    validator.name(),
                    error,
                ));
            }
            debug!(spec = %doc.path().display(), validator = validator.name(), "validator passed");
        }
        Ok(())
    }

    /// Report mode: record one outcome per validator for `doc`.
    ///
    /// When the default validator fails, every custom validator is recorded
    /// as [`Outcome::Skipped`]. A failing custom validator does not stop the
    /// ones after it.
    pub fn check(&self, doc: &SpecDocument) -> DocumentReport {
        let mut report = DocumentReport::new(doc.path());
        let mut default_failed = false;
        for (index, validator) in self.validators.iter().enumerate() {
            if default_failed {
                report.push(validator.name(), Outcome::Skipped);
                continue;
            }
            match validator.validate(doc) {
                Ok(()) => report.push(validator.name(), Outcome::Passed),
                Err(error) => {
                    default_failed = index == 0;
                    report.push(validator.name(), Outcome::Failed(error));
                }
            }
        }
        report
    }
}

impl fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A validator name that neither the built-ins nor the rules file define
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValidatorError {
    pub name: String,
    pub available: Vec<String>,
}

impl fmt::Display for UnknownValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to load validator '{}' (available: {})",
            self.name,
            self.available.join(", ")
        )
    }
}

impl std::error::Error for UnknownValidatorError {}

/// Look up a built-in validator by name
pub fn builtin_validator(name: &str) -> Option<Arc<dyn SpecValidator>> {
    match name {
        DATA_PRODUCT_STANDARDS_NAME | "DataProductStandardsValidator" => {
            Some(Arc::new(DataProductStandardsValidator))
        }
        _ => None,
    }
}

/// Resolve validator names against the built-ins, then the rules file.
///
/// # Errors
///
/// Returns [`UnknownValidatorError`] for the first name nothing defines.
pub fn resolve_validators(
    names: &[String],
    rules: Option<&RuleSet>,
) -> Result<Vec<Arc<dyn SpecValidator>>, UnknownValidatorError> {
    names
        .iter()
        .map(|name| {
            if let Some(v) = builtin_validator(name) {
                return Ok(v);
            }
            if let Some(spec) = rules.and_then(|r| r.get(name)) {
                return Ok(Arc::new(RuleValidator::new(spec.clone())) as Arc<dyn SpecValidator>);
            }
            let mut available = vec![DATA_PRODUCT_STANDARDS_NAME.to_string()];
            if let Some(rules) = rules {
                available.extend(rules.names().map(String::from));
            }
            Err(UnknownValidatorError {
                name: name.clone(),
                available,
            })
        })
        .collect()
}
