//! # Error Types
//!
//! Every stage of the spec-to-route pipeline reports failures through a typed
//! error. Router construction folds them all into [`CompileError`], which always
//! names the offending file, path or schema.
//!
//! | Stage | Error |
//! |---|---|
//! | Spec Loader | [`LoadError`] |
//! | Validator Chain | [`ValidationError`] |
//! | Schema Resolver | [`SchemaError`] |
//! | Route Resolver | [`CompileError::DuplicateRoute`], [`CompileError::UnboundRoute`], [`CompileError::UnknownRoute`] |

use http::Method;
use std::fmt;
use std::path::PathBuf;

/// A spec file could not be turned into a [`crate::spec::SpecDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// File that failed to load
    pub path: PathBuf,
    /// Human-readable reason (I/O error, JSON syntax error, non-object root)
    pub reason: String,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LoadError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to load spec '{}': {}",
            self.path.display(),
            self.reason
        )
    }
}

impl std::error::Error for LoadError {}

/// A schema graph could not be normalized into a [`crate::schema::SchemaNode`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A `$ref` points at something absent from the document (or outside it)
    UnresolvedReference {
        /// The `$ref` string as written in the document
        reference: String,
    },
    /// A `$ref` resolves back to a schema that is still being resolved
    ///
    /// `chain` lists the component names from the first occurrence of the
    /// repeated schema to its second occurrence, e.g. `["A", "B", "A"]`.
    CircularReference {
        /// Resolution path that closed the cycle
        chain: Vec<String>,
    },
    /// `allOf`/`anyOf`/`oneOf` that cannot be expressed as a model
    InvalidComposition {
        /// Composition keyword (`allOf`, `anyOf`, `oneOf`)
        keyword: &'static str,
        /// Why the composition was rejected
        reason: String,
    },
    /// Any other unsupported schema shape (tuple arrays, non-object schemas)
    InvalidSchema {
        /// Why the schema was rejected
        reason: String,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnresolvedReference { reference } => {
                write!(f, "unresolved schema reference '{reference}'")
            }
            SchemaError::CircularReference { chain } => {
                write!(f, "circular schema reference: {}", chain.join(" -> "))
            }
            SchemaError::InvalidComposition { keyword, reason } => {
                write!(f, "invalid '{keyword}' composition: {reason}")
            }
            SchemaError::InvalidSchema { reason } => write!(f, "invalid schema: {reason}"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// A document violates a structural or custom rule.
///
/// `kind` plays the role of an error subclass: every rule reports a distinct,
/// stable kind (`UnsupportedVersion`, `MissingSchemaTitle`, `OnlyOneEndpointAllowed`, ...)
/// so callers and tests can match on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Stable name of the violated rule
    pub kind: String,
    /// Human-readable description of the violation
    pub message: String,
    /// Where in the document the violation was found (e.g. `/pets POST (requestBody)`)
    pub location: Option<String>,
    /// Resolver failure this violation was derived from, if any
    pub cause: Option<SchemaError>,
}

impl ValidationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            kind: kind.into(),
            message: message.into(),
            location: None,
            cause: None,
        }
    }

    /// Attach the document location of the violation
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Wrap a resolver failure found while validating
    pub fn from_schema(location: impl Into<String>, error: SchemaError) -> Self {
        let kind = match &error {
            SchemaError::UnresolvedReference { .. } => "UnresolvedReference",
            SchemaError::CircularReference { .. } => "CircularReference",
            SchemaError::InvalidComposition { .. } => "InvalidComposition",
            SchemaError::InvalidSchema { .. } => "InvalidSchema",
        };
        ValidationError {
            kind: kind.to_string(),
            message: error.to_string(),
            location: Some(location.into()),
            cause: Some(error),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {}: {}", self.kind, location, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// The single error returned by router construction.
///
/// Construction is all-or-nothing: the first failure aborts the pipeline and
/// no partially built router is ever handed to the caller.
#[derive(Debug)]
pub enum CompileError {
    /// A spec file was unreadable or malformed
    Load(LoadError),
    /// A validator rejected a document
    Validation {
        /// Offending document
        path: PathBuf,
        /// Name of the validator that failed
        validator: String,
        /// The violation
        error: ValidationError,
    },
    /// A schema could not be resolved or compiled
    Schema {
        /// Offending document
        path: PathBuf,
        /// Schema or operation being compiled
        location: String,
        /// The resolver failure
        error: SchemaError,
    },
    /// Two documents declare the same (path, method)
    DuplicateRoute {
        path: String,
        method: Method,
        /// Document that declared the route first
        first: PathBuf,
        /// Document that declared it again
        second: PathBuf,
    },
    /// No override, no method default and stubs are disabled
    UnboundRoute { path: String, method: Method },
    /// A handler was registered for a (path, method) that no document declares
    UnknownRoute { path: String, method: Method },
    /// The route-registration collaborator refused a route
    Registration {
        path: String,
        method: Method,
        source: anyhow::Error,
    },
}

impl CompileError {
    /// Short, stable name of the error variant (used in console reports)
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Load(_) => "LoadError",
            CompileError::Validation { .. } => "ValidationError",
            CompileError::Schema {
                error: SchemaError::UnresolvedReference { .. },
                ..
            } => "UnresolvedReferenceError",
            CompileError::Schema {
                error: SchemaError::CircularReference { .. },
                ..
            } => "CircularReferenceError",
            CompileError::Schema { .. } => "SchemaError",
            CompileError::DuplicateRoute { .. } => "DuplicateRouteError",
            CompileError::UnboundRoute { .. } => "UnboundRouteError",
            CompileError::UnknownRoute { .. } => "UnknownRouteError",
            CompileError::Registration { .. } => "RegistrationError",
        }
    }

    /// Fold a validator failure into a construction error.
    ///
    /// Violations that were raised because the resolver failed are reported as
    /// [`CompileError::Schema`] so cycles and dangling references keep their type.
    pub fn from_validation(path: PathBuf, validator: &str, error: ValidationError) -> Self {
        match error.cause.clone() {
            Some(cause) => CompileError::Schema {
                path,
                location: error.location.clone().unwrap_or_default(),
                error: cause,
            },
            None => CompileError::Validation {
                path,
                validator: validator.to_string(),
                error,
            },
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Load(err) => write!(f, "{err}"),
            CompileError::Validation {
                path,
                validator,
                error,
            } => write!(
                f,
                "spec '{}' failed validator {validator}: {error}",
                path.display()
            ),
            CompileError::Schema {
                path,
                location,
                error,
            } => write!(f, "spec '{}' at {location}: {error}", path.display()),
            CompileError::DuplicateRoute {
                path,
                method,
                first,
                second,
            } => write!(
                f,
                "duplicate route {method} {path}: declared in '{}' and again in '{}'",
                first.display(),
                second.display()
            ),
            CompileError::UnboundRoute { path, method } => write!(
                f,
                "route {method} {path} has no handler (no override, no {method} default, stubs disabled)"
            ),
            CompileError::UnknownRoute { path, method } => write!(
                f,
                "handler registered for {method} {path}, but no spec declares that route"
            ),
            CompileError::Registration {
                path,
                method,
                source,
            } => write!(f, "failed to register route {method} {path}: {source}"),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Load(err) => Some(err),
            CompileError::Validation { error, .. } => Some(error),
            CompileError::Schema { error, .. } => Some(error),
            CompileError::Registration { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<LoadError> for CompileError {
    fn from(err: LoadError) -> Self {
        CompileError::Load(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_cause_promotes_to_schema_error() {
        let err = ValidationError::from_schema(
            "schema:A",
            SchemaError::CircularReference {
                chain: vec!["A".into(), "B".into(), "A".into()],
            },
        );
        assert_eq!(err.kind, "CircularReference");

        let compiled = CompileError::from_validation(PathBuf::from("a.json"), "DefaultValidator", err);
        assert_eq!(compiled.kind(), "CircularReferenceError");
        assert!(compiled.to_string().contains("A -> B -> A"));
    }

    #[test]
    fn test_plain_violation_stays_validation_error() {
        let err = ValidationError::new("UnsupportedVersion", "openapi 2.0 is not supported");
        let compiled = CompileError::from_validation(PathBuf::from("a.json"), "DefaultValidator", err);
        match compiled {
            CompileError::Validation { validator, error, .. } => {
                assert_eq!(validator, "DefaultValidator");
                assert_eq!(error.kind, "UnsupportedVersion");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
