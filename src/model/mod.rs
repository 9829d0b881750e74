//! # Model Compiler
//!
//! Turns resolved schemas into named models, one [`ModelNamespace`] per spec
//! document, and compiles every operation into an [`OperationSpec`].
//!
//! ## Naming
//!
//! | Source | Model name |
//! |---|---|
//! | Component schema | CamelCase of its `title`, else of its key |
//! | Inline request body | `<Op>Request` |
//! | Inline 200 response | `<Op>Response` |
//! | Inline response for another status | `<Op>Response<status>` |
//! | Inline object in a field | `<Parent><Field>` |
//!
//! `<Op>` is the CamelCase `operationId`, or method and path when there is none.
//! When a name is already taken by a model of different structure the new one
//! gets a numeric suffix (`Pet2`, `Pet3`, ...).
//!
//! Every model can produce a self-contained JSON Schema and a compiled
//! validator; in strict mode undeclared fields are rejected and `format` is enforced.

mod compiler;
mod definition;
mod handle;

pub use compiler::{compile_document, CompiledDocument, OperationSpec, ResponseSpec, JSON_MEDIA_TYPE};
pub use definition::{ExtraFields, FieldDefinition, ModelBody, ModelDefinition, TypeExpr, DEFS_PREFIX};
pub use handle::{ModelHandle, ModelNamespace, ModelValidator, SCHEMA_DIALECT};
