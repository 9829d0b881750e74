//! # Schema Resolver
//!
//! Normalizes JSON schema fragments from a spec document into [`SchemaNode`]
//! trees: `$ref`s are followed (with cycle detection), `allOf` is merged into a
//! single object, `anyOf`/`oneOf` become unions, and advisory constraints are
//! carried as metadata.
//!
//! Only document-local references of the form `#/components/schemas/<Name>`
//! are supported.

mod node;
mod resolver;

pub use node::*;
pub use resolver::{component_name, SchemaResolver, COMPONENT_SCHEMA_PREFIX};
