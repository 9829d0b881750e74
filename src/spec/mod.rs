//! # Spec Module
//!
//! Discovery and loading of OpenAPI documents from a directory tree.
//!
//! The loader walks the tree, keeps every `.json` file, sorts them by their path
//! relative to the root and parses each one into an immutable [`SpecDocument`].
//! Sorting makes model and route registration reproducible across runs: an
//! unchanged tree always yields the same document order and therefore the same
//! route order.
//!
//! Two failure policies exist (see [`LoadMode`]):
//!
//! - **Router construction** stops at the first malformed file.
//! - **Conformance checking** keeps going and reports every failure per file.

mod load;
mod types;

pub use load::*;
pub use types::*;
