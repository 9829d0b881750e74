//! # CLI Module
//!
//! Command-line front end of the conformance check, meant for CI.
//!
//! ## Commands
//!
//! ### `validate`
//!
//! Check every spec under a root and print a per-file report:
//!
//! ```bash
//! specrouter validate --path specs/
//! specrouter validate --path specs/ --validator DataProductStandards
//! specrouter validate --path specs/ --rules rules.yaml --validator SingleEndpoint
//! ```
//!
//! Exit codes: `0` every file passed, `1` at least one file failed,
//! `2` usage error (unknown validator, unreadable rules file or root).
//!
//! ### `routes`
//!
//! List the routes a tree compiles to, with their models:
//!
//! ```bash
//! specrouter routes --path specs/ --schemas
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use specrouter::cli::{execute, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! let code = execute(&cli, &mut std::io::stdout())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{execute, run_cli, Cli, Commands, EXIT_FAILED, EXIT_OK, EXIT_USAGE};
