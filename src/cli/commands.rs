use crate::conformance::{render_report, run_conformance_check};
use crate::error::LoadError;
use crate::router::SpecRouter;
use crate::routes::{HandlerSource, RouteEntry};
use crate::validator::{resolve_validators, RuleSet, SpecValidator, ValidatorChain};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

/// Exit code when every document passed
pub const EXIT_OK: i32 = 0;
/// Exit code when at least one document failed
pub const EXIT_FAILED: i32 = 1;
/// Exit code for usage errors: unknown validator, unreadable rules file or root
pub const EXIT_USAGE: i32 = 2;

/// Command-line interface for specrouter
#[derive(Parser, Debug)]
#[command(name = "specrouter", version)]
#[command(about = "Validate and inspect trees of OpenAPI 3 documents", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every spec under a path and report per file
    ///
    /// The default validator always runs first. Every file is checked even
    /// when earlier ones fail; the exit code is non-zero if any file failed.
    Validate {
        /// Spec root directory, or a single spec file
        #[arg(short, long, env = "SPECROUTER_SPECS_PATH")]
        path: PathBuf,

        /// Additional validator to run, by name (repeatable)
        #[arg(short = 'v', long = "validator")]
        validators: Vec<String>,

        /// Rules file (YAML or JSON) declaring extra validators
        #[arg(short, long, env = "SPECROUTER_RULES")]
        rules: Option<PathBuf>,
    },
    /// List the routes a spec tree compiles to
    Routes {
        /// Spec root directory, or a single spec file
        #[arg(short, long, env = "SPECROUTER_SPECS_PATH")]
        path: PathBuf,

        /// Additional validator to run, by name (repeatable)
        #[arg(short = 'v', long = "validator")]
        validators: Vec<String>,

        /// Rules file (YAML or JSON) declaring extra validators
        #[arg(short, long, env = "SPECROUTER_RULES")]
        rules: Option<PathBuf>,

        /// Print the JSON Schema of every request and response model
        #[arg(long, default_value_t = false)]
        schemas: bool,

        /// Emit strict schemas (no unknown properties)
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

/// Parse the process arguments, run the command and return its exit code
pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match execute(&cli, &mut out) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("❌ {err:#}");
            EXIT_USAGE
        }
    }
}

/// Run `cli`, writing the console output to `out`.
///
/// # Errors
///
/// Only when writing to `out` fails.
pub fn execute<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Validate {
            path,
            validators,
            rules,
        } => {
            let chain = match build_chain(validators, rules.as_deref()) {
                Ok(chain) => chain,
                Err(message) => {
                    writeln!(out, "❌ {message}")?;
                    return Ok(EXIT_USAGE);
                }
            };
            let report = match run_conformance_check(path, &chain) {
                Ok(report) => report,
                Err(err) => {
                    writeln!(out, "❌ {err}")?;
                    return Ok(EXIT_USAGE);
                }
            };
            write!(out, "{}", render_report(&report))?;
            Ok(report.summary().exit_code())
        }
        Commands::Routes {
            path,
            validators,
            rules,
            schemas,
            strict,
        } => {
            let custom = match custom_validators(validators, rules.as_deref()) {
                Ok(custom) => custom,
                Err(message) => {
                    writeln!(out, "❌ {message}")?;
                    return Ok(EXIT_USAGE);
                }
            };
            let mut router = SpecRouter::new(path.clone(), custom)
                .allow_stubs(true)
                .strict(*strict);
            let entries = match router.resolve() {
                Ok(entries) => entries,
                Err(err) => {
                    writeln!(out, "❌ [{}] {err}", err.kind())?;
                    return Ok(EXIT_FAILED);
                }
            };
            write_routes(out, &entries, *schemas, *strict)?;
            Ok(EXIT_OK)
        }
    }
}

fn custom_validators(names: &[String], rules: Option<&Path>) -> Result<Vec<Arc<dyn SpecValidator>>, String> {
    let rules = rules
        .map(RuleSet::from_path)
        .transpose()
        .map_err(|err: LoadError| err.to_string())?;
    resolve_validators(names, rules.as_ref()).map_err(|err| err.to_string())
}

fn build_chain(names: &[String], rules: Option<&Path>) -> Result<ValidatorChain, String> {
    custom_validators(names, rules).map(ValidatorChain::new)
}

fn write_routes<W: Write>(out: &mut W, entries: &[RouteEntry], schemas: bool, strict: bool) -> anyhow::Result<()> {
    writeln!(out, "📋 {} route(s)", entries.len())?;
    for entry in entries {
        let request = entry.request_model.as_ref().map(|m| m.name()).unwrap_or("-");
        let response = entry.response_model.as_ref().map(|m| m.name()).unwrap_or("-");
        let stub = if entry.handler_source == HandlerSource::Stub { " (stub)" } else { "" };
        writeln!(
            out,
            "   {:<7} {} -> {}{stub}",
            entry.method.as_str(),
            entry.path,
            entry.name
        )?;
        writeln!(
            out,
            "           request: {request}, response {}: {response}",
            entry.response_status
        )?;
        if schemas {
            for model in entry.request_model.iter().chain(entry.response_model.iter()) {
                let schema = serde_json::to_string_pretty(&model.json_schema(strict))?;
                writeln!(out, "{schema}")?;
            }
        }
    }
    Ok(())
}
