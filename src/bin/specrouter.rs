use specrouter::cli::run_cli;
use specrouter::logging::{init_logging, LogConfig};

fn main() {
    if let Err(err) = init_logging(&LogConfig::from_env()) {
        eprintln!("Warning: {err:#}");
    }
    std::process::exit(run_cli());
}
