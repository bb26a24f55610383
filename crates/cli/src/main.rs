//! Command-line entry point: parses one required path argument, loads
//! the workflow document at that path, constructs the DAG, logs its
//! string form, and exits zero on success (non-zero on any error).
//!
//! Deliberately thin: execution of the DAG via the scheduler is a
//! separate concern this binary does not drive.

use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "dagflow",
    version,
    about = "Loads a workflow YAML document and constructs its DAG"
)]
struct Cli {
    /// Path to the workflow YAML document.
    path: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,dagflow_cli=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let command = Cli::command().after_help(dagflow_loader::SchemaLevel::full_sample());
    let matches = command.get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let source = std::fs::read_to_string(&cli.path)
        .map_err(|e| anyhow::anyhow!("could not read {}: {e}", cli.path.display()))?;

    let dag = dagflow_loader::load_str(&source)?;
    tracing::info!("constructed DAG:\n{dag}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_a_single_path_argument() {
        let cli = Cli::parse_from(["dagflow", "workflow.yaml"]);
        assert_eq!(cli.path, PathBuf::from("workflow.yaml"));
    }
}
