//! # quizpilot
//!
//! Command-line entry point:
//! - `merge`: fold per-run artifacts into one knowledge bank
//! - `simulate`: run the engine against a scripted quiz
//! - `inspect`: summarize a knowledge bank or run artifact

mod inspect_cmd;
mod merge_cmd;
mod simulate_cmd;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "quizpilot",
    version,
    about = "Adaptive answer discovery for black-box multiple-choice quizzes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file, or to a timestamped file in this directory
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge run artifacts into a single knowledge bank
    Merge(merge_cmd::MergeArgs),
    /// Run the engine against a scripted quiz
    Simulate(simulate_cmd::SimulateArgs),
    /// Show what a knowledge bank contains
    Inspect(inspect_cmd::InspectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_deref())?;
    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Merge(args) => merge_cmd::execute(args),
        Commands::Inspect(args) => inspect_cmd::execute(args),
        Commands::Simulate(args) => {
            let code = simulate_cmd::execute(args).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
    }
}

/// Resolves `--log-file`: a directory gets a timestamped file inside it.
fn log_file_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        path.join(format!("quizpilot_{stamp}.log"))
    } else {
        path.to_path_buf()
    }
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = match log_file {
        Some(path) => {
            let path = log_file_path(path);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["quizpilot", "inspect", "bank.json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Inspect(_)));
    }

    #[test]
    fn test_log_file_in_directory_is_timestamped() {
        let tmp = TempDir::new().unwrap();
        let path = log_file_path(tmp.path());
        assert_eq!(path.parent(), Some(tmp.path()));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("quizpilot_") && name.ends_with(".log"));
    }

    #[test]
    fn test_log_file_path_kept_as_given() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("run.log");
        assert_eq!(log_file_path(&file), file);
    }
}
