//! `quizpilot simulate`: run the full engine against a scripted quiz.
//!
//! The controller runs on a blocking thread; Ctrl-C raises the stop signal
//! so the run unwinds through its normal shutdown and still writes its
//! artifact.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use quizpilot_core::testing::{QuizScript, SimulatedQuiz};
use quizpilot_core::{
    DEFAULT_CONFIG_FILE, DelayConfig, EngineConfig, Pacer, RunController, RunReport, StopSignal,
    format_duration, termination_status_text,
};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Quiz script (JSON) to play
    #[arg(long, value_name = "PATH")]
    pub script: PathBuf,

    /// Engine config (default: quizpilot.yml if present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Parent directory for run output
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Knowledge bank to load and update
    #[arg(long, value_name = "PATH")]
    pub bank: Option<PathBuf>,

    /// Do not reuse or update the knowledge bank
    #[arg(long)]
    pub no_bank: bool,

    /// End the run cleanly when this question appears
    #[arg(long, value_name = "IDENTITY")]
    pub stop_at: Option<String>,

    /// Skip all settle delays
    #[arg(long)]
    pub fast: bool,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => EngineConfig::from_file_or_default(Path::new(DEFAULT_CONFIG_FILE))
            .with_context(|| format!("Failed to load {DEFAULT_CONFIG_FILE}")),
    }
}

fn apply_overrides(config: &mut EngineConfig, args: &SimulateArgs) {
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(bank) = &args.bank {
        config.bank.path.clone_from(bank);
    }
    if args.no_bank {
        config.bank.enabled = false;
    }
    if let Some(identity) = &args.stop_at {
        config.stop_at_identity = Some(identity.clone());
    }
    if args.fast {
        config.delays = DelayConfig::immediate();
    }
}

/// Runs the simulation and returns the process exit code.
pub async fn execute(args: SimulateArgs) -> Result<i32> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let script = QuizScript::from_file(&args.script)
        .with_context(|| format!("Failed to load quiz script {}", args.script.display()))?;

    let stop = StopSignal::new();
    let quiz = SimulatedQuiz::new(script).with_stop_signal(stop.clone());
    let controller = RunController::new(config, quiz.station(), Pacer::new(stop.clone()))
        .context("Failed to create run directory")?;

    let signal_stop = stop.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping at the next pause");
            signal_stop.trigger();
        }
    });

    let report = tokio::task::spawn_blocking(move || controller.run())
        .await
        .context("Run controller thread failed")?;
    ctrl_c.abort();

    print_report(&report);
    Ok(report.reason.exit_code())
}

fn print_report(report: &RunReport) {
    let status = termination_status_text(&report.reason);
    if report.reason.is_success() {
        println!("{}", status.green().bold());
    } else {
        println!("{}", status.red().bold());
    }

    println!("  solved:   {}", report.solved_count);
    println!("  elapsed:  {}", format_duration(report.elapsed));
    println!("  run dir:  {}", report.run_dir.display());
    if let Some(artifact) = &report.artifact {
        println!("  artifact: {}", artifact.display());
    }
    if let Some(identity) = &report.unsolved_identity {
        println!("  unsolved: {}", identity.yellow());
    }
    for error in &report.persistence_errors {
        println!("  {} {}", "persistence error:".red(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> SimulateArgs {
        let mut argv = vec!["simulate", "--script", "quiz.json"];
        argv.extend_from_slice(extra);
        SimulateArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = EngineConfig::default();
        apply_overrides(
            &mut config,
            &args(&["--fast", "--no-bank", "--stop-at", "Done", "--output-dir", "out"]),
        );

        assert_eq!(config.delays, DelayConfig::immediate());
        assert!(!config.bank.enabled);
        assert_eq!(config.stop_at_identity.as_deref(), Some("Done"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = EngineConfig::default();
        apply_overrides(&mut config, &args(&[]));
        assert_eq!(config, EngineConfig::default());
    }
}
