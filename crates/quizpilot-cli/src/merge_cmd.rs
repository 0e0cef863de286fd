//! `quizpilot merge`: consolidate run artifacts into one knowledge bank.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use quizpilot_core::merge_into_file;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Directory holding the timestamped run folders
    #[arg(default_value = "runs")]
    pub root: PathBuf,

    /// Where to write the merged bank
    #[arg(short, long, default_value = "master_qa_bank.json")]
    pub output: PathBuf,

    /// Existing bank folded in before any run (treated as oldest)
    #[arg(long, value_name = "PATH")]
    pub base: Option<PathBuf>,
}

/// Execute the merge command.
pub fn execute(args: MergeArgs) -> Result<()> {
    let summary = merge_into_file(&args.root, args.base.as_deref(), &args.output)
        .with_context(|| format!("Failed to merge runs under {}", args.root.display()))?;

    println!(
        "{} {} question(s), {} variant(s) -> {}",
        "Merged".green().bold(),
        summary.questions,
        summary.variants,
        args.output.display()
    );
    println!(
        "  files: {} merged, {} skipped",
        summary.files_merged, summary.files_skipped
    );
    println!(
        "  variants: {} new, {} replaced, {} unchanged",
        summary.stats.inserted, summary.stats.replaced, summary.stats.unchanged
    );
    if summary.files_skipped > 0 {
        println!(
            "{}",
            "Some artifacts could not be read; see the log for details.".yellow()
        );
    }
    Ok(())
}
