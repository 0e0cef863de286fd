//! `quizpilot inspect`: summarize a knowledge bank or run artifact.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use quizpilot_core::{KnowledgeBank, Variant};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Bank or `solution_map.json` to read
    #[arg(default_value = "master_qa_bank.json")]
    pub bank: PathBuf,

    /// Show the variants recorded for this question
    #[arg(long)]
    pub identity: Option<String>,

    /// List every question identity
    #[arg(long)]
    pub list: bool,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    if !args.bank.exists() {
        bail!("Bank file not found: {}", args.bank.display());
    }
    let bank = KnowledgeBank::load(&args.bank)
        .with_context(|| format!("Failed to read {}", args.bank.display()))?;

    println!(
        "{}: {} question(s), {} variant(s)",
        args.bank.display().to_string().bold(),
        bank.question_count(),
        bank.variant_count()
    );

    if args.list {
        for identity in bank.identities() {
            println!("  {} ({})", identity, bank.variants(identity).len());
        }
    }

    if let Some(identity) = &args.identity {
        let variants = bank.variants(identity);
        if variants.is_empty() {
            bail!("No variants recorded for {identity:?}");
        }
        println!();
        println!("{}", identity.cyan());
        for (index, variant) in variants.iter().enumerate() {
            print!("{}", format_variant(index + 1, variant));
        }
    }
    Ok(())
}

fn format_variant(number: usize, variant: &Variant) -> String {
    let join = |items: &std::collections::BTreeSet<String>| {
        items.iter().cloned().collect::<Vec<_>>().join(" | ")
    };
    format!(
        "  #{number}\n    options: {}\n    answer:  {}\n",
        join(variant.option_contents()),
        join(variant.answer_contents())
    )
}
