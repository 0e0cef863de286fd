//! # quizpilot-core
//!
//! Adaptive answer discovery for black-box multiple-choice quiz UIs.
//!
//! This crate provides:
//! - The knowledge bank of confirmed answers, its on-disk form, and the
//!   offline merge of per-run artifacts
//! - Selection verification, hypothesis enumeration, and the bank-first solver
//! - The attempt supervisor and the run controller that drives a whole run
//! - Configuration, pacing with cooperative cancellation, and run artifacts
//!   (journal, status snapshot, unsolved report)
//! - A scripted quiz simulator for tests and dry runs

pub mod bank_solver;
mod config;
pub mod controller;
pub mod enumerator;
pub mod journal;
pub mod knowledge_bank;
pub mod merge;
mod pacer;
pub mod retry;
mod run_context;
pub mod run_record;
pub mod selection;
pub mod station;
pub mod status;
pub mod supervisor;
pub mod testing;
pub mod unsolved;

pub use bank_solver::{BankFirstSolver, BankOutcome, FallbackReason};
pub use config::{
    BankConfig, ConfigError, DEFAULT_CONFIG_FILE, DelayConfig, EngineConfig, RetryConfig,
    StartupConfig,
};
pub use controller::{
    RunController, RunReport, TerminationReason, format_duration, termination_status_text,
};
pub use enumerator::Hypotheses;
pub use journal::RunJournal;
pub use knowledge_bank::{BankError, KnowledgeBank, MergeStats, Variant, VariantError};
pub use merge::{MergeError, MergeSummary, merge_into_file, merge_runs};
pub use pacer::{Interrupted, Pacer, StopSignal};
pub use retry::{Attempt, RetryOutcome, RetryPolicy, with_retries};
pub use run_context::RunContext;
pub use run_record::{ARTIFACT_FILE, SolveRecord};
pub use selection::{SelectionVerifier, Verification};
pub use station::{ProbeFailure, Station, Targets};
pub use status::{RunStatus, StatusWriter};
pub use supervisor::{AnswerSource, AttemptOutcome, AttemptState, AttemptSupervisor, Solution};
pub use unsolved::UnsolvedReport;
