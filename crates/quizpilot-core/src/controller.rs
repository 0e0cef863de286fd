//! Run controller.
//!
//! The outer loop of a run: warm up the UI, watch for a new question, hand
//! it to the attempt supervisor, and stop on the configured stop identity,
//! an unsolvable question, too many probe failures, or an operator stop.
//!
//! Whatever the reason, shutdown always flushes the solve record to the run
//! artifact and (when enabled) the knowledge bank to its store. A bank file
//! that could not be read at startup is never overwritten.

use crate::config::EngineConfig;
use crate::journal::RunJournal;
use crate::knowledge_bank::KnowledgeBank;
use crate::pacer::{Interrupted, Pacer};
use crate::retry::{Attempt, RetryOutcome, RetryPolicy, with_retries};
use crate::run_context::RunContext;
use crate::run_record::create_run_dir;
use crate::station::Station;
use crate::status::{RunStatus, StatusWriter};
use crate::supervisor::{AttemptOutcome, AttemptSupervisor};
use crate::unsolved::UnsolvedReport;
use quizpilot_proto::{Marker, ObservationOutcome, ProbeResult, QuestionView};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The configured stop identity appeared.
    StopIdentity,
    /// A question could not be solved within the round bound.
    Unsolvable,
    /// No question could be observed within the probe-failure limit.
    ProbeFailures,
    /// Warm-up could not find the UI.
    StartupFailed,
    /// The stop signal was raised.
    Interrupted,
}

impl TerminationReason {
    /// Process exit code for this reason.
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminationReason::StopIdentity => 0,
            TerminationReason::Unsolvable | TerminationReason::StartupFailed => 1,
            TerminationReason::ProbeFailures => 2,
            TerminationReason::Interrupted => 130,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::StopIdentity => "stop_identity",
            TerminationReason::Unsolvable => "unsolvable",
            TerminationReason::ProbeFailures => "probe_failures",
            TerminationReason::StartupFailed => "startup_failed",
            TerminationReason::Interrupted => "interrupted",
        }
    }

    /// Only reaching the stop identity counts as a clean finish.
    pub fn is_success(&self) -> bool {
        matches!(self, TerminationReason::StopIdentity)
    }
}

/// Returns a human-readable status for a termination reason.
pub fn termination_status_text(reason: &TerminationReason) -> &'static str {
    match reason {
        TerminationReason::StopIdentity => "Reached the configured stop question.",
        TerminationReason::Unsolvable => "Stopped on a question that could not be solved.",
        TerminationReason::ProbeFailures => "Stopped after repeated observation failures.",
        TerminationReason::StartupFailed => "Could not find the quiz UI at startup.",
        TerminationReason::Interrupted => "Interrupted by signal.",
    }
}

/// Formats a run length for humans: `850ms`, `42s`, `3m 05s`, `1h 02m 05s`.
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        return format!("{}ms", d.as_millis());
    }
    let secs = d.as_secs();
    match (secs / 3600, secs / 60 % 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}

/// Summary handed back to the caller once the run has shut down.
#[derive(Debug)]
pub struct RunReport {
    pub reason: TerminationReason,
    pub run_dir: PathBuf,
    /// Path of `solution_map.json`, if it was written.
    pub artifact: Option<PathBuf>,
    pub solved_count: usize,
    pub unsolved_identity: Option<String>,
    /// Persistence problems logged during shutdown.
    pub persistence_errors: Vec<String>,
    pub elapsed: Duration,
}

/// Owns a run from warm-up to shutdown.
pub struct RunController {
    config: EngineConfig,
    station: Station,
    pacer: Pacer,
    ctx: RunContext,
    run_dir: PathBuf,
    journal: RunJournal,
    status: StatusWriter,
    snapshot: RunStatus,
    unsolved_identity: Option<String>,
    /// The bank file exists but failed to load; shutdown leaves it alone.
    bank_unreadable: bool,
    started: Instant,
}

impl RunController {
    /// Prepares a run: creates the run directory and loads the bank.
    pub fn new(config: EngineConfig, station: Station, pacer: Pacer) -> io::Result<Self> {
        let run_dir = create_run_dir(&config.output_dir)?;
        if !config.bank.enabled {
            info!("Knowledge bank disabled");
            return Ok(Self::with_bank(config, station, pacer, KnowledgeBank::new(), run_dir));
        }

        let path = config.bank.path.clone();
        match KnowledgeBank::load(&path) {
            Ok(bank) => {
                info!(
                    questions = bank.question_count(),
                    variants = bank.variant_count(),
                    "Loaded knowledge bank from {}",
                    path.display()
                );
                Ok(Self::with_bank(config, station, pacer, bank, run_dir))
            }
            Err(e) => {
                error!(
                    "Failed to load knowledge bank {}: {}; continuing with an empty bank",
                    path.display(),
                    e
                );
                let mut controller =
                    Self::with_bank(config, station, pacer, KnowledgeBank::new(), run_dir);
                controller.bank_unreadable = true;
                Ok(controller)
            }
        }
    }

    /// Prepares a run with an already-loaded bank and run directory.
    pub fn with_bank(
        config: EngineConfig,
        station: Station,
        pacer: Pacer,
        bank: KnowledgeBank,
        run_dir: PathBuf,
    ) -> Self {
        let journal = RunJournal::new(&run_dir);
        let status = StatusWriter::new(&run_dir);
        Self {
            config,
            station,
            pacer,
            ctx: RunContext::new(bank),
            run_dir,
            journal,
            status,
            snapshot: RunStatus::default(),
            unsolved_identity: None,
            bank_unreadable: false,
            started: Instant::now(),
        }
    }

    /// Runs until a termination condition, then persists everything.
    pub fn run(mut self) -> RunReport {
        self.started = Instant::now();
        info!(
            run_dir = %self.run_dir.display(),
            bank_questions = self.ctx.bank.question_count(),
            "Starting run"
        );
        self.journal.log_run_started(self.ctx.bank.question_count());

        let reason = match self.drive() {
            Ok(reason) => reason,
            Err(Interrupted) => {
                warn!("Stop requested, shutting down");
                TerminationReason::Interrupted
            }
        };

        self.shutdown(reason)
    }

    fn drive(&mut self) -> Result<TerminationReason, Interrupted> {
        if let Some(reason) = self.warm_up()? {
            return Ok(reason);
        }

        loop {
            let Some(view) = self.next_question()? else {
                return Ok(TerminationReason::ProbeFailures);
            };

            if self.ctx.last_identity.as_deref() == Some(view.identity.as_str()) {
                debug!(identity = %view.identity, "Question unchanged, waiting");
                self.pacer.pause(self.config.delays.no_change_poll())?;
                continue;
            }

            if self.config.stop_at_identity.as_deref() == Some(view.identity.as_str()) {
                info!(identity = %view.identity, "Reached stop identity");
                return Ok(TerminationReason::StopIdentity);
            }

            info!(identity = %view.identity, kind = ?view.kind, "New question");
            self.journal.log_question(&view.identity);
            self.snapshot.current_identity = Some(view.identity.clone());
            self.update_status();

            let mut supervisor = AttemptSupervisor::new(&self.config);
            let outcome =
                supervisor.attempt(&mut self.ctx, &mut self.station, &self.pacer, &view)?;

            match outcome {
                AttemptOutcome::Solved(solution) => {
                    self.journal.log_solved(
                        &view.identity,
                        &solution.source.to_string(),
                        &format!("{:?}", solution.answer_contents),
                    );
                    if !solution.recorded {
                        self.journal.log_event("ANSWER_NOT_RECORDED", &view.identity);
                    }
                    self.ctx.last_identity = Some(view.identity);
                    self.snapshot.solved_count = self.ctx.record.question_count();
                    self.snapshot.last_rounds = solution.rounds;
                    self.update_status();
                }
                AttemptOutcome::Superseded { found } => {
                    self.journal.log_event(
                        "QUESTION_SUPERSEDED",
                        &format!("{} -> {}", view.identity, found),
                    );
                }
                AttemptOutcome::Unsolved { rounds, last_round } => {
                    error!(identity = %view.identity, rounds, "Question could not be solved");
                    let detail = last_round.map_or_else(|| "unknown".to_string(), |r| format!("{r:?}"));
                    let report = UnsolvedReport::new(&self.run_dir);
                    if let Err(e) = report.record(&view, rounds, &detail) {
                        warn!("Failed to write {}: {}", report.path().display(), e);
                    }
                    self.snapshot.last_rounds = rounds;
                    self.unsolved_identity = Some(view.identity);
                    return Ok(TerminationReason::Unsolvable);
                }
            }
        }
    }

    /// Startup grace, window activation and marker validation.
    fn warm_up(&mut self) -> Result<Option<TerminationReason>, Interrupted> {
        let delays = &self.config.delays;
        info!(grace = ?delays.startup_grace(), "Waiting for the quiz UI");
        self.pacer.pause(delays.startup_grace())?;

        if self.config.startup.activate_window {
            match self.station.find_submit(
                &self.pacer,
                self.config.retries.max_scroll_attempts,
                self.config.delays.post_scroll(),
            )? {
                ProbeResult::Found(point) => {
                    debug!(at = %point, "Activating quiz window");
                    self.station
                        .click(point, &self.pacer, self.config.delays.activation())?;
                }
                ProbeResult::NotFound => {
                    error!("Submit control not found during warm-up");
                    return Ok(Some(TerminationReason::StartupFailed));
                }
            }
        }

        if self.config.startup.validate_markers {
            let letters = match self.config.alphabet_letters() {
                Ok(letters) => letters,
                Err(e) => {
                    error!("Cannot validate option markers: {}", e);
                    return Ok(Some(TerminationReason::StartupFailed));
                }
            };
            let missing: Vec<_> = letters
                .into_iter()
                .filter(|&letter| !self.station.locate(Marker::Option(letter)).is_found())
                .collect();
            if !missing.is_empty() {
                error!(missing = ?missing, "Option markers not visible during warm-up");
                return Ok(Some(TerminationReason::StartupFailed));
            }
        }

        info!("Warm-up complete");
        Ok(None)
    }

    /// Observes until a question is readable or the failure limit is hit.
    fn next_question(&mut self) -> Result<Option<QuestionView>, Interrupted> {
        let policy = match self.config.retries.max_consecutive_probe_failures {
            Some(max) => RetryPolicy::bounded(max, self.config.delays.probe_retry()),
            None => RetryPolicy::unbounded(self.config.delays.probe_retry()),
        };

        let station = &mut self.station;
        let outcome = with_retries(policy, &self.pacer, |attempt| {
            Ok::<_, Interrupted>(match station.observe() {
                ObservationOutcome::Parsed(view) => Attempt::Done(view),
                ObservationOutcome::Unparseable => {
                    warn!(attempt, "No question observed, retrying");
                    Attempt::Retry
                }
            })
        })?;

        if let RetryOutcome::Exhausted { attempts } = outcome {
            error!(attempts, "Giving up after consecutive observation failures");
            return Ok(None);
        }
        Ok(outcome.value())
    }

    fn update_status(&mut self) {
        self.snapshot.bank_questions = self.ctx.bank.question_count();
        self.snapshot.elapsed_seconds = self.started.elapsed().as_secs();
        self.status.update(&self.snapshot);
    }

    /// Flushes the solve record and bank, whatever the reason for stopping.
    fn shutdown(mut self, reason: TerminationReason) -> RunReport {
        let mut persistence_errors = Vec::new();

        let artifact = match self.ctx.record.write_artifact(&self.run_dir) {
            Ok(path) => {
                self.journal.log_artifact(&path);
                Some(path)
            }
            Err(e) => {
                error!("Failed to write solve record: {}", e);
                persistence_errors.push(format!("solve record: {e}"));
                None
            }
        };

        if self.config.bank.enabled && self.config.bank.save_on_exit {
            let path = &self.config.bank.path;
            if self.bank_unreadable {
                error!("Not overwriting unreadable knowledge bank {}", path.display());
                persistence_errors.push(format!(
                    "knowledge bank: {} could not be read at startup and was left untouched; \
                     this run's answers are in the run artifact",
                    path.display()
                ));
            } else {
                match self.ctx.bank.save(path) {
                    Ok(()) => info!(
                        questions = self.ctx.bank.question_count(),
                        "Saved knowledge bank to {}",
                        path.display()
                    ),
                    Err(e) => {
                        error!("Failed to save knowledge bank: {}", e);
                        persistence_errors.push(format!("knowledge bank: {e}"));
                    }
                }
            }
        }

        self.journal.log_halt(termination_status_text(&reason));
        self.snapshot.is_halted = true;
        self.snapshot.halt_reason = Some(reason.as_str().to_string());
        self.snapshot.solved_count = self.ctx.record.question_count();
        self.update_status();

        let elapsed = self.started.elapsed();
        info!(
            reason = reason.as_str(),
            solved = self.ctx.record.question_count(),
            elapsed = %format_duration(elapsed),
            "{}",
            termination_status_text(&reason)
        );

        RunReport {
            reason,
            run_dir: self.run_dir,
            artifact,
            solved_count: self.ctx.record.question_count(),
            unsolved_identity: self.unsolved_identity,
            persistence_errors,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(TerminationReason::StopIdentity.exit_code(), 0);
        assert_eq!(TerminationReason::Unsolvable.exit_code(), 1);
        assert_eq!(TerminationReason::StartupFailed.exit_code(), 1);
        assert_eq!(TerminationReason::ProbeFailures.exit_code(), 2);
        assert_eq!(TerminationReason::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_only_stop_identity_is_success() {
        assert!(TerminationReason::StopIdentity.is_success());
        assert!(!TerminationReason::Unsolvable.is_success());
        assert!(!TerminationReason::Interrupted.is_success());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 02m 05s");
    }
}
