//! Attempt supervisor.
//!
//! Runs one question's full solve as a small state machine:
//!
//! ```text
//! Idle -> Probing -> BankTry -> BruteForce -> Confirmed
//!                       |                  \-> Exhausted
//!                       \-> Confirmed
//! ```
//!
//! A round is one pass of probe, bank try, and brute force. Rounds repeat up
//! to `retries.max_rounds` with `delays.between_rounds` in between. The
//! question's identity changing after a submit is the only proof of success.
//!
//! If a different question shows up anywhere other than right after a
//! submit (for example because the post-submit read was unreadable), the
//! attempt ends as superseded and the controller takes over the new question.

use crate::bank_solver::{BankFirstSolver, BankOutcome};
use crate::config::EngineConfig;
use crate::enumerator::Hypotheses;
use crate::pacer::{Interrupted, Pacer};
use crate::retry::{Attempt, RetryOutcome, RetryPolicy, with_retries};
use crate::run_context::RunContext;
use crate::selection::{SelectionVerifier, Verification};
use crate::station::{ProbeFailure, Station, Targets};
use quizpilot_proto::{Letter, ObservationOutcome, QuestionView, SubmitResult};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Supervisor state within one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Probing,
    BankTry,
    BruteForce,
    Confirmed,
    Exhausted,
}

impl AttemptState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::BankTry => "bank_try",
            Self::BruteForce => "brute_force",
            Self::Confirmed => "confirmed",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a confirmed answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Bank,
    BruteForce,
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank => f.write_str("bank"),
            Self::BruteForce => f.write_str("brute force"),
        }
    }
}

/// A confirmed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub answer_contents: BTreeSet<String>,
    pub source: AnswerSource,
    /// Rounds used, including the successful one.
    pub rounds: u32,
    /// Brute-force candidates submitted across all rounds.
    pub candidates_tried: usize,
    /// Whether the answer made it into the bank and solve record.
    pub recorded: bool,
}

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Confirmed {
        answer_contents: BTreeSet<String>,
        source: AnswerSource,
    },
    /// Every candidate was tried without the question advancing.
    Exhausted,
    /// Targets could not be acquired.
    ProbeFailed(ProbeFailure),
    /// Another question appeared mid-round.
    Superseded { found: String },
}

/// Result of a whole attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Solved(Solution),
    /// The round bound was reached without confirmation.
    Unsolved {
        rounds: u32,
        last_round: Option<RoundOutcome>,
    },
    /// The UI moved on to `found` without a confirming submit. Nothing was
    /// recorded for the original question.
    Superseded { found: String },
}

/// How a round that stops the retry loop ended.
enum Settled {
    Confirmed {
        option_contents: BTreeSet<String>,
        source: AnswerSource,
        answer_contents: BTreeSet<String>,
    },
    Superseded(String),
}

/// Orchestrates bank try and brute force for one question at a time.
pub struct AttemptSupervisor<'a> {
    config: &'a EngineConfig,
    verifier: SelectionVerifier,
    bank_solver: BankFirstSolver,
    state: AttemptState,
    candidates_tried: usize,
}

impl<'a> AttemptSupervisor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        let verifier = SelectionVerifier::from_config(config);
        Self {
            config,
            verifier,
            bank_solver: BankFirstSolver::new(verifier, config.delays.post_submit()),
            state: AttemptState::Idle,
            candidates_tried: 0,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    fn transition(&mut self, next: AttemptState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Attempt state change");
            self.state = next;
        }
    }

    /// Solves the question shown in `view`, recording a confirmed answer in
    /// `ctx`.
    pub fn attempt(
        &mut self,
        ctx: &mut RunContext,
        station: &mut Station,
        pacer: &Pacer,
        view: &QuestionView,
    ) -> Result<AttemptOutcome, Interrupted> {
        self.state = AttemptState::Idle;
        self.candidates_tried = 0;

        let max_rounds = self.config.retries.max_rounds;
        let mut last_round = None;
        let outcome = with_retries(
            RetryPolicy::bounded(max_rounds, self.config.delays.between_rounds()),
            pacer,
            |round| -> Result<Attempt<Settled>, Interrupted> {
                info!(identity = %view.identity, round, max_rounds, "Starting round");
                let current = match refresh(station, view) {
                    Ok(current) => current,
                    Err(found) => return Ok(Attempt::Done(Settled::Superseded(found))),
                };

                match self.round(ctx, station, pacer, &current)? {
                    RoundOutcome::Confirmed {
                        answer_contents,
                        source,
                    } => Ok(Attempt::Done(Settled::Confirmed {
                        option_contents: current.option_contents(),
                        source,
                        answer_contents,
                    })),
                    RoundOutcome::Superseded { found } => {
                        Ok(Attempt::Done(Settled::Superseded(found)))
                    }
                    other => {
                        warn!(identity = %view.identity, round, outcome = ?other, "Round failed");
                        last_round = Some(other);
                        Ok(Attempt::Retry)
                    }
                }
            },
        )?;

        match outcome {
            RetryOutcome::Succeeded {
                value:
                    Settled::Confirmed {
                        option_contents,
                        source,
                        answer_contents,
                    },
                attempts,
            } => {
                self.transition(AttemptState::Confirmed);
                let recorded = record(ctx, &view.identity, option_contents, answer_contents.clone());
                info!(
                    identity = %view.identity,
                    answer = ?answer_contents,
                    source = %source,
                    rounds = attempts,
                    candidates = self.candidates_tried,
                    "Question solved"
                );
                Ok(AttemptOutcome::Solved(Solution {
                    answer_contents,
                    source,
                    rounds: attempts,
                    candidates_tried: self.candidates_tried,
                    recorded,
                }))
            }
            RetryOutcome::Succeeded {
                value: Settled::Superseded(found),
                ..
            } => {
                self.transition(AttemptState::Idle);
                info!(identity = %view.identity, found = %found, "Question superseded, handing back");
                Ok(AttemptOutcome::Superseded { found })
            }
            RetryOutcome::Exhausted { attempts } => {
                self.transition(AttemptState::Exhausted);
                warn!(identity = %view.identity, rounds = attempts, "Rounds exhausted");
                Ok(AttemptOutcome::Unsolved {
                    rounds: attempts,
                    last_round,
                })
            }
        }
    }

    /// One pass of probe, bank try, and brute force.
    fn round(
        &mut self,
        ctx: &RunContext,
        station: &mut Station,
        pacer: &Pacer,
        view: &QuestionView,
    ) -> Result<RoundOutcome, Interrupted> {
        self.transition(AttemptState::Probing);
        let targets = match station.acquire_targets(view, self.config, pacer)? {
            Ok(targets) => targets,
            Err(failure) => {
                warn!(identity = %view.identity, "Probe failed: {}", failure);
                return Ok(RoundOutcome::ProbeFailed(failure));
            }
        };

        if self.config.bank.enabled {
            self.transition(AttemptState::BankTry);
            match self
                .bank_solver
                .solve(&ctx.bank, station, pacer, view, &targets)?
            {
                BankOutcome::Confirmed(answer_contents) => {
                    return Ok(RoundOutcome::Confirmed {
                        answer_contents,
                        source: AnswerSource::Bank,
                    });
                }
                BankOutcome::Superseded { found } => {
                    return Ok(RoundOutcome::Superseded { found });
                }
                BankOutcome::Fallback(reason) => {
                    debug!(identity = %view.identity, "Bank fallback: {}", reason);
                }
            }
        }

        self.transition(AttemptState::BruteForce);
        self.brute_force(station, pacer, view, &targets)
    }

    fn brute_force(
        &mut self,
        station: &mut Station,
        pacer: &Pacer,
        view: &QuestionView,
        targets: &Targets,
    ) -> Result<RoundOutcome, Interrupted> {
        let hypotheses = Hypotheses::new(view.kind, targets.options.keys().copied());
        let total = hypotheses.total();
        info!(identity = %view.identity, kind = ?view.kind, total, "Enumerating candidates");

        for (index, candidate) in hypotheses.enumerate() {
            pacer.checkpoint()?;
            if let Some(found) = moved_on(station, view) {
                return Ok(RoundOutcome::Superseded { found });
            }
            debug!(
                identity = %view.identity,
                candidate = %render(&candidate),
                index = index + 1,
                total,
                "Trying candidate"
            );

            let verification =
                self.verifier
                    .apply(station, pacer, &view.identity, &candidate, &targets.options)?;
            if let Verification::QuestionChanged { found } = &verification {
                return Ok(RoundOutcome::Superseded {
                    found: found.clone(),
                });
            }
            if !verification.should_submit() {
                continue;
            }

            self.candidates_tried += 1;
            match station.submit(
                targets.submit,
                &view.identity,
                pacer,
                self.config.delays.post_submit(),
            )? {
                SubmitResult::Advanced => {
                    return Ok(RoundOutcome::Confirmed {
                        answer_contents: view.contents_of(&candidate),
                        source: AnswerSource::BruteForce,
                    });
                }
                SubmitResult::Unchanged => {
                    debug!(candidate = %render(&candidate), "Candidate rejected");
                }
            }
        }

        Ok(RoundOutcome::Exhausted)
    }
}

/// Re-reads the question, falling back to `view` if it cannot be read.
///
/// Returns the new identity as the error if another question is showing.
fn refresh(station: &mut Station, view: &QuestionView) -> Result<QuestionView, String> {
    match station.observe() {
        ObservationOutcome::Parsed(fresh) if fresh.identity == view.identity => Ok(fresh),
        ObservationOutcome::Parsed(fresh) => {
            warn!(expected = %view.identity, found = %fresh.identity, "Question changed before round");
            Err(fresh.identity)
        }
        ObservationOutcome::Unparseable => Ok(view.clone()),
    }
}

/// The identity now on screen, if it is readable and differs from `view`.
fn moved_on(station: &mut Station, view: &QuestionView) -> Option<String> {
    let found = station.observe().identity()?.to_string();
    if found == view.identity {
        return None;
    }
    warn!(expected = %view.identity, found = %found, "Question changed between candidates");
    Some(found)
}

/// Stores a confirmed answer, reporting whether it was kept.
fn record(
    ctx: &mut RunContext,
    identity: &str,
    option_contents: BTreeSet<String>,
    answer_contents: BTreeSet<String>,
) -> bool {
    let recorded = ctx.confirm(identity, option_contents, answer_contents);
    if !recorded {
        warn!(identity = %identity, "Question advanced but its answer could not be recorded");
    }
    recorded
}

/// Renders a candidate as its letters, e.g. `BD`.
pub fn render(letters: &BTreeSet<Letter>) -> String {
    letters.iter().map(|l| l.as_char()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_candidate() {
        let set: BTreeSet<Letter> = Letter::parse_all("DB").unwrap().into_iter().collect();
        assert_eq!(render(&set), "BD");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(AttemptState::BankTry.to_string(), "bank_try");
        assert_eq!(AttemptState::BruteForce.as_str(), "brute_force");
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_record_reports_stored_answer() {
        let mut ctx = RunContext::default();
        assert!(record(&mut ctx, "Q1", set(&["red", "blue"]), set(&["blue"])));
        assert_eq!(ctx.record.question_count(), 1);
    }

    #[test]
    fn test_record_reports_rejected_answer() {
        let mut ctx = RunContext::default();
        assert!(!record(&mut ctx, "Q1", set(&["red", "blue"]), set(&["green"])));
        assert!(ctx.record.is_empty());
        assert!(ctx.bank.is_empty());
    }

    #[test]
    fn test_new_supervisor_is_idle() {
        let config = EngineConfig::default();
        assert_eq!(AttemptSupervisor::new(&config).state(), AttemptState::Idle);
    }
}
