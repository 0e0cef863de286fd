//! Selection verifier.
//!
//! Drives the UI's option selection to a desired set with the fewest toggles
//! and confirms the result by re-observing. Each attempt re-reads the
//! current selection and recomputes the diff, so partial progress from an
//! earlier attempt is kept rather than undone.

use crate::config::EngineConfig;
use crate::pacer::{Interrupted, Pacer};
use crate::retry::{Attempt, RetryOutcome, RetryPolicy, with_retries};
use crate::station::Station;
use quizpilot_proto::{Letter, ObservationOutcome, Point};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Result of driving the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The observed selection equals the desired one.
    Confirmed,
    /// Selection state is not observable; the clicks were issued and trusted.
    /// Only the submission result can confirm this.
    Assumed,
    /// The selection could not be brought to the desired set.
    Mismatch {
        /// Last observed selection, if the UI was readable.
        observed: Option<BTreeSet<Letter>>,
    },
    /// A different question is on screen; the selection no longer applies.
    QuestionChanged { found: String },
}

impl Verification {
    /// Whether the caller should go on to submit.
    pub fn should_submit(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Assumed)
    }
}

/// Toggles needed to move from `current` to `desired`, deselections first.
///
/// Deselecting first avoids a transient over-selection that single-choice
/// UIs may reject.
pub fn toggle_plan(current: &BTreeSet<Letter>, desired: &BTreeSet<Letter>) -> Vec<Letter> {
    current
        .difference(desired)
        .chain(desired.difference(current))
        .copied()
        .collect()
}

/// Applies and verifies option selections.
#[derive(Debug, Clone, Copy)]
pub struct SelectionVerifier {
    attempts: u32,
    post_click: Duration,
    settle: Duration,
}

impl SelectionVerifier {
    pub fn new(attempts: u32, post_click: Duration, settle: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            post_click,
            settle,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.retries.verify_attempts,
            config.delays.post_click(),
            config.delays.verify_settle(),
        )
    }

    /// Brings the selection of question `identity` to `desired`.
    pub fn apply(
        &self,
        station: &mut Station,
        pacer: &Pacer,
        identity: &str,
        desired: &BTreeSet<Letter>,
        positions: &BTreeMap<Letter, Point>,
    ) -> Result<Verification, Interrupted> {
        if let Some(missing) = desired.iter().find(|&&l| !positions.contains_key(&l)) {
            warn!(letter = %missing, "Desired option has no known position");
            return Ok(Verification::Mismatch { observed: None });
        }

        if !station.reports_selection() {
            debug!(desired = ?desired, "Selection state unavailable, clicking without verification");
            for letter in desired {
                station.click(positions[letter], pacer, self.post_click)?;
            }
            return Ok(Verification::Assumed);
        }

        let mut last_observed = None;
        // `Done(Some(found))` means another question replaced this one.
        let outcome = with_retries(
            RetryPolicy::bounded(self.attempts, Duration::ZERO),
            pacer,
            |attempt| -> Result<Attempt<Option<String>>, Interrupted> {
                debug!(attempt, max = self.attempts, desired = ?desired, "Applying selection");

                let current = match station.observe() {
                    ObservationOutcome::Parsed(view) if view.identity == identity => view.selected,
                    ObservationOutcome::Parsed(view) => {
                        warn!(expected = %identity, found = %view.identity, "Question changed while selecting");
                        return Ok(Attempt::Done(Some(view.identity)));
                    }
                    ObservationOutcome::Unparseable => {
                        warn!("Could not read selection before clicking; assuming nothing selected");
                        BTreeSet::new()
                    }
                };

                for letter in toggle_plan(&current, desired) {
                    let Some(&point) = positions.get(&letter) else {
                        warn!(letter = %letter, "Selected option has no known position");
                        continue;
                    };
                    station.click(point, pacer, self.post_click)?;
                }

                pacer.pause(self.settle)?;
                let observed = match station.observe() {
                    ObservationOutcome::Parsed(view) if view.identity == identity => {
                        Some(view.selected)
                    }
                    ObservationOutcome::Parsed(view) => {
                        warn!(expected = %identity, found = %view.identity, "Question changed after selecting");
                        return Ok(Attempt::Done(Some(view.identity)));
                    }
                    ObservationOutcome::Unparseable => None,
                };

                if observed.as_ref() == Some(desired) {
                    Ok(Attempt::Done(None))
                } else {
                    warn!(
                        attempt,
                        desired = ?desired,
                        observed = ?observed,
                        "Selection verification failed"
                    );
                    last_observed = observed;
                    Ok(Attempt::Retry)
                }
            },
        )?;

        match outcome {
            RetryOutcome::Succeeded {
                value: Some(found), ..
            } => Ok(Verification::QuestionChanged { found }),
            RetryOutcome::Succeeded { value: None, .. } => {
                debug!(selection = ?desired, "Selection verified");
                Ok(Verification::Confirmed)
            }
            RetryOutcome::Exhausted { attempts } => {
                warn!(attempts, desired = ?desired, "Could not establish selection");
                Ok(Verification::Mismatch {
                    observed: last_observed,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> BTreeSet<Letter> {
        Letter::parse_all(s).unwrap().into_iter().collect()
    }

    #[test]
    fn test_toggle_plan_deselects_before_selecting() {
        let plan = toggle_plan(&letters("AB"), &letters("BC"));
        assert_eq!(plan, Letter::parse_all("AC").unwrap());
    }

    #[test]
    fn test_toggle_plan_empty_when_already_selected() {
        assert!(toggle_plan(&letters("BD"), &letters("BD")).is_empty());
    }

    #[test]
    fn test_toggle_plan_from_nothing() {
        assert_eq!(toggle_plan(&BTreeSet::new(), &letters("AD")), Letter::parse_all("AD").unwrap());
    }

    #[test]
    fn test_should_submit() {
        assert!(Verification::Confirmed.should_submit());
        assert!(Verification::Assumed.should_submit());
        assert!(!Verification::Mismatch { observed: None }.should_submit());
        assert!(
            !Verification::QuestionChanged {
                found: "Q2".to_string()
            }
            .should_submit()
        );
    }
}
