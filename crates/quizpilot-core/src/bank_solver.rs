//! Bank-first solver.
//!
//! Replays a previously confirmed answer when the live question matches a
//! stored variant exactly. One failed confirmation defers to brute force;
//! a stale entry is never retried within the same attempt.

use crate::knowledge_bank::KnowledgeBank;
use crate::pacer::{Interrupted, Pacer};
use crate::selection::{SelectionVerifier, Verification};
use crate::station::{Station, Targets};
use quizpilot_proto::{Letter, QuestionView, SubmitResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why the bank could not confirm an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No variant's fingerprint equals the live option contents.
    NoMatchingVariant,
    /// Two visible options share content, so answers cannot be mapped back.
    AmbiguousContents,
    /// The stored answer needs an option that is not on screen.
    OptionNotVisible(Letter),
    /// The selection could not be established.
    VerificationFailed,
    /// Submitting the stored answer did not advance the question.
    SubmissionUnchanged,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchingVariant => write!(f, "no stored variant for these options"),
            Self::AmbiguousContents => write!(f, "option contents are not unique"),
            Self::OptionNotVisible(letter) => write!(f, "option {letter} not visible"),
            Self::VerificationFailed => write!(f, "selection could not be verified"),
            Self::SubmissionUnchanged => write!(f, "stored answer was not accepted"),
        }
    }
}

/// Result of a bank try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankOutcome {
    /// The stored answer advanced the question.
    Confirmed(BTreeSet<String>),
    Fallback(FallbackReason),
    /// Another question replaced this one before the stored answer was sent.
    Superseded { found: String },
}

/// Maps stored answer contents to the letters currently showing them.
///
/// Fails if any content appears under more than one letter, or if an answer
/// content is missing from the view.
pub fn letters_for_contents(
    view: &QuestionView,
    answer_contents: &BTreeSet<String>,
) -> Result<BTreeSet<Letter>, FallbackReason> {
    let mut by_content: BTreeMap<&str, Letter> = BTreeMap::new();
    for (&letter, content) in &view.options {
        if by_content.insert(content.as_str(), letter).is_some() {
            return Err(FallbackReason::AmbiguousContents);
        }
    }

    answer_contents
        .iter()
        .map(|content| {
            by_content
                .get(content.as_str())
                .copied()
                .ok_or(FallbackReason::NoMatchingVariant)
        })
        .collect()
}

/// Tries the knowledge bank before any enumeration.
#[derive(Debug, Clone, Copy)]
pub struct BankFirstSolver {
    verifier: SelectionVerifier,
    post_submit: Duration,
}

impl BankFirstSolver {
    pub fn new(verifier: SelectionVerifier, post_submit: Duration) -> Self {
        Self {
            verifier,
            post_submit,
        }
    }

    /// Looks up `view` in `bank` and, on a hit, replays the stored answer.
    ///
    /// Issues no clicks unless a variant matches and maps cleanly onto the
    /// visible options.
    pub fn solve(
        &self,
        bank: &KnowledgeBank,
        station: &mut Station,
        pacer: &Pacer,
        view: &QuestionView,
        targets: &Targets,
    ) -> Result<BankOutcome, Interrupted> {
        let Some(variant) = bank.lookup(&view.identity, &view.option_contents()) else {
            debug!(identity = %view.identity, "No bank entry for current options");
            return Ok(BankOutcome::Fallback(FallbackReason::NoMatchingVariant));
        };

        let desired = match letters_for_contents(view, variant.answer_contents()) {
            Ok(letters) => letters,
            Err(reason) => {
                warn!(identity = %view.identity, "Bank entry unusable: {}", reason);
                return Ok(BankOutcome::Fallback(reason));
            }
        };

        if let Some(&missing) = desired.iter().find(|&&l| !targets.options.contains_key(&l)) {
            warn!(identity = %view.identity, letter = %missing, "Bank answer needs an option that is not visible");
            return Ok(BankOutcome::Fallback(FallbackReason::OptionNotVisible(missing)));
        }

        info!(identity = %view.identity, answer = ?desired, "Trying stored answer");

        let verification =
            self.verifier
                .apply(station, pacer, &view.identity, &desired, &targets.options)?;
        if let Verification::QuestionChanged { found } = &verification {
            return Ok(BankOutcome::Superseded {
                found: found.clone(),
            });
        }
        if !verification.should_submit() {
            return Ok(BankOutcome::Fallback(FallbackReason::VerificationFailed));
        }

        match station.submit(targets.submit, &view.identity, pacer, self.post_submit)? {
            SubmitResult::Advanced => {
                info!(identity = %view.identity, "Stored answer accepted");
                Ok(BankOutcome::Confirmed(variant.answer_contents().clone()))
            }
            SubmitResult::Unchanged => {
                warn!(identity = %view.identity, "Stored answer rejected, falling back");
                Ok(BankOutcome::Fallback(FallbackReason::SubmissionUnchanged))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizpilot_proto::QuestionKind;

    fn letter(c: char) -> Letter {
        Letter::new(c).unwrap()
    }

    fn contents(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn view() -> QuestionView {
        QuestionView::new("Q1", QuestionKind::Multiple)
            .with_option(letter('A'), "red")
            .with_option(letter('B'), "green")
            .with_option(letter('C'), "blue")
    }

    #[test]
    fn test_maps_contents_to_current_letters() {
        let got = letters_for_contents(&view(), &contents(&["blue", "red"])).unwrap();
        assert_eq!(got, BTreeSet::from([letter('A'), letter('C')]));
    }

    #[test]
    fn test_duplicate_contents_are_ambiguous() {
        let view = view().with_option(letter('D'), "red");
        assert_eq!(
            letters_for_contents(&view, &contents(&["green"])),
            Err(FallbackReason::AmbiguousContents)
        );
    }

    #[test]
    fn test_missing_content_is_no_match() {
        assert_eq!(
            letters_for_contents(&view(), &contents(&["purple"])),
            Err(FallbackReason::NoMatchingVariant)
        );
    }

    #[test]
    fn test_fallback_reason_display() {
        assert_eq!(
            FallbackReason::OptionNotVisible(letter('D')).to_string(),
            "option D not visible"
        );
    }
}
