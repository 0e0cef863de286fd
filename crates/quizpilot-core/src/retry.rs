//! A single bounded-retry combinator shared by every retry loop.
//!
//! Used for verifier click/verify cycles, supervisor rounds, the submit
//! marker scroll search, and the controller's probe retries.

use crate::pacer::{Interrupted, Pacer};
use std::time::Duration;

/// Result of one attempt of a retried body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The body produced its value; stop retrying.
    Done(T),
    /// The body should run again (if the budget allows).
    Retry,
}

/// How a retried body ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    /// Number of attempts consumed.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Exhausted { attempts } => *attempts,
        }
    }

    /// The produced value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Attempt budget and the wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries until the body succeeds or the run is interrupted.
    pub max_attempts: Option<u32>,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff,
        }
    }

    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }
}

/// Runs `body` with 1-based attempt numbers until it returns [`Attempt::Done`]
/// or the budget is spent, pausing `policy.backoff` between attempts.
///
/// The pacer is consulted before each attempt, so a stop request is honoured
/// even when the backoff is zero.
pub fn with_retries<T, E, F>(policy: RetryPolicy, pacer: &Pacer, mut body: F) -> Result<RetryOutcome<T>, E>
where
    F: FnMut(u32) -> Result<Attempt<T>, E>,
    E: From<Interrupted>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        pacer.checkpoint()?;

        if let Attempt::Done(value) = body(attempt)? {
            return Ok(RetryOutcome::Succeeded {
                value,
                attempts: attempt,
            });
        }

        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            return Ok(RetryOutcome::Exhausted { attempts: attempt });
        }

        pacer.pause(policy.backoff)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacer::StopSignal;

    #[test]
    fn test_succeeds_on_first_attempt() {
        let outcome: Result<_, Interrupted> =
            with_retries(RetryPolicy::bounded(3, Duration::ZERO), &Pacer::default(), |n| {
                Ok(Attempt::Done(n * 10))
            });
        assert_eq!(
            outcome.unwrap(),
            RetryOutcome::Succeeded {
                value: 10,
                attempts: 1
            }
        );
    }

    #[test]
    fn test_exhausts_after_bound() {
        let mut calls = Vec::new();
        let outcome: Result<RetryOutcome<()>, Interrupted> =
            with_retries(RetryPolicy::bounded(3, Duration::ZERO), &Pacer::default(), |n| {
                calls.push(n);
                Ok(Attempt::Retry)
            });
        assert_eq!(outcome.unwrap(), RetryOutcome::Exhausted { attempts: 3 });
        assert_eq!(calls, vec![1, 2, 3]);
    }

    #[test]
    fn test_unbounded_runs_until_done() {
        let outcome: Result<_, Interrupted> =
            with_retries(RetryPolicy::unbounded(Duration::ZERO), &Pacer::default(), |n| {
                Ok(if n == 7 { Attempt::Done("ok") } else { Attempt::Retry })
            });
        assert_eq!(outcome.unwrap().attempts(), 7);
    }

    #[test]
    fn test_stop_signal_interrupts_unbounded_loop() {
        let stop = StopSignal::new();
        let pacer = Pacer::new(stop.clone());
        let outcome: Result<RetryOutcome<()>, Interrupted> =
            with_retries(RetryPolicy::unbounded(Duration::ZERO), &pacer, |n| {
                if n == 4 {
                    stop.trigger();
                }
                Ok(Attempt::Retry)
            });
        assert_eq!(outcome, Err(Interrupted));
    }
}
