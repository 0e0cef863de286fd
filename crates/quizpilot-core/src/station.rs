//! The engine's handle on the external UI.
//!
//! A `Station` bundles the three collaborators and adds the small composite
//! primitives every component needs: click-then-settle, locating the submit
//! control with scrolling, and submit-then-observe.

use crate::config::EngineConfig;
use crate::pacer::{Interrupted, Pacer};
use crate::retry::{Attempt, RetryOutcome, RetryPolicy, with_retries};
use quizpilot_proto::{
    Actuator, ContentExtractor, Letter, Marker, ObservationOutcome, Point, ProbeResult,
    QuestionView, ScreenProbe, ScrollDirection, SubmitResult,
};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Screen positions acquired while probing a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub submit: Point,
    /// Visible option letters and where to click them.
    pub options: BTreeMap<Letter, Point>,
}

/// Why probing a question did not produce usable targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The submit control was not found, even after scrolling.
    SubmitNotFound { scrolls: u32 },
    /// None of the view's option letters were found.
    NoVisibleOptions,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitNotFound { scrolls } => {
                write!(f, "submit control not found after {scrolls} scroll(s)")
            }
            Self::NoVisibleOptions => write!(f, "no option markers visible"),
        }
    }
}

/// The three UI collaborators, owned together by the run.
pub struct Station {
    probe: Box<dyn ScreenProbe>,
    extractor: Box<dyn ContentExtractor>,
    actuator: Box<dyn Actuator>,
}

impl Station {
    pub fn new(
        probe: Box<dyn ScreenProbe>,
        extractor: Box<dyn ContentExtractor>,
        actuator: Box<dyn Actuator>,
    ) -> Self {
        Self {
            probe,
            extractor,
            actuator,
        }
    }

    /// Observes the UI, discarding views that break their own invariants.
    pub fn observe(&mut self) -> ObservationOutcome {
        match self.extractor.observe() {
            ObservationOutcome::Parsed(view) => match view.validate() {
                Ok(()) => ObservationOutcome::Parsed(view),
                Err(e) => {
                    warn!("Discarding inconsistent observation: {}", e);
                    ObservationOutcome::Unparseable
                }
            },
            ObservationOutcome::Unparseable => ObservationOutcome::Unparseable,
        }
    }

    /// Whether observed views carry real selection state.
    pub fn reports_selection(&self) -> bool {
        self.extractor.reports_selection()
    }

    pub fn locate(&mut self, marker: Marker) -> ProbeResult<Point> {
        self.probe.locate(marker)
    }

    /// Clicks and waits for the UI to settle.
    pub fn click(&mut self, at: Point, pacer: &Pacer, settle: Duration) -> Result<(), Interrupted> {
        pacer.checkpoint()?;
        self.actuator.click(at);
        pacer.pause(settle)
    }

    /// Scrolls and waits for the UI to settle.
    pub fn scroll(
        &mut self,
        direction: ScrollDirection,
        pacer: &Pacer,
        settle: Duration,
    ) -> Result<(), Interrupted> {
        pacer.checkpoint()?;
        self.actuator.scroll(direction);
        pacer.pause(settle)
    }

    /// Looks for the submit control, scrolling down between looks.
    pub fn find_submit(
        &mut self,
        pacer: &Pacer,
        max_scrolls: u32,
        post_scroll: Duration,
    ) -> Result<ProbeResult<Point>, Interrupted> {
        let outcome = with_retries(
            RetryPolicy::bounded(max_scrolls + 1, Duration::ZERO),
            pacer,
            |attempt| {
                if attempt > 1 {
                    debug!(scroll = attempt - 1, "Submit control not visible, scrolling");
                    self.scroll(ScrollDirection::Down, pacer, post_scroll)?;
                }
                Ok::<_, Interrupted>(match self.locate(Marker::Submit) {
                    ProbeResult::Found(point) => Attempt::Done(point),
                    ProbeResult::NotFound => Attempt::Retry,
                })
            },
        )?;

        if let RetryOutcome::Succeeded { attempts, .. } = outcome
            && attempts > 1
        {
            info!(scrolls = attempts - 1, "Found submit control after scrolling");
        }
        Ok(outcome.value().into())
    }

    /// Re-acquires the submit control and the visible options for `view`.
    pub fn acquire_targets(
        &mut self,
        view: &QuestionView,
        config: &EngineConfig,
        pacer: &Pacer,
    ) -> Result<Result<Targets, ProbeFailure>, Interrupted> {
        let max_scrolls = config.retries.max_scroll_attempts;
        let submit = match self.find_submit(pacer, max_scrolls, config.delays.post_scroll())? {
            ProbeResult::Found(point) => point,
            ProbeResult::NotFound => {
                return Ok(Err(ProbeFailure::SubmitNotFound {
                    scrolls: max_scrolls,
                }));
            }
        };

        let options: BTreeMap<Letter, Point> = view
            .letters()
            .filter_map(|letter| {
                self.locate(Marker::Option(letter))
                    .found()
                    .map(|point| (letter, point))
            })
            .collect();

        if options.is_empty() {
            return Ok(Err(ProbeFailure::NoVisibleOptions));
        }

        debug!(
            submit = %submit,
            visible = ?options.keys().collect::<Vec<_>>(),
            "Acquired targets"
        );
        Ok(Ok(Targets { submit, options }))
    }

    /// Clicks submit, waits `settle`, and reports whether the question changed.
    ///
    /// An unreadable post-submit observation counts as unchanged.
    pub fn submit(
        &mut self,
        submit: Point,
        before_identity: &str,
        pacer: &Pacer,
        settle: Duration,
    ) -> Result<SubmitResult, Interrupted> {
        self.click(submit, pacer, settle)?;
        match self.observe() {
            ObservationOutcome::Parsed(view) if view.identity != before_identity => {
                debug!(next = %view.identity, "Question advanced after submit");
                Ok(SubmitResult::Advanced)
            }
            _ => Ok(SubmitResult::Unchanged),
        }
    }
}
