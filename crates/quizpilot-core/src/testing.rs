//! A scripted stand-in for the quiz UI.
//!
//! `SimulatedQuiz` plays a [`QuizScript`] behind the three collaborator
//! traits so the whole engine can run without a screen. It is deterministic
//! and records every click, scroll, and submission for assertions.
//!
//! Layout: option `A` sits at (100, 100), each following letter 60 px lower,
//! and submit at (100, 900). Rules of the simulated UI:
//!
//! - clicking an option of a single-choice question selects only it; on a
//!   multiple-choice question it toggles
//! - clicking submit with a non-empty selection submits it; the right answer
//!   advances to the next question, a wrong one clears the selection
//! - clicking submit with nothing selected does nothing (window activation)
//! - after the last question the `finale` identity is shown, if any, else
//!   nothing is readable

use crate::pacer::StopSignal;
use crate::station::Station;
use quizpilot_proto::{
    Actuator, ContentExtractor, Letter, Marker, ObservationOutcome, Point, ProbeResult,
    QuestionKind, QuestionView, ScreenProbe, ScrollDirection,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Position of the simulated submit control.
pub const SUBMIT_POINT: Point = Point { x: 100, y: 900 };

/// Position of the simulated option `letter`.
pub fn option_point(letter: Letter) -> Point {
    let index = i32::from(letter.as_char() as u8 - b'A');
    Point::new(100, 100 + 60 * index)
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read quiz script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid quiz script: {0}")]
    Json(#[from] serde_json::Error),
}

/// One question of a script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptedQuestion {
    pub identity: String,
    pub kind: QuestionKind,
    pub options: BTreeMap<Letter, String>,
    pub answer: BTreeSet<Letter>,
    /// Options whose marker the probe cannot see.
    #[serde(default)]
    pub hidden: BTreeSet<Letter>,
}

impl ScriptedQuestion {
    fn view(&self, selected: &BTreeSet<Letter>) -> QuestionView {
        QuestionView {
            identity: self.identity.clone(),
            kind: self.kind,
            options: self.options.clone(),
            selected: selected.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A quiz and the quirks of the UI presenting it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuizScript {
    pub questions: Vec<ScriptedQuestion>,

    /// Whether observations carry the real selection.
    #[serde(default = "default_true")]
    pub reports_selection: bool,

    /// The first N option clicks are ignored.
    #[serde(default)]
    pub dropped_clicks: u32,

    /// Submit is only visible after this many scrolls on each question.
    #[serde(default)]
    pub submit_hidden_scrolls: u32,

    /// Identity shown once every question is answered.
    #[serde(default)]
    pub finale: Option<String>,

    /// Raise the stop signal after this many submissions.
    #[serde(default)]
    pub abort_after_submissions: Option<usize>,

    /// Reads that come back unreadable right after each accepted submission.
    #[serde(default)]
    pub unreadable_after_advance: u32,
}

impl QuizScript {
    pub fn from_json(content: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let content = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }
}

/// One submitted selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub identity: String,
    pub selection: BTreeSet<Letter>,
    pub accepted: bool,
}

impl Submission {
    /// The selection as letters, e.g. `BD`.
    pub fn letters(&self) -> String {
        self.selection.iter().map(|l| l.as_char()).collect()
    }
}

#[derive(Debug)]
struct QuizState {
    script: QuizScript,
    current: usize,
    selected: BTreeSet<Letter>,
    scrolls_on_question: u32,
    drops_left: u32,
    unreadable_left: u32,
    clicks: Vec<Point>,
    scrolls: Vec<ScrollDirection>,
    submissions: Vec<Submission>,
    stop: Option<StopSignal>,
}

impl QuizState {
    fn question(&self) -> Option<&ScriptedQuestion> {
        self.script.questions.get(self.current)
    }

    fn submit_visible(&self) -> bool {
        self.question().is_some() && self.scrolls_on_question >= self.script.submit_hidden_scrolls
    }

    fn locate(&self, marker: Marker) -> ProbeResult<Point> {
        match marker {
            Marker::Submit if self.submit_visible() => ProbeResult::Found(SUBMIT_POINT),
            Marker::Option(letter)
                if self
                    .question()
                    .is_some_and(|q| q.options.contains_key(&letter) && !q.hidden.contains(&letter)) =>
            {
                ProbeResult::Found(option_point(letter))
            }
            _ => ProbeResult::NotFound,
        }
    }

    fn observe(&mut self) -> ObservationOutcome {
        if self.unreadable_left > 0 {
            self.unreadable_left -= 1;
            debug!("Simulated UI returned an unreadable frame");
            return ObservationOutcome::Unparseable;
        }
        match self.question() {
            Some(question) if self.script.reports_selection => {
                ObservationOutcome::Parsed(question.view(&self.selected))
            }
            Some(question) => ObservationOutcome::Parsed(question.view(&BTreeSet::new())),
            None => match &self.script.finale {
                Some(finale) => {
                    ObservationOutcome::Parsed(QuestionView::new(finale.clone(), QuestionKind::Single))
                }
                None => ObservationOutcome::Unparseable,
            },
        }
    }

    fn click(&mut self, at: Point) {
        self.clicks.push(at);
        let Some(question) = self.question() else {
            return;
        };

        if at == SUBMIT_POINT {
            if self.submit_visible() && !self.selected.is_empty() {
                self.submit();
            }
            return;
        }

        let Some(letter) = question
            .options
            .keys()
            .copied()
            .find(|&letter| option_point(letter) == at)
        else {
            return;
        };
        let kind = question.kind;

        if self.drops_left > 0 {
            self.drops_left -= 1;
            debug!(letter = %letter, "Simulated UI dropped a click");
            return;
        }

        match kind {
            QuestionKind::Single => {
                self.selected = BTreeSet::from([letter]);
            }
            QuestionKind::Multiple => {
                if !self.selected.remove(&letter) {
                    self.selected.insert(letter);
                }
            }
        }
    }

    fn submit(&mut self) {
        let Some(question) = self.question() else {
            return;
        };
        let accepted = self.selected == question.answer;
        let identity = question.identity.clone();

        self.submissions.push(Submission {
            identity,
            selection: std::mem::take(&mut self.selected),
            accepted,
        });

        if accepted {
            self.current += 1;
            self.scrolls_on_question = 0;
            self.unreadable_left = self.script.unreadable_after_advance;
        }

        if let (Some(limit), Some(stop)) = (self.script.abort_after_submissions, &self.stop)
            && self.submissions.len() >= limit
        {
            stop.trigger();
        }
    }

    fn scroll(&mut self, direction: ScrollDirection) {
        self.scrolls.push(direction);
        if direction == ScrollDirection::Down {
            self.scrolls_on_question += 1;
        }
    }
}

/// A deterministic quiz UI driven by a [`QuizScript`].
#[derive(Debug, Clone)]
pub struct SimulatedQuiz {
    state: Arc<Mutex<QuizState>>,
}

impl SimulatedQuiz {
    pub fn new(script: QuizScript) -> Self {
        let drops_left = script.dropped_clicks;
        Self {
            state: Arc::new(Mutex::new(QuizState {
                script,
                current: 0,
                selected: BTreeSet::new(),
                scrolls_on_question: 0,
                drops_left,
                unreadable_left: 0,
                clicks: Vec::new(),
                scrolls: Vec::new(),
                submissions: Vec::new(),
                stop: None,
            })),
        }
    }

    /// Raises `stop` once `abort_after_submissions` is reached.
    #[must_use]
    pub fn with_stop_signal(self, stop: StopSignal) -> Self {
        self.lock().stop = Some(stop);
        self
    }

    fn lock(&self) -> MutexGuard<'_, QuizState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Collaborators wired to this quiz.
    pub fn station(&self) -> Station {
        Station::new(
            Box::new(SimProbe(self.clone())),
            Box::new(SimExtractor(self.clone())),
            Box::new(SimActuator(self.clone())),
        )
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.lock().clicks.clone()
    }

    pub fn scrolls(&self) -> Vec<ScrollDirection> {
        self.lock().scrolls.clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    /// Index of the question on screen; equals the question count at the end.
    pub fn current_index(&self) -> usize {
        self.lock().current
    }

    /// Current on-screen view, ignoring `reports_selection`.
    pub fn view(&self) -> Option<QuestionView> {
        let state = self.lock();
        state.question().map(|q| q.view(&state.selected))
    }
}

struct SimProbe(SimulatedQuiz);

impl ScreenProbe for SimProbe {
    fn locate(&mut self, marker: Marker) -> ProbeResult<Point> {
        self.0.lock().locate(marker)
    }
}

struct SimExtractor(SimulatedQuiz);

impl ContentExtractor for SimExtractor {
    fn observe(&mut self) -> ObservationOutcome {
        self.0.lock().observe()
    }

    fn reports_selection(&self) -> bool {
        self.0.lock().script.reports_selection
    }
}

struct SimActuator(SimulatedQuiz);

impl Actuator for SimActuator {
    fn click(&mut self, at: Point) {
        self.0.lock().click(at);
    }

    fn scroll(&mut self, direction: ScrollDirection) {
        self.0.lock().scroll(direction);
    }
}
