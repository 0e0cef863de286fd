//! Collaborator traits for the external UI.
//!
//! The engine never captures frames, parses markup, or injects input itself.
//! Those concerns live behind these traits so that a screen/clipboard
//! implementation and a scripted simulator are interchangeable.

use crate::{Letter, ObservationOutcome, ProbeResult};
use std::fmt;

/// A position inside the observed screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A named visual marker the probe can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// The clickable label of one option.
    Option(Letter),
    /// The submit control.
    Submit,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Option(letter) => write!(f, "option {letter}"),
            Marker::Submit => write!(f, "submit"),
        }
    }
}

/// Direction of a scroll gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Locates visual markers in a freshly captured frame.
pub trait ScreenProbe: Send {
    /// Looks for `marker` and reports its position if visible.
    fn locate(&mut self, marker: Marker) -> ProbeResult<Point>;
}

/// Turns the current raw observation into a `QuestionView`.
pub trait ContentExtractor: Send {
    /// Observes the UI once.
    fn observe(&mut self) -> ObservationOutcome;

    /// Whether `QuestionView::selected` reflects the real selection state.
    ///
    /// When false, selection verification degrades to trusting the clicks.
    fn reports_selection(&self) -> bool {
        true
    }
}

/// Performs input on the UI.
pub trait Actuator: Send {
    /// Clicks at `at`.
    fn click(&mut self, at: Point);

    /// Performs one scroll gesture.
    fn scroll(&mut self, direction: ScrollDirection);
}
