//! # quizpilot-proto
//!
//! Shared types, error definitions, and traits for the quizpilot engine.
//!
//! This crate provides the foundational abstractions used across all quizpilot
//! crates, including:
//! - `QuestionView` snapshots and the option `Letter` alphabet
//! - Tagged results for observation, probing, and submission
//! - The collaborator traits (`ScreenProbe`, `ContentExtractor`, `Actuator`)
//!   through which the engine drives an external UI
//! - Common error types

mod collaborator;
mod error;
mod letter;
mod outcome;
mod view;

pub use collaborator::{Actuator, ContentExtractor, Marker, Point, ScreenProbe, ScrollDirection};
pub use error::{Error, Result};
pub use letter::Letter;
pub use outcome::{ObservationOutcome, ProbeResult, SubmitResult};
pub use view::{QuestionKind, QuestionView};
