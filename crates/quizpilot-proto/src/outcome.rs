//! Tagged results exchanged between the engine and its collaborators.

use crate::QuestionView;

/// What the content extractor made of the latest raw observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationOutcome {
    /// A question was recognised.
    Parsed(QuestionView),
    /// Nothing usable was on screen (loading, finished, or garbled).
    Unparseable,
}

impl ObservationOutcome {
    /// Returns the identity of the parsed view, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Parsed(view) => Some(view.identity.as_str()),
            Self::Unparseable => None,
        }
    }
}

/// Whether a visual marker was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult<T> {
    Found(T),
    NotFound,
}

impl<T> ProbeResult<T> {
    /// Converts to an `Option`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl<T> From<Option<T>> for ProbeResult<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// The oracle's verdict on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    /// A different question is now displayed: the hypothesis was correct.
    Advanced,
    /// The same question (or nothing readable) is displayed.
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuestionKind;

    #[test]
    fn test_probe_result_from_option() {
        assert_eq!(ProbeResult::from(Some(3)), ProbeResult::Found(3));
        assert_eq!(ProbeResult::<u8>::from(None), ProbeResult::NotFound);
    }

    #[test]
    fn test_observation_identity() {
        let parsed = ObservationOutcome::Parsed(QuestionView::new("Q7", QuestionKind::Single));
        assert_eq!(parsed.identity(), Some("Q7"));
        assert_eq!(ObservationOutcome::Unparseable.identity(), None);
    }
}
