//! Snapshots of the currently displayed question.

use crate::{Error, Letter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Whether a question accepts one or several options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Exactly one option is correct.
    Single,
    /// Two or more options are usually correct.
    Multiple,
}

/// A snapshot of the question currently shown by the UI.
///
/// Two views with the same `identity` are the same question, regardless of
/// option order or whether the content came from markup or an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    /// Canonical question text.
    pub identity: String,

    /// Selection cardinality of the question.
    pub kind: QuestionKind,

    /// Option letter to opaque content (text or image reference).
    #[serde(default)]
    pub options: BTreeMap<Letter, String>,

    /// Letters the UI currently shows as active.
    ///
    /// Empty when the extractor cannot report selection state.
    #[serde(default)]
    pub selected: BTreeSet<Letter>,
}

impl QuestionView {
    /// Creates a view with no options and nothing selected.
    pub fn new(identity: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            identity: identity.into(),
            kind,
            options: BTreeMap::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Adds an option.
    #[must_use]
    pub fn with_option(mut self, letter: Letter, content: impl Into<String>) -> Self {
        self.options.insert(letter, content.into());
        self
    }

    /// Replaces the reported selection.
    #[must_use]
    pub fn with_selected(mut self, selected: impl IntoIterator<Item = Letter>) -> Self {
        self.selected = selected.into_iter().collect();
        self
    }

    /// Checks the view's invariants: non-empty identity and
    /// `selected ⊆ keys(options)`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.identity.trim().is_empty() {
            return Err(Error::EmptyIdentity);
        }
        if let Some(letter) = self.selected.iter().find(|&&l| !self.options.contains_key(&l)) {
            return Err(Error::SelectionOutsideOptions {
                identity: self.identity.clone(),
                letter: *letter,
            });
        }
        Ok(())
    }

    /// Offered option letters in alphabetical order.
    pub fn letters(&self) -> impl Iterator<Item = Letter> + '_ {
        self.options.keys().copied()
    }

    /// The order-independent set of option contents.
    pub fn option_contents(&self) -> BTreeSet<String> {
        self.options.values().cloned().collect()
    }

    /// Contents of the given letters; letters not offered are skipped.
    pub fn contents_of<'a>(&self, letters: impl IntoIterator<Item = &'a Letter>) -> BTreeSet<String> {
        letters
            .into_iter()
            .filter_map(|letter| self.options.get(letter).cloned())
            .collect()
    }
}
