//! Error types shared across quizpilot crates.

/// Errors raised while constructing protocol values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// An option letter outside the `A`..=`Z` alphabet.
    #[error("invalid option letter {0:?}: expected a single uppercase ASCII letter")]
    InvalidLetter(String),

    /// A view whose selection references letters it does not offer.
    #[error("view for {identity:?} selects {letter} which is not among its options")]
    SelectionOutsideOptions { identity: String, letter: crate::Letter },

    /// A view without question text.
    #[error("view has an empty identity")]
    EmptyIdentity,
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
