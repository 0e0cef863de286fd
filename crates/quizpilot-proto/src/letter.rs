//! Option letters.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single option label such as `A` or `D`.
///
/// Ordering is alphabetical, which is the order the enumerator walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Letter(char);

impl Letter {
    /// Creates a letter, rejecting anything but `A`..=`Z`.
    pub fn new(c: char) -> Result<Self, Error> {
        if c.is_ascii_uppercase() {
            Ok(Self(c))
        } else {
            Err(Error::InvalidLetter(c.to_string()))
        }
    }

    /// Returns the underlying character.
    pub fn as_char(self) -> char {
        self.0
    }

    /// Parses every character of `s` as a letter (e.g. `"ABCD"`).
    pub fn parse_all(s: &str) -> Result<Vec<Self>, Error> {
        s.chars().map(Self::new).collect()
    }
}

impl FromStr for Letter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::new(c.to_ascii_uppercase()),
            _ => Err(Error::InvalidLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for Letter {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Letter> for String {
    fn from(letter: Letter) -> Self {
        letter.0.to_string()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
