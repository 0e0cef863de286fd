//! Hypothesis enumerator.
//!
//! Yields candidate option subsets lazily, by increasing size and in
//! lexicographic combination order within a size:
//!
//! - single-choice: every letter on its own
//! - multiple-choice: sizes 2 through all letters (size 1 only when a
//!   single letter is visible)
//!
//! The order depends only on the visible letter set, so runs are reproducible.

use quizpilot_proto::{Letter, QuestionKind};
use std::collections::BTreeSet;

/// Lazy, finite, restartable sequence of candidate selections.
#[derive(Debug, Clone)]
pub struct Hypotheses {
    letters: Vec<Letter>,
    min_size: usize,
    max_size: usize,
    /// Indices into `letters` of the next combination to yield.
    cursor: Option<Vec<usize>>,
}

impl Hypotheses {
    /// Enumerates candidates over `visible` letters for a question of `kind`.
    pub fn new(kind: QuestionKind, visible: impl IntoIterator<Item = Letter>) -> Self {
        let letters: Vec<Letter> = visible
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let n = letters.len();

        let (min_size, max_size) = match kind {
            QuestionKind::Single => (1, n.min(1)),
            QuestionKind::Multiple if n > 1 => (2, n),
            QuestionKind::Multiple => (1, n),
        };

        let mut hypotheses = Self {
            letters,
            min_size,
            max_size,
            cursor: None,
        };
        hypotheses.restart();
        hypotheses
    }

    /// Rewinds to the first candidate.
    pub fn restart(&mut self) {
        self.cursor = (self.min_size <= self.max_size).then(|| (0..self.min_size).collect());
    }

    /// Total number of candidates in one full pass.
    pub fn total(&self) -> usize {
        let n = self.letters.len();
        (self.min_size..=self.max_size)
            .map(|k| binomial(n, k))
            .sum()
    }

    /// Moves `indices` to the next combination, growing the size when the
    /// current size is exhausted.
    fn advance(&self, mut indices: Vec<usize>) -> Option<Vec<usize>> {
        let n = self.letters.len();
        let k = indices.len();

        for i in (0..k).rev() {
            if indices[i] < n - k + i {
                indices[i] += 1;
                for j in i + 1..k {
                    indices[j] = indices[j - 1] + 1;
                }
                return Some(indices);
            }
        }

        let next_size = k + 1;
        (next_size <= self.max_size).then(|| (0..next_size).collect())
    }
}

impl Iterator for Hypotheses {
    type Item = BTreeSet<Letter>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor.take()?;
        let candidate = current.iter().map(|&i| self.letters[i]).collect();
        self.cursor = self.advance(current);
        Some(candidate)
    }
}

fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> Vec<Letter> {
        Letter::parse_all(s).unwrap()
    }

    fn render(hypotheses: Hypotheses) -> Vec<String> {
        hypotheses
            .map(|set| set.iter().map(|l| l.as_char()).collect())
            .collect()
    }

    #[test]
    fn test_single_choice_yields_each_letter() {
        let got = render(Hypotheses::new(QuestionKind::Single, letters("DBCA")));
        assert_eq!(got, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_multiple_choice_starts_at_pairs() {
        let got = render(Hypotheses::new(QuestionKind::Multiple, letters("ABCD")));
        assert_eq!(
            got,
            vec![
                "AB", "AC", "AD", "BC", "BD", "CD", "ABC", "ABD", "ACD", "BCD", "ABCD"
            ]
        );
    }

    #[test]
    fn test_multiple_choice_with_single_visible_letter() {
        let got = render(Hypotheses::new(QuestionKind::Multiple, letters("C")));
        assert_eq!(got, vec!["C"]);
    }

    #[test]
    fn test_no_visible_letters_yields_nothing() {
        assert_eq!(Hypotheses::new(QuestionKind::Single, Vec::new()).count(), 0);
        assert_eq!(Hypotheses::new(QuestionKind::Multiple, Vec::new()).count(), 0);
    }

    #[test]
    fn test_each_subset_exactly_once() {
        for n in 1..=6 {
            let alphabet: String = "ABCDEF".chars().take(n).collect();
            for kind in [QuestionKind::Single, QuestionKind::Multiple] {
                let hypotheses = Hypotheses::new(kind, letters(&alphabet));
                let total = hypotheses.total();
                let all: Vec<_> = hypotheses.collect();
                let unique: BTreeSet<_> = all.iter().cloned().collect();

                assert_eq!(all.len(), total, "n={n} kind={kind:?}");
                assert_eq!(unique.len(), all.len(), "n={n} kind={kind:?}");

                let expected = match kind {
                    QuestionKind::Single => n,
                    QuestionKind::Multiple if n > 1 => (1 << n) - 1 - n,
                    QuestionKind::Multiple => 1,
                };
                assert_eq!(total, expected, "n={n} kind={kind:?}");
            }
        }
    }

    #[test]
    fn test_duplicate_letters_are_ignored() {
        let got = render(Hypotheses::new(QuestionKind::Single, letters("AAB")));
        assert_eq!(got, vec!["A", "B"]);
    }

    #[test]
    fn test_restart_reproduces_sequence() {
        let mut hypotheses = Hypotheses::new(QuestionKind::Multiple, letters("ABC"));
        let first: Vec<_> = hypotheses.by_ref().collect();
        assert!(hypotheses.next().is_none());

        hypotheses.restart();
        let second: Vec<_> = hypotheses.collect();
        assert_eq!(first, second);
    }
}
