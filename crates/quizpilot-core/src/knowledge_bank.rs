//! Knowledge bank: question identity to previously confirmed answers.
//!
//! Each identity owns a list of [`Variant`]s, one per distinct set of option
//! contents (the fingerprint). A variant is only reused against a view whose
//! option contents are exactly its fingerprint, because the content-to-letter
//! mapping depends on the exact presentation.
//!
//! On disk the bank is a JSON object:
//!
//! ```text
//! {
//!   "Which colours are primary?": [
//!     { "options": ["blue", "green", "red", "violet"], "answer": ["blue", "red"] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A variant that would break the bank's invariants.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VariantError {
    #[error("variant has no answer contents")]
    EmptyAnswer,

    #[error("answer {0:?} is not among the variant's options")]
    AnswerOutsideOptions(String),
}

/// Errors raised while reading or writing a bank file.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("failed to access bank file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed bank content: {0}")]
    Json(#[from] serde_json::Error),
}

/// One confirmed answer for a specific presentation of a question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawVariant")]
pub struct Variant {
    #[serde(rename = "options")]
    option_contents: BTreeSet<String>,
    #[serde(rename = "answer")]
    answer_contents: BTreeSet<String>,
}

/// Accepts both the short on-disk keys and their long spellings.
#[derive(Deserialize)]
struct RawVariant {
    #[serde(alias = "optionContents")]
    options: Vec<String>,
    #[serde(alias = "answerContents")]
    answer: Vec<String>,
}

impl TryFrom<RawVariant> for Variant {
    type Error = VariantError;

    fn try_from(raw: RawVariant) -> Result<Self, Self::Error> {
        Variant::new(raw.options, raw.answer)
    }
}

impl Variant {
    /// Creates a variant, enforcing `answer ⊆ options` and a non-empty answer.
    pub fn new(
        option_contents: impl IntoIterator<Item = String>,
        answer_contents: impl IntoIterator<Item = String>,
    ) -> Result<Self, VariantError> {
        let option_contents: BTreeSet<String> = option_contents.into_iter().collect();
        let answer_contents: BTreeSet<String> = answer_contents.into_iter().collect();

        if answer_contents.is_empty() {
            return Err(VariantError::EmptyAnswer);
        }
        if let Some(stray) = answer_contents.iter().find(|a| !option_contents.contains(*a)) {
            return Err(VariantError::AnswerOutsideOptions(stray.clone()));
        }

        Ok(Self {
            option_contents,
            answer_contents,
        })
    }

    /// The fingerprint: every option content present when this was solved.
    pub fn option_contents(&self) -> &BTreeSet<String> {
        &self.option_contents
    }

    /// The confirmed-correct subset of the option contents.
    pub fn answer_contents(&self) -> &BTreeSet<String> {
        &self.answer_contents
    }
}

/// Counts produced by [`KnowledgeBank::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Fingerprints that were new to the receiving bank.
    pub inserted: usize,
    /// Fingerprints whose answer was overwritten with a different one.
    pub replaced: usize,
    /// Fingerprints already present with the same answer.
    pub unchanged: usize,
}

/// Mapping from question identity to its variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<Variant>>", into = "BTreeMap<String, Vec<Variant>>")]
pub struct KnowledgeBank {
    entries: BTreeMap<String, Vec<Variant>>,
}

impl From<BTreeMap<String, Vec<Variant>>> for KnowledgeBank {
    /// Deduplicates by fingerprint; later list entries win.
    fn from(raw: BTreeMap<String, Vec<Variant>>) -> Self {
        let mut bank = Self::new();
        for (identity, variants) in raw {
            for variant in variants {
                bank.record(&identity, variant);
            }
        }
        bank
    }
}

impl From<KnowledgeBank> for BTreeMap<String, Vec<Variant>> {
    fn from(bank: KnowledgeBank) -> Self {
        bank.entries
    }
}

impl KnowledgeBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variant recorded for exactly this set of option contents.
    pub fn lookup(&self, identity: &str, option_contents: &BTreeSet<String>) -> Option<&Variant> {
        self.entries
            .get(identity)?
            .iter()
            .find(|variant| variant.option_contents == *option_contents)
    }

    /// Inserts or overwrites the variant keyed by `(identity, fingerprint)`.
    ///
    /// Returns the variant that was replaced, if any.
    pub fn record(&mut self, identity: &str, variant: Variant) -> Option<Variant> {
        let variants = self.entries.entry(identity.to_string()).or_default();
        match variants
            .iter_mut()
            .find(|existing| existing.option_contents == variant.option_contents)
        {
            Some(existing) => Some(std::mem::replace(existing, variant)),
            None => {
                variants.push(variant);
                None
            }
        }
    }

    /// Folds `other` into this bank, fingerprint by fingerprint.
    ///
    /// Conflicting answers for the same fingerprint resolve to `other`'s, so
    /// sources must be merged oldest first for corrections to win.
    pub fn merge(&mut self, other: &KnowledgeBank) -> MergeStats {
        let mut stats = MergeStats::default();
        for (identity, variants) in &other.entries {
            for variant in variants {
                match self.record(identity, variant.clone()) {
                    None => stats.inserted += 1,
                    Some(previous) if previous == *variant => stats.unchanged += 1,
                    Some(previous) => {
                        debug!(
                            identity = %identity,
                            old = ?previous.answer_contents,
                            new = ?variant.answer_contents,
                            "Merged variant overrides earlier answer"
                        );
                        stats.replaced += 1;
                    }
                }
            }
        }
        stats
    }

    /// Variants recorded for `identity`.
    pub fn variants(&self, identity: &str) -> &[Variant] {
        self.entries.get(identity).map_or(&[], Vec::as_slice)
    }

    /// Known question identities in sorted order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of distinct question identities.
    pub fn question_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of variants across all identities.
    pub fn variant_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes to the human-inspectable JSON form.
    pub fn to_json(&self) -> Result<String, BankError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses the JSON form.
    pub fn from_json(content: &str) -> Result<Self, BankError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reads a bank file; a missing file is an empty bank.
    pub fn load(path: &Path) -> Result<Self, BankError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(BankError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the bank, replacing the file atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<(), BankError> {
        let io_err = |source| BankError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn variant(options: &[&str], answer: &[&str]) -> Variant {
        Variant::new(strings(options), strings(answer)).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        strings(items).into_iter().collect()
    }

    #[test]
    fn test_variant_rejects_empty_answer() {
        assert_eq!(
            Variant::new(strings(&["a", "b"]), Vec::new()),
            Err(VariantError::EmptyAnswer)
        );
    }

    #[test]
    fn test_variant_rejects_answer_outside_options() {
        assert_eq!(
            Variant::new(strings(&["a", "b"]), strings(&["c"])),
            Err(VariantError::AnswerOutsideOptions("c".to_string()))
        );
    }

    #[test]
    fn test_lookup_requires_exact_fingerprint() {
        let mut bank = KnowledgeBank::new();
        bank.record("Q1", variant(&["a", "b", "c", "d"], &["b"]));

        assert!(bank.lookup("Q1", &set(&["d", "c", "b", "a"])).is_some());
        assert!(bank.lookup("Q1", &set(&["a", "b", "c"])).is_none());
        assert!(bank.lookup("Q1", &set(&["a", "b", "c", "d", "e"])).is_none());
        assert!(bank.lookup("Q2", &set(&["a", "b", "c", "d"])).is_none());
    }

    #[test]
    fn test_record_overwrites_same_fingerprint() {
        let mut bank = KnowledgeBank::new();
        assert!(bank.record("Q1", variant(&["a", "b"], &["a"])).is_none());
        let replaced = bank.record("Q1", variant(&["b", "a"], &["b"]));

        assert_eq!(replaced, Some(variant(&["a", "b"], &["a"])));
        assert_eq!(bank.variant_count(), 1);
        assert_eq!(
            bank.lookup("Q1", &set(&["a", "b"])).unwrap().answer_contents(),
            &set(&["b"])
        );
    }

    #[test]
    fn test_record_keeps_distinct_fingerprints() {
        let mut bank = KnowledgeBank::new();
        bank.record("Q1", variant(&["a", "b"], &["a"]));
        bank.record("Q1", variant(&["a", "c"], &["c"]));

        assert_eq!(bank.question_count(), 1);
        assert_eq!(bank.variants("Q1").len(), 2);
    }

    #[test]
    fn test_round_trip_empty_bank() {
        let bank = KnowledgeBank::new();
        let json = bank.to_json().unwrap();
        assert_eq!(KnowledgeBank::from_json(&json).unwrap(), bank);
    }

    #[test]
    fn test_round_trip_multi_variant_bank() {
        let mut bank = KnowledgeBank::new();
        bank.record("Q1", variant(&["a", "b", "c", "d"], &["b", "d"]));
        bank.record("Q1", variant(&["a", "b", "c", "e"], &["e"]));
        bank.record("Q2", variant(&["x", "y"], &["x"]));

        let json = bank.to_json().unwrap();
        let restored = KnowledgeBank::from_json(&json).unwrap();

        assert_eq!(restored, bank);
        assert_eq!(restored.variants("Q1").len(), 2);
    }

    #[test]
    fn test_deserialize_accepts_long_keys() {
        let json = r#"{"Q1": [{"optionContents": ["a", "b"], "answerContents": ["a"]}]}"#;
        let bank = KnowledgeBank::from_json(json).unwrap();
        assert_eq!(bank.variant_count(), 1);
    }

    #[test]
    fn test_deserialize_dedups_fingerprints_last_wins() {
        let json = r#"{"Q1": [
            {"options": ["a", "b"], "answer": ["a"]},
            {"options": ["b", "a"], "answer": ["b"]}
        ]}"#;
        let bank = KnowledgeBank::from_json(json).unwrap();
        assert_eq!(bank.variant_count(), 1);
        assert_eq!(bank.variants("Q1")[0].answer_contents(), &set(&["b"]));
    }

    #[test]
    fn test_deserialize_rejects_invariant_violation() {
        let json = r#"{"Q1": [{"options": ["a"], "answer": ["z"]}]}"#;
        assert!(KnowledgeBank::from_json(json).is_err());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut bank = KnowledgeBank::new();
        bank.record("Q1", variant(&["a", "b"], &["a"]));
        bank.record("Q2", variant(&["x", "y", "z"], &["y", "z"]));

        let snapshot = bank.clone();
        let stats = bank.merge(&snapshot);

        assert_eq!(bank, snapshot);
        assert_eq!(stats.unchanged, 2);
        assert_eq!(stats.inserted + stats.replaced, 0);
    }

    #[test]
    fn test_merge_later_source_wins_conflicts() {
        let mut older = KnowledgeBank::new();
        older.record("Q1", variant(&["a", "b"], &["a"]));
        let mut newer = KnowledgeBank::new();
        newer.record("Q1", variant(&["a", "b"], &["b"]));

        let mut merged = KnowledgeBank::new();
        merged.merge(&older);
        let stats = merged.merge(&newer);

        assert_eq!(stats.replaced, 1);
        assert_eq!(
            merged.lookup("Q1", &set(&["a", "b"])).unwrap().answer_contents(),
            &set(&["b"])
        );

        let mut reversed = KnowledgeBank::new();
        reversed.merge(&newer);
        reversed.merge(&older);
        assert_eq!(
            reversed.lookup("Q1", &set(&["a", "b"])).unwrap().answer_contents(),
            &set(&["a"])
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let bank = KnowledgeBank::load(&tmp.path().join("absent.json")).unwrap();
        assert!(bank.is_empty());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bank.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(KnowledgeBank::load(&path), Err(BankError::Json(_))));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/bank.json");
        let mut bank = KnowledgeBank::new();
        bank.record("Q1", variant(&["a", "b"], &["a"]));

        bank.save(&path).unwrap();

        assert_eq!(KnowledgeBank::load(&path).unwrap(), bank);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
