//! Per-run solve record and output artifact.
//!
//! Each run writes `solution_map.json` into its own timestamped directory
//! under the configured output directory. The artifact has the same shape
//! as the knowledge store so the merge utility can fold it in later.

use crate::knowledge_bank::{BankError, KnowledgeBank, Variant};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the per-run artifact.
pub const ARTIFACT_FILE: &str = "solution_map.json";

/// Directory-name format for runs; sorts chronologically.
pub const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Answers confirmed during the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveRecord {
    solved: KnowledgeBank,
}

impl SolveRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a confirmed variant; last write wins per fingerprint.
    pub fn confirm(&mut self, identity: &str, variant: Variant) {
        self.solved.record(identity, variant);
    }

    /// The record as a bank, for merging or inspection.
    pub fn as_bank(&self) -> &KnowledgeBank {
        &self.solved
    }

    pub fn question_count(&self) -> usize {
        self.solved.question_count()
    }

    pub fn is_empty(&self) -> bool {
        self.solved.is_empty()
    }

    /// Writes the artifact into `run_dir` and returns its path.
    pub fn write_artifact(&self, run_dir: &Path) -> Result<PathBuf, BankError> {
        let path = run_dir.join(ARTIFACT_FILE);
        self.solved.save(&path)?;
        info!(
            questions = self.solved.question_count(),
            variants = self.solved.variant_count(),
            "Wrote solve record to {}",
            path.display()
        );
        Ok(path)
    }
}

/// Creates a fresh run directory named after the current local time.
///
/// A numeric suffix is appended if a run already claimed this second.
pub fn create_run_dir(output_dir: &Path) -> io::Result<PathBuf> {
    let stamp = chrono::Local::now().format(RUN_DIR_FORMAT).to_string();
    fs::create_dir_all(output_dir)?;

    let mut candidate = output_dir.join(&stamp);
    let mut suffix = 1;
    while candidate.exists() {
        candidate = output_dir.join(format!("{stamp}_{suffix}"));
        suffix += 1;
    }
    fs::create_dir(&candidate)?;
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn variant(options: &[&str], answer: &[&str]) -> Variant {
        Variant::new(
            options.iter().map(|s| (*s).to_string()),
            answer.iter().map(|s| (*s).to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_artifact_round_trips_as_bank() {
        let tmp = TempDir::new().unwrap();
        let mut record = SolveRecord::new();
        record.confirm("Q1", variant(&["a", "b"], &["b"]));

        let path = record.write_artifact(tmp.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), ARTIFACT_FILE);
        assert_eq!(&KnowledgeBank::load(&path).unwrap(), record.as_bank());
    }

    #[test]
    fn test_empty_record_still_writes_artifact() {
        let tmp = TempDir::new().unwrap();
        let path = SolveRecord::new().write_artifact(tmp.path()).unwrap();
        assert!(KnowledgeBank::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_run_dirs_are_unique() {
        let tmp = TempDir::new().unwrap();
        let first = create_run_dir(tmp.path()).unwrap();
        let second = create_run_dir(tmp.path()).unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }
}
