//! Offline merge of run artifacts into one knowledge store.
//!
//! Artifacts live under `runs/<%Y%m%d_%H%M%S>/solution_map.json`, so a
//! lexicographic sort of their paths is chronological. Folding them in that
//! order lets later corrections win per fingerprint. Source files are only
//! read, never modified.

use crate::knowledge_bank::{BankError, KnowledgeBank, MergeStats};
use crate::run_record::ARTIFACT_FILE;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Runs directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to read base bank: {0}")]
    Base(#[source] BankError),

    #[error("Failed to write merged bank: {0}")]
    Output(#[source] BankError),
}

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub files_merged: usize,
    pub files_skipped: usize,
    pub questions: usize,
    pub variants: usize,
    pub stats: MergeStats,
}

/// Finds every run artifact under `root`, oldest first.
pub fn find_artifacts(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == ARTIFACT_FILE)
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Folds `base` (if any) and then every artifact under `root` into one bank.
pub fn merge_runs(root: &Path, base: Option<&Path>) -> Result<(KnowledgeBank, MergeSummary), MergeError> {
    if !root.is_dir() {
        return Err(MergeError::RootNotFound(root.to_path_buf()));
    }

    let mut merged = match base {
        Some(path) => {
            let bank = KnowledgeBank::load(path).map_err(MergeError::Base)?;
            info!(questions = bank.question_count(), "Starting from base bank {}", path.display());
            bank
        }
        None => KnowledgeBank::new(),
    };

    let mut summary = MergeSummary::default();
    for path in find_artifacts(root) {
        match KnowledgeBank::load(&path) {
            Ok(bank) => {
                let stats = merged.merge(&bank);
                debug!(
                    inserted = stats.inserted,
                    replaced = stats.replaced,
                    "Merged {}",
                    path.display()
                );
                summary.stats.inserted += stats.inserted;
                summary.stats.replaced += stats.replaced;
                summary.stats.unchanged += stats.unchanged;
                summary.files_merged += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                summary.files_skipped += 1;
            }
        }
    }

    summary.questions = merged.question_count();
    summary.variants = merged.variant_count();
    info!(
        files = summary.files_merged,
        skipped = summary.files_skipped,
        questions = summary.questions,
        variants = summary.variants,
        "Merge complete"
    );
    Ok((merged, summary))
}

/// Merges everything under `root` and writes the result to `output`.
pub fn merge_into_file(root: &Path, base: Option<&Path>, output: &Path) -> Result<MergeSummary, MergeError> {
    let (merged, summary) = merge_runs(root, base)?;
    merged.save(output).map_err(MergeError::Output)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_bank::Variant;
    use std::fs;
    use tempfile::TempDir;

    fn bank(identity: &str, options: &[&str], answer: &[&str]) -> KnowledgeBank {
        let mut bank = KnowledgeBank::new();
        bank.record(
            identity,
            Variant::new(
                options.iter().map(|s| (*s).to_string()),
                answer.iter().map(|s| (*s).to_string()),
            )
            .unwrap(),
        );
        bank
    }

    fn write_run(root: &Path, stamp: &str, bank: &KnowledgeBank) {
        bank.save(&root.join(stamp).join(ARTIFACT_FILE)).unwrap();
    }

    #[test]
    fn test_later_runs_win() {
        let tmp = TempDir::new().unwrap();
        // Written out of order on purpose; the directory name decides.
        write_run(tmp.path(), "20240102_090000", &bank("Q1", &["a", "b"], &["b"]));
        write_run(tmp.path(), "20240101_090000", &bank("Q1", &["a", "b"], &["a"]));

        let (merged, summary) = merge_runs(tmp.path(), None).unwrap();

        let options = ["a", "b"].iter().map(|s| (*s).to_string()).collect();
        let variant = merged.lookup("Q1", &options).unwrap();
        assert!(variant.answer_contents().contains("b"));
        assert_eq!(summary.files_merged, 2);
        assert_eq!(summary.stats.replaced, 1);
        assert_eq!(summary.questions, 1);
        assert_eq!(summary.variants, 1);
    }

    #[test]
    fn test_malformed_artifacts_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write_run(tmp.path(), "20240101_090000", &bank("Q1", &["a"], &["a"]));
        let broken = tmp.path().join("20240102_090000");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(ARTIFACT_FILE), "{ nope").unwrap();

        let (merged, summary) = merge_runs(tmp.path(), None).unwrap();

        assert_eq!(merged.question_count(), 1);
        assert_eq!(summary.files_merged, 1);
        assert_eq!(summary.files_skipped, 1);
    }

    #[test]
    fn test_base_is_folded_first() {
        let tmp = TempDir::new().unwrap();
        let base_path = tmp.path().join("master.json");
        bank("Q1", &["a", "b"], &["a"]).save(&base_path).unwrap();
        let runs = tmp.path().join("runs");
        write_run(&runs, "20240101_090000", &bank("Q1", &["a", "b"], &["b"]));

        let output = tmp.path().join("merged.json");
        let summary = merge_into_file(&runs, Some(&base_path), &output).unwrap();

        let merged = KnowledgeBank::load(&output).unwrap();
        let options = ["a", "b"].iter().map(|s| (*s).to_string()).collect();
        assert!(merged.lookup("Q1", &options).unwrap().answer_contents().contains("b"));
        assert_eq!(summary.stats.replaced, 1);
        // Base file untouched.
        let base = KnowledgeBank::load(&base_path).unwrap();
        assert!(base.lookup("Q1", &options).unwrap().answer_contents().contains("a"));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = merge_runs(&tmp.path().join("absent"), None).unwrap_err();
        assert!(matches!(err, MergeError::RootNotFound(_)));
    }

    #[test]
    fn test_other_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        write_run(tmp.path(), "20240101_090000", &bank("Q1", &["a"], &["a"]));
        fs::write(tmp.path().join("20240101_090000").join("status.json"), "{}").unwrap();

        assert_eq!(find_artifacts(tmp.path()).len(), 1);
    }
}
