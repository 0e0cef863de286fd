use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Appends run milestones to `journal.md` as a markdown table.
pub struct RunJournal {
    path: PathBuf,
}

impl RunJournal {
    pub const FILE_NAME: &'static str = "journal.md";

    /// Creates a journal inside `run_dir`.
    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logs a milestone event.
    pub fn log_event(&self, event_type: &str, details: &str) {
        let timestamp = chrono::Local::now().to_rfc3339();
        let details = details.replace('|', "\\|").replace('\n', " ");

        if !self.path.exists()
            && let Err(e) = fs::write(
                &self.path,
                "# Run Journal\n\n| Timestamp | Event | Details |\n| --- | --- | --- |\n",
            )
        {
            warn!("Failed to create journal {}: {}", self.path.display(), e);
            return;
        }

        let appended = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "| {timestamp} | {event_type} | {details} |"));
        if let Err(e) = appended {
            warn!("Failed to append to journal {}: {}", self.path.display(), e);
        }
    }

    pub fn log_run_started(&self, bank_questions: usize) {
        self.log_event("RUN_STARTED", &format!("bank holds {bank_questions} question(s)"));
    }

    pub fn log_question(&self, identity: &str) {
        self.log_event("QUESTION_DETECTED", identity);
    }

    pub fn log_solved(&self, identity: &str, source: &str, answer: &str) {
        self.log_event("QUESTION_SOLVED", &format!("{identity} -> {answer} ({source})"));
    }

    /// Logs a loop halt.
    pub fn log_halt(&self, reason: &str) {
        self.log_event("RUN_HALTED", reason);
    }

    pub fn log_artifact(&self, path: &Path) {
        self.log_event("ARTIFACT_WRITTEN", &path.display().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_journal_writes_header_once() {
        let tmp = TempDir::new().unwrap();
        let journal = RunJournal::new(tmp.path());

        journal.log_run_started(3);
        journal.log_halt("stop identity reached");

        let content = fs::read_to_string(journal.path()).unwrap();
        assert_eq!(content.matches("| Timestamp | Event | Details |").count(), 1);
        assert!(content.contains("| RUN_STARTED | bank holds 3 question(s) |"));
        assert!(content.contains("| RUN_HALTED | stop identity reached |"));
    }

    #[test]
    fn test_journal_escapes_table_breaking_text() {
        let tmp = TempDir::new().unwrap();
        let journal = RunJournal::new(tmp.path());

        journal.log_question("a | b\nc");

        let content = fs::read_to_string(journal.path()).unwrap();
        assert!(content.contains("a \\| b c"));
    }
}
