use quizpilot_proto::QuestionView;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `UNSOLVED.md` for a question the engine gave up on.
pub struct UnsolvedReport {
    path: PathBuf,
}

impl UnsolvedReport {
    pub const FILE_NAME: &'static str = "UNSOLVED.md";

    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records the question and how far the engine got.
    pub fn record(&self, view: &QuestionView, rounds: u32, reason: &str) -> io::Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let options: String = view
            .options
            .iter()
            .map(|(letter, content)| format!("- **{letter}:** {content}\n"))
            .collect();

        let entry = format!(
            "# Unsolved Question ({timestamp})\n\n\
             ## Question\n\n\
             {}\n\n\
             - **Kind:** {:?}\n\
             - **Rounds used:** {rounds}\n\
             - **Last round:** {reason}\n\n\
             ## Options\n\n\
             {options}\n\
             ---\n\n\
             *Answer this question manually, then add it to the knowledge bank before the next run.*\n",
            view.identity, view.kind,
        );

        fs::write(&self.path, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizpilot_proto::{Letter, QuestionKind};
    use tempfile::TempDir;

    #[test]
    fn test_record_lists_question_and_options() {
        let tmp = TempDir::new().unwrap();
        let report = UnsolvedReport::new(tmp.path());
        let view = QuestionView::new("Pick two", QuestionKind::Multiple)
            .with_option(Letter::new('A').unwrap(), "one")
            .with_option(Letter::new('B').unwrap(), "two");

        report.record(&view, 3, "exhausted").unwrap();

        let content = fs::read_to_string(report.path()).unwrap();
        assert!(content.contains("Pick two"));
        assert!(content.contains("- **Rounds used:** 3"));
        assert!(content.contains("- **A:** one"));
        assert!(content.contains("- **B:** two"));
    }
}
