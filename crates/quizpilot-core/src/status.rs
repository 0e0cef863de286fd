use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Machine-readable run status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub current_identity: Option<String>,
    pub solved_count: usize,
    pub last_rounds: u32,
    pub bank_questions: usize,
    pub elapsed_seconds: u64,
    pub is_halted: bool,
    pub halt_reason: Option<String>,
}

/// Rewrites `status.json` and `status.md` in the run directory.
pub struct StatusWriter {
    run_dir: PathBuf,
}

impl StatusWriter {
    pub const JSON_FILE: &'static str = "status.json";
    pub const MARKDOWN_FILE: &'static str = "status.md";

    pub fn new(run_dir: &Path) -> Self {
        Self {
            run_dir: run_dir.to_path_buf(),
        }
    }

    /// Replaces both status artifacts with `status`.
    pub fn update(&self, status: &RunStatus) {
        let json_path = self.run_dir.join(Self::JSON_FILE);
        match serde_json::to_string_pretty(status) {
            Ok(json) => {
                if let Err(e) = fs::write(&json_path, json) {
                    warn!("Failed to write {}: {}", json_path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize status: {}", e),
        }

        let md_path = self.run_dir.join(Self::MARKDOWN_FILE);
        if let Err(e) = fs::write(&md_path, format_markdown(status)) {
            warn!("Failed to write {}: {}", md_path.display(), e);
        }
        debug!(solved = status.solved_count, "Status updated");
    }
}

fn format_markdown(status: &RunStatus) -> String {
    let state = match (&status.halt_reason, status.is_halted) {
        (Some(reason), true) => format!("HALTED ({reason})"),
        (None, true) => "HALTED".to_string(),
        _ => "RUNNING".to_string(),
    };

    format!(
        "# Quiz Run Status\n\n\
         ## Current Question\n\n\
         {}\n\n\
         ## Progress\n\n\
         - **Solved:** {}\n\
         - **Rounds (last question):** {}\n\
         - **Bank questions:** {}\n\
         - **Elapsed:** {}s\n\n\
         ## State\n\n\
         {}\n",
        status.current_identity.as_deref().unwrap_or("(none)"),
        status.solved_count,
        status.last_rounds,
        status.bank_questions,
        status.elapsed_seconds,
        state,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_update_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let writer = StatusWriter::new(tmp.path());
        let status = RunStatus {
            current_identity: Some("Q2".to_string()),
            solved_count: 1,
            last_rounds: 1,
            bank_questions: 4,
            elapsed_seconds: 12,
            ..RunStatus::default()
        };

        writer.update(&status);

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(tmp.path().join(StatusWriter::JSON_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(json["current_identity"], "Q2");
        assert_eq!(json["solved_count"], 1);
        assert_eq!(json["is_halted"], false);

        let md = fs::read_to_string(tmp.path().join(StatusWriter::MARKDOWN_FILE)).unwrap();
        assert!(md.contains("- **Solved:** 1"));
        assert!(md.contains("RUNNING"));
    }

    #[test]
    fn test_halted_status_shows_reason() {
        let status = RunStatus {
            is_halted: true,
            halt_reason: Some("unsolvable".to_string()),
            ..RunStatus::default()
        };
        assert!(format_markdown(&status).contains("HALTED (unsolvable)"));
    }
}
