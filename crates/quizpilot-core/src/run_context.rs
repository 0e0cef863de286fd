//! State owned by one run and lent to the supervisor and solvers.

use crate::knowledge_bank::{KnowledgeBank, Variant};
use crate::run_record::SolveRecord;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Mutable run state: the in-memory bank, this run's solve record, and the
/// identity of the last solved question.
#[derive(Debug, Default)]
pub struct RunContext {
    pub bank: KnowledgeBank,
    pub record: SolveRecord,
    pub last_identity: Option<String>,
}

impl RunContext {
    pub fn new(bank: KnowledgeBank) -> Self {
        Self {
            bank,
            record: SolveRecord::new(),
            last_identity: None,
        }
    }

    /// Stores a confirmed answer in both the solve record and the bank.
    ///
    /// Returns false if the answer violates the variant invariants, in which
    /// case nothing is stored.
    pub fn confirm(
        &mut self,
        identity: &str,
        option_contents: BTreeSet<String>,
        answer_contents: BTreeSet<String>,
    ) -> bool {
        match Variant::new(option_contents, answer_contents) {
            Ok(variant) => {
                debug!(identity = %identity, answer = ?variant.answer_contents(), "Recording confirmed answer");
                self.record.confirm(identity, variant.clone());
                self.bank.record(identity, variant);
                true
            }
            Err(e) => {
                warn!(identity = %identity, "Not recording confirmed answer: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_confirm_updates_bank_and_record() {
        let mut ctx = RunContext::default();
        assert!(ctx.confirm("Q1", set(&["a", "b"]), set(&["a"])));

        assert!(ctx.bank.lookup("Q1", &set(&["a", "b"])).is_some());
        assert_eq!(ctx.record.question_count(), 1);
    }

    #[test]
    fn test_confirm_rejects_invalid_variant() {
        let mut ctx = RunContext::default();
        assert!(!ctx.confirm("Q1", set(&["a"]), set(&[])));
        assert!(ctx.record.is_empty());
        assert!(ctx.bank.is_empty());
    }
}
