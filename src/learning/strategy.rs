//! Strategy ledger - append-only history of refinement outcomes
//!
//! Every completed quality loop that moved the score leaves a record of what
//! changed and by how much. Reading the ledger back, ranked by score delta,
//! gives the prompts soft guidance on which strategies worked before.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::agents::{AuditResult, ProductType};
use crate::error::{PharmaBoostError, Result};

const DEFAULT_SUCCESS_MSG: &str = "No successful strategies recorded. Using general knowledge.";
const DEFAULT_FAIL_MSG: &str = "No failed strategies recorded.";

/// One refinement outcome. Created once, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyRecord {
    pub strategy: String,
    pub product_type: ProductType,
    pub score_before: i64,
    pub score_after: i64,
    pub score_delta: i64,
    pub timestamp: String,
}

/// File-backed append-only strategy ledger
pub struct StrategyLedger {
    ledger_file: PathBuf,
}

impl StrategyLedger {
    /// Create a ledger backed by the given file (created on first append)
    pub fn new(ledger_file: impl AsRef<Path>) -> Self {
        Self {
            ledger_file: ledger_file.as_ref().to_path_buf(),
        }
    }

    /// Read the full ledger; a missing or corrupt file reads as empty
    pub fn read_all(&self) -> Vec<StrategyRecord> {
        let content = match fs::read_to_string(&self.ledger_file) {
            Ok(content) if !content.trim().is_empty() => content,
            _ => return Vec::new(),
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Strategy ledger unreadable, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write_all(&self, records: &[StrategyRecord]) -> Result<()> {
        if let Some(parent) = self.ledger_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(records)?;
        fs::write(&self.ledger_file, content)
            .map_err(|e| PharmaBoostError::Storage(format!("Failed to write ledger: {}", e)))
    }

    /// Record the outcome of one optimization attempt.
    ///
    /// A zero delta records nothing. Returns the appended record, if any.
    pub fn log_strategy(
        &self,
        before: &AuditResult,
        after: &AuditResult,
        product_type: ProductType,
    ) -> Result<Option<StrategyRecord>> {
        let score_delta = after.total_score - before.total_score;
        if score_delta == 0 {
            return Ok(None);
        }

        let record = StrategyRecord {
            strategy: derive_strategy(before, after),
            product_type,
            score_before: before.total_score,
            score_after: after.total_score,
            score_delta,
            timestamp: Utc::now().to_rfc3339(),
        };

        let mut records = self.read_all();
        records.push(record.clone());
        self.write_all(&records)?;

        log::info!("Strategy recorded: {} (delta {})", record.strategy, score_delta);
        Ok(Some(record))
    }

    /// Best and worst strategies for a product type, as prompt-ready text.
    ///
    /// Records are ranked descending by score delta; the sort is stable, so
    /// ties keep insertion order. Falls back to the whole ledger when the
    /// product type has no records, and to fixed messages when either list
    /// is empty.
    pub fn top_strategies(&self, product_type: ProductType, top_n: usize) -> (String, String) {
        let ledger = self.read_all();
        if ledger.is_empty() {
            return (DEFAULT_SUCCESS_MSG.to_string(), DEFAULT_FAIL_MSG.to_string());
        }

        let mut relevant: Vec<&StrategyRecord> =
            ledger.iter().filter(|r| r.product_type == product_type).collect();
        if relevant.is_empty() {
            relevant = ledger.iter().collect();
        }

        relevant.sort_by(|a, b| b.score_delta.cmp(&a.score_delta));

        let successful: Vec<String> = relevant
            .iter()
            .take(top_n)
            .filter(|r| r.score_delta > 0)
            .map(|r| format!("- {} (score delta: +{})", r.strategy, r.score_delta))
            .collect();

        let failed: Vec<String> = relevant
            .iter()
            .filter(|r| r.score_delta <= 0)
            .take(top_n)
            .map(|r| format!("- {} (score delta: {})", r.strategy, r.score_delta))
            .collect();

        let successful_str = if successful.is_empty() {
            DEFAULT_SUCCESS_MSG.to_string()
        } else {
            successful.join("\n")
        };
        let failed_str = if failed.is_empty() {
            DEFAULT_FAIL_MSG.to_string()
        } else {
            failed.join("\n")
        };

        (successful_str, failed_str)
    }
}

/// Describe the strategy behind a score change by diffing the audit
/// breakdown feedback: a feedback item present before and gone after names
/// the fix that was applied.
fn derive_strategy(before: &AuditResult, after: &AuditResult) -> String {
    let feedback_before: BTreeSet<String> = before.breakdown_feedback().into_iter().collect();
    let feedback_after: BTreeSet<String> = after.breakdown_feedback().into_iter().collect();

    if let Some(resolved) = feedback_before.difference(&feedback_after).next() {
        format!("Applied fix: '{}'", resolved)
    } else {
        "General SEO optimization.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ledger() -> (StrategyLedger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let ledger = StrategyLedger::new(temp_dir.path().join("strategies.json"));
        (ledger, temp_dir)
    }

    fn audit(score: i64) -> AuditResult {
        AuditResult::from_value(json!({ "total_score": score })).unwrap()
    }

    fn audit_with_feedback(score: i64, feedback: &[&str]) -> AuditResult {
        AuditResult::from_value(json!({
            "total_score": score,
            "breakdown": {
                "general": { "score": score, "feedback": feedback }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let (ledger, _dir) = ledger();
        assert!(ledger.read_all().is_empty());
    }

    #[test]
    fn test_read_corrupt_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("strategies.json");
        fs::write(&path, "not json").unwrap();

        let ledger = StrategyLedger::new(&path);
        assert!(ledger.read_all().is_empty());
    }

    #[test]
    fn test_log_strategy_appends() {
        let (ledger, _dir) = ledger();

        let record = ledger
            .log_strategy(&audit(70), &audit(90), ProductType::Medicine)
            .unwrap()
            .unwrap();
        assert_eq!(record.score_before, 70);
        assert_eq!(record.score_after, 90);
        assert_eq!(record.score_delta, 20);
        assert!(!record.timestamp.is_empty());

        let all = ledger.read_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], record);
    }

    #[test]
    fn test_log_strategy_zero_delta_not_recorded() {
        let (ledger, _dir) = ledger();
        let result = ledger
            .log_strategy(&audit(80), &audit(80), ProductType::Beauty)
            .unwrap();
        assert!(result.is_none());
        assert!(ledger.read_all().is_empty());
    }

    #[test]
    fn test_log_strategy_negative_delta_recorded() {
        let (ledger, _dir) = ledger();
        let record = ledger
            .log_strategy(&audit(80), &audit(75), ProductType::Beauty)
            .unwrap()
            .unwrap();
        assert_eq!(record.score_delta, -5);
    }

    #[test]
    fn test_derive_strategy_from_resolved_feedback() {
        let before = audit_with_feedback(70, &["title too long", "missing FAQ"]);
        let after = audit_with_feedback(85, &["title too long"]);

        let strategy = derive_strategy(&before, &after);
        assert_eq!(strategy, "Applied fix: 'missing FAQ'");
    }

    #[test]
    fn test_derive_strategy_fallback() {
        let strategy = derive_strategy(&audit(70), &audit(85));
        assert_eq!(strategy, "General SEO optimization.");
    }

    #[test]
    fn test_top_strategies_empty_ledger() {
        let (ledger, _dir) = ledger();
        let (ok, bad) = ledger.top_strategies(ProductType::Medicine, 3);
        assert_eq!(ok, DEFAULT_SUCCESS_MSG);
        assert_eq!(bad, DEFAULT_FAIL_MSG);
    }

    #[test]
    fn test_top_strategies_ranked_descending() {
        let (ledger, _dir) = ledger();
        ledger
            .log_strategy(
                &audit_with_feedback(70, &["small fix"]),
                &audit_with_feedback(75, &[]),
                ProductType::Medicine,
            )
            .unwrap();
        ledger
            .log_strategy(
                &audit_with_feedback(50, &["big fix"]),
                &audit_with_feedback(90, &[]),
                ProductType::Medicine,
            )
            .unwrap();

        let (ok, _) = ledger.top_strategies(ProductType::Medicine, 3);
        let big_pos = ok.find("big fix").unwrap();
        let small_pos = ok.find("small fix").unwrap();
        assert!(big_pos < small_pos);
        assert!(ok.contains("+40"));
        assert!(ok.contains("+5"));
    }

    #[test]
    fn test_top_strategies_ties_keep_insertion_order() {
        let (ledger, _dir) = ledger();
        ledger
            .log_strategy(
                &audit_with_feedback(70, &["first recorded"]),
                &audit_with_feedback(80, &[]),
                ProductType::Medicine,
            )
            .unwrap();
        ledger
            .log_strategy(
                &audit_with_feedback(60, &["second recorded"]),
                &audit_with_feedback(70, &[]),
                ProductType::Medicine,
            )
            .unwrap();

        let (ok, _) = ledger.top_strategies(ProductType::Medicine, 3);
        let first_pos = ok.find("first recorded").unwrap();
        let second_pos = ok.find("second recorded").unwrap();
        assert!(first_pos < second_pos);
    }

    #[test]
    fn test_top_strategies_splits_failures() {
        let (ledger, _dir) = ledger();
        ledger
            .log_strategy(
                &audit_with_feedback(70, &["good change"]),
                &audit_with_feedback(90, &[]),
                ProductType::Beauty,
            )
            .unwrap();
        ledger
            .log_strategy(
                &audit_with_feedback(70, &["bad change"]),
                &audit_with_feedback(60, &[]),
                ProductType::Beauty,
            )
            .unwrap();

        let (ok, bad) = ledger.top_strategies(ProductType::Beauty, 3);
        assert!(ok.contains("good change"));
        assert!(!ok.contains("bad change"));
        assert!(bad.contains("bad change"));
        assert!(bad.contains("-10"));
    }

    #[test]
    fn test_top_strategies_falls_back_to_other_product_type() {
        let (ledger, _dir) = ledger();
        ledger
            .log_strategy(
                &audit_with_feedback(70, &["medicine fix"]),
                &audit_with_feedback(90, &[]),
                ProductType::Medicine,
            )
            .unwrap();

        let (ok, _) = ledger.top_strategies(ProductType::Beauty, 3);
        assert!(ok.contains("medicine fix"));
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("strategies.json");

        {
            let ledger = StrategyLedger::new(&path);
            ledger
                .log_strategy(&audit(70), &audit(90), ProductType::Medicine)
                .unwrap();
        }

        let ledger = StrategyLedger::new(&path);
        assert_eq!(ledger.read_all().len(), 1);
    }
}
