//! Success memory - rolling few-shot examples from approved content
//!
//! When a human approves generated content, the before/after pair is kept as
//! a few-shot example for future prompts. Only the last few approvals are
//! retained so the prompt stays within token limits, and snippets are
//! truncated to the part that shows the semantic transformation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PharmaBoostError, Result};

/// Characters kept from each side of an approved pair
const SNIPPET_LEN: usize = 800;

const EMPTY_MEMORY_MSG: &str = "No recent history available. Follow the base rules strictly.";

/// One approved before/after pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub product: String,
    pub original_snippet: String,
    pub approved_snippet: String,
}

/// File-backed rolling memory of approved transformations
pub struct SuccessMemory {
    memory_file: PathBuf,
    cap: usize,
}

impl SuccessMemory {
    /// Create a memory backed by the given file, keeping at most `cap`
    /// entries (oldest evicted first)
    pub fn new(memory_file: impl AsRef<Path>, cap: usize) -> Self {
        Self {
            memory_file: memory_file.as_ref().to_path_buf(),
            cap,
        }
    }

    /// Read all entries; a missing or corrupt file reads as empty
    pub fn read_all(&self) -> Vec<MemoryEntry> {
        let content = match fs::read_to_string(&self.memory_file) {
            Ok(content) if !content.trim().is_empty() => content,
            _ => return Vec::new(),
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Success memory unreadable, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write_all(&self, entries: &[MemoryEntry]) -> Result<()> {
        if let Some(parent) = self.memory_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.memory_file, content)
            .map_err(|e| PharmaBoostError::Storage(format!("Failed to write memory: {}", e)))
    }

    /// Record an approved transformation.
    ///
    /// Duplicate product names are ignored to keep the memory diverse.
    /// When the cap is exceeded the oldest entries are evicted.
    pub fn record_success(
        &self,
        product_name: &str,
        original_html: &str,
        approved_html: &str,
    ) -> Result<()> {
        let mut entries = self.read_all();

        if entries.iter().any(|e| e.product == product_name) {
            return Ok(());
        }

        entries.push(MemoryEntry {
            product: product_name.to_string(),
            original_snippet: truncate_snippet(original_html),
            approved_snippet: truncate_snippet(approved_html),
        });

        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }

        self.write_all(&entries)
    }

    /// Format the memory as plain text for prompt injection
    pub fn format_for_prompt(&self) -> String {
        let entries = self.read_all();
        if entries.is_empty() {
            return EMPTY_MEMORY_MSG.to_string();
        }

        let mut formatted = String::from(
            "### RECENT APPROVED EXAMPLES (LEARN FROM THEM AND REPLICATE THE APPROACH):\n",
        );
        formatted.push_str("Note how the original terms were rephrased in the approved text:\n\n");

        for entry in &entries {
            formatted.push_str(&format!("- Product: {}\n", entry.product));
            formatted.push_str(&format!("  Original snippet: {}\n", entry.original_snippet));
            formatted.push_str(&format!("  Approved version: {}\n\n", entry.approved_snippet));
        }

        formatted
    }
}

fn truncate_snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_LEN {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(SNIPPET_LEN).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory(cap: usize) -> (SuccessMemory, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let memory = SuccessMemory::new(temp_dir.path().join("memory.json"), cap);
        (memory, temp_dir)
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let (memory, _dir) = memory(3);
        assert!(memory.read_all().is_empty());
    }

    #[test]
    fn test_record_and_read_back() {
        let (memory, _dir) = memory(3);
        memory
            .record_success("Dipirona", "<p>old</p>", "<p>approved</p>")
            .unwrap();

        let entries = memory.read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product, "Dipirona");
        assert_eq!(entries[0].original_snippet, "<p>old</p>");
        assert_eq!(entries[0].approved_snippet, "<p>approved</p>");
    }

    #[test]
    fn test_duplicate_product_not_recorded() {
        let (memory, _dir) = memory(3);
        memory.record_success("Dipirona", "a", "b").unwrap();
        memory.record_success("Dipirona", "c", "d").unwrap();

        let entries = memory.read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_snippet, "a");
    }

    #[test]
    fn test_fifo_eviction_at_cap() {
        let (memory, _dir) = memory(3);
        for name in ["one", "two", "three", "four"] {
            memory.record_success(name, "orig", "appr").unwrap();
        }

        let entries = memory.read_all();
        assert_eq!(entries.len(), 3);
        let names: Vec<&str> = entries.iter().map(|e| e.product.as_str()).collect();
        assert_eq!(names, vec!["two", "three", "four"]);
    }

    #[test]
    fn test_snippet_truncation() {
        let (memory, _dir) = memory(3);
        let long_html = "x".repeat(2000);
        memory.record_success("Long", &long_html, &long_html).unwrap();

        let entries = memory.read_all();
        assert_eq!(entries[0].original_snippet.chars().count(), SNIPPET_LEN + 3);
        assert!(entries[0].original_snippet.ends_with("..."));
    }

    #[test]
    fn test_short_snippet_not_truncated() {
        assert_eq!(truncate_snippet("short"), "short");
    }

    #[test]
    fn test_format_for_prompt_empty() {
        let (memory, _dir) = memory(3);
        assert_eq!(memory.format_for_prompt(), EMPTY_MEMORY_MSG);
    }

    #[test]
    fn test_format_for_prompt_with_entries() {
        let (memory, _dir) = memory(3);
        memory.record_success("Serum", "<p>was</p>", "<p>now</p>").unwrap();

        let formatted = memory.format_for_prompt();
        assert!(formatted.contains("RECENT APPROVED EXAMPLES"));
        assert!(formatted.contains("- Product: Serum"));
        assert!(formatted.contains("<p>was</p>"));
        assert!(formatted.contains("<p>now</p>"));
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("memory.json");
        fs::write(&path, "{broken").unwrap();

        let memory = SuccessMemory::new(&path, 3);
        assert!(memory.read_all().is_empty());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("memory.json");

        {
            let memory = SuccessMemory::new(&path, 3);
            memory.record_success("Persist", "a", "b").unwrap();
        }

        let memory = SuccessMemory::new(&path, 3);
        assert_eq!(memory.read_all().len(), 1);
    }
}
