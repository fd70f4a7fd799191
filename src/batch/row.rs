//! Batch row types - catalog rows, lookup table, outcomes and summary

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PharmaBoostError, Result};
use crate::pipeline::DoneData;

/// One catalog product row submitted for processing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogRow {
    pub sku: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub site_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub description_html: String,
}

impl CatalogRow {
    /// Load rows from a JSON array file.
    ///
    /// An unreadable or malformed file is a batch-fatal error.
    pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<CatalogRow>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PharmaBoostError::BatchInput(format!("Could not read items file '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PharmaBoostError::BatchInput(format!("Could not parse items file '{}': {}", path.display(), e))
        })
    }
}

/// One entry in the reference catalog used by the medicine pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub barcode: String,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub leaflet_link: Option<String>,
}

/// Lookup table from barcode to catalog entry
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from a list of entries (last entry wins per barcode)
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.barcode.trim().to_string(), e))
            .collect();
        Self { entries }
    }

    /// Load the catalog from a JSON array file.
    ///
    /// An unreadable or malformed file is a batch-fatal error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PharmaBoostError::BatchInput(format!("Could not read catalog file '{}': {}", path.display(), e))
        })?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&content).map_err(|e| {
            PharmaBoostError::BatchInput(format!("Could not parse catalog file '{}': {}", path.display(), e))
        })?;
        Ok(Self::from_entries(entries))
    }

    pub fn lookup(&self, sku: &str) -> Option<&CatalogEntry> {
        self.entries.get(sku.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-row terminal result
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItemOutcome {
    Success {
        sku: String,
        product_name: String,
        done: DoneData,
    },
    Skipped {
        sku: String,
        reason: String,
    },
}

impl BatchItemOutcome {
    pub fn sku(&self) -> &str {
        match self {
            BatchItemOutcome::Success { sku, .. } => sku,
            BatchItemOutcome::Skipped { sku, .. } => sku,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemOutcome::Success { .. })
    }
}

/// Batch-wide counters, updated only from the coordinator's consumption path
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub success: usize,
    pub skipped: usize,
}

/// Build the output artifact: every input row, with the content fields
/// replaced for rows that succeeded and untouched for the rest.
pub fn apply_updates(rows: &[CatalogRow], outcomes: &[BatchItemOutcome]) -> Vec<CatalogRow> {
    let updates: HashMap<&str, &DoneData> = outcomes
        .iter()
        .filter_map(|o| match o {
            BatchItemOutcome::Success { sku, done, .. } => Some((sku.as_str(), done)),
            BatchItemOutcome::Skipped { .. } => None,
        })
        .collect();

    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if let Some(done) = updates.get(row.sku.trim()) {
                row.site_title = done.seo_title.clone();
                row.meta_description = done.meta_description.clone();
                row.description_html = done.final_content.clone();
            }
            row
        })
        .collect()
}
