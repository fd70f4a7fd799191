//! Agent data types - product context, generated content, audit results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Domain context handed to every agent call.
///
/// A thin wrapper over an ordered JSON map so the whole thing can be fed to
/// the template renderer as-is. Immutable during the quality loop; the
/// enrichment setters run once before the loop starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInfo(pub Map<String, Value>);

impl ProductInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a template variable
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a string-typed variable
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn brand(&self) -> Option<&str> {
        self.get_str("brand")
    }

    /// Extracted document (leaflet) text for the medicine domain
    pub fn leaflet_text(&self) -> Option<&str> {
        self.get_str("leaflet_text")
    }

    /// Free-text context for the beauty domain
    pub fn context_text(&self) -> Option<&str> {
        self.get_str("context_text")
    }

    /// Merge this context with extra variables into one render context
    pub fn render_context(&self, extra: &[(&str, Value)]) -> Value {
        let mut map = self.0.clone();
        for (key, value) in extra {
            map.insert((*key).to_string(), value.clone());
        }
        Value::Object(map)
    }
}

/// Structured content produced by generator and refiner agents.
///
/// Auditor-specific fields ride along in `extra` so the rubric can evolve
/// without the core caring.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeneratedContent {
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeneratedContent {
    /// Parse from an extracted JSON object; None if the value is not an object
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// The full content as a JSON value (what the auditor sees)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn seo_title_or(&self, fallback: &str) -> String {
        self.seo_title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn meta_description_or_default(&self) -> String {
        self.meta_description.clone().unwrap_or_default()
    }

    pub fn html_content_or_default(&self) -> String {
        self.html_content.clone().unwrap_or_default()
    }
}

/// Result of one audit pass. Ephemeral: lives for a single loop iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditResult {
    #[serde(default)]
    pub total_score: i64,
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

impl AuditResult {
    /// Parse from an extracted JSON object
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// The guaranteed fallback: a zero score with an explanatory feedback
    /// line, so the loop always has something comparable.
    pub fn failed(message: &str) -> Self {
        let mut detail = Map::new();
        detail.insert("feedback".to_string(), Value::String(message.to_string()));
        Self {
            total_score: 0,
            detail,
        }
    }

    /// The audit as a JSON value (what the refiner sees as prior feedback)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Flattened feedback strings from the per-category breakdown
    pub fn breakdown_feedback(&self) -> Vec<String> {
        let mut feedback = Vec::new();
        if let Some(breakdown) = self.detail.get("breakdown").and_then(|b| b.as_object()) {
            for category in breakdown.values() {
                if let Some(lines) = category.get("feedback").and_then(|f| f.as_array()) {
                    for line in lines {
                        if let Some(text) = line.as_str() {
                            feedback.push(text.to_string());
                        }
                    }
                }
            }
        }
        feedback
    }
}
