//! Sensitive-term identification for the medicine domain
//!
//! Merchant platforms reject listings containing certain regulatory terms.
//! Which terms are disallowed depends on the drug, so a dedicated pass
//! extracts a dynamic blacklist from the leaflet text before generation.
//! Failure here degrades to an empty blacklist; it never aborts a pipeline.

use std::time::Duration;

use serde_json::json;

use crate::llm::{execute_with_backoff, extract_json, GenerativeClient, RetryPolicy};
use crate::prompt::PromptStore;

/// Template name for the identifier pass
pub const TEMPLATE: &str = "sensitive_term_identifier";

const TIMEOUT: Duration = Duration::from_secs(90);

/// Extract the disallowed-term blacklist from leaflet text.
///
/// Expects the model to answer with `{"forbidden_terms": [...]}`. Any
/// failure (render, generation, extraction, wrong shape) yields an empty
/// list.
pub async fn identify_sensitive_terms(
    client: &dyn GenerativeClient,
    prompts: &PromptStore,
    retry: &RetryPolicy,
    leaflet_text: &str,
) -> Vec<String> {
    let context = json!({ "leaflet_text": leaflet_text });

    let prompt = match prompts.render(TEMPLATE, &context) {
        Ok(prompt) => prompt,
        Err(e) => {
            log::error!("Sensitive-term identifier template failed to render: {}", e);
            return Vec::new();
        }
    };

    let response = match execute_with_backoff(client, &prompt, retry, TIMEOUT).await {
        Some(response) => response,
        None => return Vec::new(),
    };

    let terms = extract_json(&response)
        .and_then(|value| {
            value.get("forbidden_terms").and_then(|t| t.as_array()).map(|terms| {
                terms
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            })
        })
        .unwrap_or_default();

    if terms.is_empty() {
        log::warn!("Sensitive-term pass produced no terms");
    } else {
        log::info!("Identified {} sensitive terms", terms.len());
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockGenerativeClient;
    use tempfile::TempDir;

    fn store() -> (PromptStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(format!("{}.md", TEMPLATE)),
            "Identify regulatory terms in: {{leaflet_text}}",
        )
        .unwrap();
        (PromptStore::new(temp_dir.path()), temp_dir)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_extracts_terms() {
        let (prompts, _dir) = store();
        let client = MockGenerativeClient::always(
            r#"{"forbidden_terms": ["cure", "miracle", "guaranteed"]}"#,
        );

        let terms = identify_sensitive_terms(&client, &prompts, &fast_retry(), "leaflet").await;
        assert_eq!(terms, vec!["cure", "miracle", "guaranteed"]);
    }

    #[tokio::test]
    async fn test_unparseable_degrades_to_empty() {
        let (prompts, _dir) = store();
        let client = MockGenerativeClient::always("no json");

        let terms = identify_sensitive_terms(&client, &prompts, &fast_retry(), "leaflet").await;
        assert!(terms.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_degrades_to_empty() {
        let (prompts, _dir) = store();
        let client = MockGenerativeClient::always(r#"{"something_else": true}"#);

        let terms = identify_sensitive_terms(&client, &prompts, &fast_retry(), "leaflet").await;
        assert!(terms.is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = PromptStore::new(temp_dir.path());
        let client = MockGenerativeClient::always(r#"{"forbidden_terms": ["x"]}"#);

        let terms = identify_sensitive_terms(&client, &prompts, &fast_retry(), "leaflet").await;
        assert!(terms.is_empty());
    }

    #[tokio::test]
    async fn test_non_string_entries_skipped() {
        let (prompts, _dir) = store();
        let client = MockGenerativeClient::always(r#"{"forbidden_terms": ["ok", 42, null]}"#);

        let terms = identify_sensitive_terms(&client, &prompts, &fast_retry(), "leaflet").await;
        assert_eq!(terms, vec!["ok"]);
    }
}
