//! Beauty domain agents
//!
//! The beauty generator enriches its context with live search research
//! (FAQ-style questions and related topics) before rendering, since no
//! leaflet document exists for cosmetics. Research failures degrade to
//! empty context rather than blocking generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::agents::types::{AuditResult, GeneratedContent, ProductInfo};
use crate::agents::DomainAgents;
use crate::llm::{execute_with_backoff, extract_json, GenerativeClient, RetryPolicy};
use crate::prompt::PromptStore;
use crate::search::SeoResearcher;

const GENERATOR_TEMPLATE: &str = "beauty_generator";
const AUDITOR_TEMPLATE: &str = "beauty_auditor";
const REFINER_TEMPLATE: &str = "beauty_refiner";

const GENERATOR_TIMEOUT: Duration = Duration::from_secs(120);
const AUDITOR_TIMEOUT: Duration = Duration::from_secs(180);
const REFINER_TIMEOUT: Duration = Duration::from_secs(120);

/// Templates the beauty pipeline requires at startup
pub const REQUIRED_TEMPLATES: &[&str] = &[GENERATOR_TEMPLATE, AUDITOR_TEMPLATE, REFINER_TEMPLATE];

/// Agent set for beauty and personal-care products
pub struct BeautyAgents {
    client: Arc<dyn GenerativeClient>,
    prompts: Arc<PromptStore>,
    researcher: Arc<SeoResearcher>,
    retry: RetryPolicy,
}

impl BeautyAgents {
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        prompts: Arc<PromptStore>,
        researcher: Arc<SeoResearcher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            prompts,
            researcher,
            retry,
        }
    }

    async fn call(&self, template: &str, context: &serde_json::Value, timeout: Duration) -> Option<serde_json::Value> {
        let prompt = match self.prompts.render(template, context) {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("Failed to render template '{}': {}", template, e);
                return None;
            }
        };
        let response = execute_with_backoff(self.client.as_ref(), &prompt, &self.retry, timeout).await?;
        extract_json(&response)
    }
}

#[async_trait]
impl DomainAgents for BeautyAgents {
    async fn prepare(&self, product_name: &str, mut info: ProductInfo) -> Result<ProductInfo, String> {
        info.set(
            "base_name",
            crate::search::base_product_name(product_name, info.brand()),
        );
        Ok(info)
    }

    async fn generate(&self, product_name: &str, info: &ProductInfo) -> Option<GeneratedContent> {
        let (faq_research, keyword_research) =
            self.researcher.research(product_name, info.brand()).await;

        let context = info.render_context(&[
            ("product_name", json!(product_name)),
            ("faq_research_context", json!(faq_research)),
            ("keyword_research_context", json!(keyword_research)),
        ]);

        let value = self.call(GENERATOR_TEMPLATE, &context, GENERATOR_TIMEOUT).await?;
        GeneratedContent::from_value(value)
    }

    async fn audit(&self, content: &GeneratedContent) -> AuditResult {
        let context = json!({
            "full_page_json": content.to_value().to_string(),
        });

        match self.call(AUDITOR_TEMPLATE, &context, AUDITOR_TIMEOUT).await {
            Some(value) => AuditResult::from_value(value)
                .unwrap_or_else(|| AuditResult::failed("Beauty audit response was not an object.")),
            None => AuditResult::failed("Beauty audit failed."),
        }
    }

    async fn refine(
        &self,
        product_name: &str,
        info: &ProductInfo,
        previous: &GeneratedContent,
        feedback: &AuditResult,
    ) -> GeneratedContent {
        let context = info.render_context(&[
            ("product_name", json!(product_name)),
            ("previous_json", json!(previous.to_value().to_string())),
            ("previous_audit", json!(feedback.to_value().to_string())),
        ]);

        match self.call(REFINER_TEMPLATE, &context, REFINER_TIMEOUT).await {
            Some(value) => GeneratedContent::from_value(value).unwrap_or_else(|| previous.clone()),
            None => previous.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockGenerativeClient;
    use crate::search::client::{SearchClient, SearchResults};
    use tempfile::TempDir;
    use tokio::sync::Semaphore;

    struct ScriptedSearch {
        related: Vec<String>,
    }

    #[async_trait]
    impl SearchClient for ScriptedSearch {
        async fn search(&self, queries: &[String]) -> Vec<SearchResults> {
            queries
                .iter()
                .map(|q| SearchResults {
                    query: q.clone(),
                    items: vec![],
                    related_questions: self.related.clone(),
                    related_searches: self.related.clone(),
                })
                .collect()
        }
    }

    fn store_with_templates() -> (Arc<PromptStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        for name in REQUIRED_TEMPLATES {
            std::fs::write(
                temp_dir.path().join(format!("{}.md", name)),
                "{{product_name}} {{faq_research_context}} {{keyword_research_context}} {{full_page_json}}",
            )
            .unwrap();
        }
        (Arc::new(PromptStore::new(temp_dir.path())), temp_dir)
    }

    fn researcher(related: Vec<String>) -> Arc<SeoResearcher> {
        Arc::new(SeoResearcher::new(
            Arc::new(ScriptedSearch { related }),
            Arc::new(Semaphore::new(5)),
        ))
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_prepare_sets_base_name() {
        let (prompts, _dir) = store_with_templates();
        let client = Arc::new(MockGenerativeClient::always("{}"));
        let agents = BeautyAgents::new(client, prompts, researcher(vec![]), fast_retry());

        let prepared = agents.prepare("Protetor Solar FPS 60", ProductInfo::new()).await.unwrap();
        assert_eq!(prepared.get_str("base_name"), Some("Protetor Solar"));
    }

    #[tokio::test]
    async fn test_generate_with_research_context() {
        let (prompts, _dir) = store_with_templates();
        let client = Arc::new(MockGenerativeClient::always(
            r#"{"seo_title": "Serum | Skin Care", "html_content": "<p>Glow</p>"}"#,
        ));
        let agents = BeautyAgents::new(
            client,
            prompts,
            researcher(vec!["how to apply serum".to_string()]),
            fast_retry(),
        );

        let content = agents.generate("Vitamin C Serum", &ProductInfo::new()).await.unwrap();
        assert_eq!(content.seo_title.as_deref(), Some("Serum | Skin Care"));
    }

    #[tokio::test]
    async fn test_generate_with_empty_research_still_works() {
        let (prompts, _dir) = store_with_templates();
        let client = Arc::new(MockGenerativeClient::always(r#"{"seo_title": "T"}"#));
        let agents = BeautyAgents::new(client, prompts, researcher(vec![]), fast_retry());

        assert!(agents.generate("Serum", &ProductInfo::new()).await.is_some());
    }

    #[tokio::test]
    async fn test_audit_fallback() {
        let (prompts, _dir) = store_with_templates();
        let client = Arc::new(MockGenerativeClient::always("???"));
        let agents = BeautyAgents::new(client, prompts, researcher(vec![]), fast_retry());

        let audit = agents.audit(&GeneratedContent::default()).await;
        assert_eq!(audit.total_score, 0);
    }

    #[tokio::test]
    async fn test_refine_fallback_returns_previous() {
        let (prompts, _dir) = store_with_templates();
        let client = Arc::new(MockGenerativeClient::always("???"));
        let agents = BeautyAgents::new(client, prompts, researcher(vec![]), fast_retry());

        let previous = GeneratedContent {
            seo_title: Some("Original".to_string()),
            ..Default::default()
        };
        let refined = agents
            .refine("Serum", &ProductInfo::new(), &previous, &AuditResult::failed("f"))
            .await;
        assert_eq!(refined, previous);
    }
}
